use std::{sync::Arc, time::Duration};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::runtime::handle::{RuntimeError, TrafficCacheHandle};

use super::{
    link::{ConnectivityState, IngestLink},
    source::{IngestError, MessageSource},
};

enum Stop {
    Reset,
    Dropped,
    RuntimeGone,
}

/// Pumps messages from a [`MessageSource`] into the cache runtime.
///
/// Publishes connectivity on the handle's [`IngestLink`], reconnects after
/// `reconnect_delay` when the source drops, and reconnects immediately when a
/// reset is requested.
pub struct IngestAdapter<S: MessageSource> {
    source: S,
    handle: TrafficCacheHandle,
    link: Arc<IngestLink>,
    reconnect_delay: Duration,
}

impl<S: MessageSource> IngestAdapter<S> {
    /// Adapter feeding `handle` from `source`.
    pub fn new(source: S, handle: TrafficCacheHandle, reconnect_delay: Duration) -> Self {
        let link = handle.ingest_link();
        Self {
            source,
            handle,
            link,
            reconnect_delay,
        }
    }

    /// Runs until the source is exhausted or the cache runtime shuts down.
    pub async fn run(mut self) {
        let mut resets = self.link.watch_resets();
        resets.borrow_and_update();

        loop {
            if self.handle.is_closed() {
                self.link.set_connectivity(ConnectivityState::Closed);
                debug!("traffic cache runtime gone; stopping ingest");
                return;
            }

            self.link.set_connectivity(ConnectivityState::Connecting);
            match self.source.connect().await {
                Ok(()) => {}
                Err(IngestError::Exhausted) => {
                    self.link.set_connectivity(ConnectivityState::Closed);
                    info!(source = %self.source.describe(), "traffic source exhausted");
                    return;
                }
                Err(err) => {
                    self.link.set_connectivity(ConnectivityState::Closed);
                    warn!(source = %self.source.describe(), error = %err, "traffic source connect failed");
                    pause(self.reconnect_delay, &mut resets, &self.handle).await;
                    continue;
                }
            }

            self.link.set_connectivity(ConnectivityState::Open);
            info!(source = %self.source.describe(), "traffic source connected");

            let stop = self.pump(&mut resets).await;

            self.link.set_connectivity(ConnectivityState::Closing);
            self.source.disconnect().await;
            self.link.set_connectivity(ConnectivityState::Closed);

            match stop {
                Stop::Reset => continue,
                Stop::Dropped => pause(self.reconnect_delay, &mut resets, &self.handle).await,
                Stop::RuntimeGone => {
                    debug!("traffic cache runtime gone; stopping ingest");
                    return;
                }
            }
        }
    }

    // The adapter holds the link, so the reset channel never closes and
    // `changed()` only ever yields `Ok`.
    async fn pump(&mut self, resets: &mut watch::Receiver<u64>) -> Stop {
        loop {
            tokio::select! {
                msg = self.source.next_message() => match msg {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        if let Err(RuntimeError::ChannelClosed) = self.handle.ingest_message(&line).await {
                            return Stop::RuntimeGone;
                        }
                    }
                    Ok(None) => {
                        info!(source = %self.source.describe(), "traffic source closed");
                        return Stop::Dropped;
                    }
                    Err(err) if err.is_malformed_message() => {
                        self.handle.reject_malformed(&err);
                    }
                    Err(err) => {
                        warn!(source = %self.source.describe(), error = %err, "traffic source read failed");
                        return Stop::Dropped;
                    }
                },
                Ok(()) = resets.changed() => {
                    let generation = *resets.borrow_and_update();
                    info!(generation, "reset requested; reconnecting traffic source");
                    return Stop::Reset;
                }
                () = self.handle.closed() => return Stop::RuntimeGone,
            }
        }
    }
}

/// Waits out the reconnect delay; a reset or runtime shutdown cuts it short.
async fn pause(delay: Duration, resets: &mut watch::Receiver<u64>, handle: &TrafficCacheHandle) {
    tokio::select! {
        _ = tokio::time::sleep(delay) => {}
        Ok(()) = resets.changed() => {
            resets.borrow_and_update();
        }
        () = handle.closed() => {}
    }
}
