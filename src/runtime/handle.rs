use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc, oneshot},
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::{
    clock::Clock,
    config::CacheConfig,
    core::{
        merge::{merge_report, MergeError},
        store::{RecordMap, StoreSnapshot, TrafficStore, UpsertKind},
        sweep::{plan_sweep, run_isolated, SweepError, SweepSummary},
    },
    ingest::{decode::decode_message, link::IngestLink},
    query::{
        projector::Projector,
        views::{ReliableMap, ResetReceipt, ServiceInfo, ServiceStatus, SummaryMap},
        TrafficQueries,
    },
    traffic::{TrafficRecord, TrafficReport},
    types::IcaoAddress,
};

use super::events::{CacheEvent, RejectReason};

/// Failures surfaced by handle calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// An on-demand sweep faulted; the store is unchanged.
    #[error(transparent)]
    Sweep(#[from] SweepError),
    /// Command or reply channel closed.
    #[error("traffic cache runtime is not running")]
    ChannelClosed,
}

/// What happened to one inbound report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new record was created.
    Tracked(IcaoAddress),
    /// An existing record was merged.
    Updated(IcaoAddress),
    /// The report was dropped.
    Rejected(RejectReason),
}

/// Cloneable front door to the cache runtime.
#[derive(Clone)]
pub struct TrafficCacheHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<CacheEvent>,
    link: Arc<IngestLink>,
    clock: Arc<dyn Clock>,
    info: ServiceInfo,
}

enum Command {
    Ingest {
        report: TrafficReport,
        resp: oneshot::Sender<IngestOutcome>,
    },
    Sweep {
        resp: Option<oneshot::Sender<Result<SweepSummary, SweepError>>>,
    },
    Snapshot {
        resp: oneshot::Sender<StoreSnapshot>,
    },
    Get {
        id: IcaoAddress,
        resp: oneshot::Sender<Option<TrafficRecord>>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

/// Spawns the runtime that owns `store` and returns its handle.
///
/// Every merge, sweep and snapshot runs on that one task, so none of them can
/// interleave. Starts the sweep timer unless `config.sweep_interval_ms` is 0.
pub fn spawn_traffic_cache(
    store: TrafficStore,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
) -> TrafficCacheHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound.max(1));
    let (events_tx, _) = broadcast::channel::<CacheEvent>(config.event_capacity.max(1));

    let events_tx_loop = events_tx.clone();
    let clock_loop = Arc::clone(&clock);
    let ttl = config.ttl();

    tokio::spawn(async move {
        let mut store = store;
        while let Some(cmd) = cmd_rx.recv().await {
            if handle_command(cmd, &mut store, clock_loop.as_ref(), &events_tx_loop, ttl) {
                break;
            }
        }
        debug!(tracked = store.len(), "traffic cache runtime stopped");
    });

    if let Some(period) = config.sweep_interval() {
        spawn_sweep_timer(cmd_tx.downgrade(), period);
    }

    info!(
        ttl_ms = config.ttl_ms,
        sweep_interval_ms = config.sweep_interval_ms,
        "traffic cache started"
    );

    TrafficCacheHandle {
        cmd_tx,
        events_tx,
        link: Arc::new(IngestLink::new()),
        clock,
        info: ServiceInfo::new(config.service_name, config.service_version),
    }
}

fn spawn_sweep_timer(cmd_tx: mpsc::WeakSender<Command>, period: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(tx) = cmd_tx.upgrade() else { break };
            if tx.send(Command::Sweep { resp: None }).await.is_err() {
                break;
            }
        }
        debug!("sweep timer stopped");
    });
}

impl TrafficCacheHandle {
    /// Subscribes to runtime events.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events_tx.subscribe()
    }

    /// Link state shared with the ingest adapter.
    pub fn ingest_link(&self) -> Arc<IngestLink> {
        Arc::clone(&self.link)
    }

    /// Merges one decoded report.
    pub async fn ingest(&self, report: TrafficReport) -> Result<IngestOutcome, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Ingest { report, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Decodes and merges one raw feed message; malformed input is dropped.
    pub async fn ingest_message(&self, raw: &str) -> Result<IngestOutcome, RuntimeError> {
        match decode_message(raw) {
            Ok(report) => self.ingest(report).await,
            Err(err) => Ok(self.reject_malformed(&err)),
        }
    }

    /// Records a feed message that never made it to a report.
    pub fn reject_malformed(&self, error: &dyn std::fmt::Display) -> IngestOutcome {
        warn!(error = %error, "dropping malformed traffic message");
        let reason = RejectReason::Malformed;
        let _ = self.events_tx.send(CacheEvent::Rejected { reason });
        IngestOutcome::Rejected(reason)
    }

    /// True once the runtime has stopped.
    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }

    /// Resolves once the runtime has stopped.
    pub async fn closed(&self) {
        self.cmd_tx.closed().await
    }

    /// Runs one eviction cycle now, outside the timer.
    pub async fn sweep_now(&self) -> Result<SweepSummary, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Sweep { resp: Some(tx) })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        Ok(rx.await.map_err(|_| RuntimeError::ChannelClosed)??)
    }

    /// Immutable view of the store as of now.
    pub async fn snapshot(&self) -> Result<StoreSnapshot, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Snapshot { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Record for `id`, if tracked.
    pub async fn get(&self, id: IcaoAddress) -> Result<Option<TrafficRecord>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Get { id, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Stops the runtime; the sweep timer follows.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}

#[async_trait]
impl TrafficQueries for TrafficCacheHandle {
    fn service_info(&self) -> ServiceInfo {
        self.info.clone()
    }

    async fn service_status(&self) -> Result<ServiceStatus, RuntimeError> {
        let snapshot = self.snapshot().await?;
        Ok(Projector::new(&snapshot).status(self.link.connectivity()))
    }

    async fn service_reset(&self) -> Result<ResetReceipt, RuntimeError> {
        let generation = self.link.request_reset();
        let reset_time = DateTime::<Utc>::from_timestamp_millis(self.clock.now_ms() as i64)
            .unwrap_or_else(Utc::now);
        info!(generation, "ingest reset requested");
        let _ = self.events_tx.send(CacheEvent::ResetRequested { generation });
        Ok(ResetReceipt {
            reset_time,
            generation,
        })
    }

    async fn traffic_summary(&self) -> Result<SummaryMap, RuntimeError> {
        let snapshot = self.snapshot().await?;
        Ok(Projector::new(&snapshot).summary())
    }

    async fn traffic_full(&self) -> Result<RecordMap, RuntimeError> {
        let snapshot = self.snapshot().await?;
        Ok(Projector::new(&snapshot).full())
    }

    async fn traffic_reliable(&self) -> Result<ReliableMap, RuntimeError> {
        let snapshot = self.snapshot().await?;
        Ok(Projector::new(&snapshot).reliable())
    }

    async fn traffic_detail(&self, id: &str) -> Result<Option<TrafficRecord>, RuntimeError> {
        let Ok(id) = id.parse::<IcaoAddress>() else {
            debug!(id, "detail lookup with malformed identifier");
            return Ok(None);
        };
        self.get(id).await
    }
}

fn handle_command(
    cmd: Command,
    store: &mut TrafficStore,
    clock: &dyn Clock,
    events_tx: &broadcast::Sender<CacheEvent>,
    ttl: std::time::Duration,
) -> bool {
    match cmd {
        Command::Ingest { report, resp } => {
            let outcome = match merge_report(store, &report, clock.now_ms()) {
                Ok(merged) => {
                    let id = merged.id;
                    match merged.kind {
                        UpsertKind::Created => {
                            let _ = events_tx.send(CacheEvent::Tracked { id });
                            IngestOutcome::Tracked(id)
                        }
                        UpsertKind::Updated => {
                            let _ = events_tx.send(CacheEvent::Updated { id });
                            IngestOutcome::Updated(id)
                        }
                    }
                }
                Err(MergeError::MissingIdentifier) => {
                    let reason = RejectReason::MissingIdentifier;
                    let _ = events_tx.send(CacheEvent::Rejected { reason });
                    IngestOutcome::Rejected(reason)
                }
            };
            let _ = resp.send(outcome);
        }
        Command::Sweep { resp } => {
            let out = sweep(store, clock, events_tx, ttl);
            if let Some(resp) = resp {
                let _ = resp.send(out);
            }
        }
        Command::Snapshot { resp } => {
            let _ = resp.send(store.snapshot(clock.now_ms()));
        }
        Command::Get { id, resp } => {
            let _ = resp.send(store.get_cloned(id));
        }
        Command::Shutdown { resp } => {
            let _ = resp.send(());
            return true;
        }
    }

    false
}

fn sweep(
    store: &mut TrafficStore,
    clock: &dyn Clock,
    events_tx: &broadcast::Sender<CacheEvent>,
    ttl: std::time::Duration,
) -> Result<SweepSummary, SweepError> {
    let planned = run_isolated(|| {
        let now_ms = clock.now_ms();
        plan_sweep(&store.snapshot(now_ms), now_ms, ttl)
    });

    let plan = match planned {
        Ok(plan) => plan,
        Err(err) => {
            error!(error = %err, tracked = store.len(), "sweep cycle failed; keeping current traffic");
            let _ = events_tx.send(CacheEvent::SweepFailed);
            return Err(err);
        }
    };

    for id in &plan.evicted {
        info!(icao = %id, "evicting stale traffic");
        let _ = events_tx.send(CacheEvent::Evicted { id: *id });
    }

    let summary = SweepSummary {
        retained: plan.retained.len(),
        evicted: plan.evicted.len(),
    };
    store.replace_all(plan.retained);
    debug!(retained = summary.retained, evicted = summary.evicted, "sweep complete");
    let _ = events_tx.send(CacheEvent::SweepCompleted {
        retained: summary.retained,
        evicted: summary.evicted,
    });
    Ok(summary)
}
