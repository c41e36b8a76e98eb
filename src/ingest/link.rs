use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Connection state of the ingest adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    /// Opening the source.
    Connecting,
    /// Receiving messages.
    Open,
    /// Tearing the connection down.
    Closing,
    /// Not connected.
    Closed,
}

impl ConnectivityState {
    /// Numeric code, 0 = connecting through 3 = closed.
    pub const fn code(self) -> u8 {
        match self {
            Self::Connecting => 0,
            Self::Open => 1,
            Self::Closing => 2,
            Self::Closed => 3,
        }
    }
}

/// Shared state between the cache runtime and the ingest adapter: the
/// adapter's connectivity and the reset generation it should honour.
#[derive(Debug)]
pub struct IngestLink {
    connectivity: watch::Sender<ConnectivityState>,
    reset_generation: watch::Sender<u64>,
}

impl Default for IngestLink {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestLink {
    /// Closed link at generation 0.
    pub fn new() -> Self {
        let (connectivity, _) = watch::channel(ConnectivityState::Closed);
        let (reset_generation, _) = watch::channel(0);
        Self {
            connectivity,
            reset_generation,
        }
    }

    /// Current connectivity.
    pub fn connectivity(&self) -> ConnectivityState {
        *self.connectivity.borrow()
    }

    /// Publishes a new connectivity state.
    pub fn set_connectivity(&self, state: ConnectivityState) {
        self.connectivity.send_replace(state);
    }

    /// Receiver that observes connectivity changes.
    pub fn watch_connectivity(&self) -> watch::Receiver<ConnectivityState> {
        self.connectivity.subscribe()
    }

    /// Bumps the reset generation and returns the new value.
    pub fn request_reset(&self) -> u64 {
        let mut generation = 0;
        self.reset_generation.send_modify(|g| {
            *g += 1;
            generation = *g;
        });
        generation
    }

    /// Current reset generation.
    pub fn reset_generation(&self) -> u64 {
        *self.reset_generation.borrow()
    }

    /// Receiver that wakes on every reset request.
    pub fn watch_resets(&self) -> watch::Receiver<u64> {
        self.reset_generation.subscribe()
    }
}
