//! Runtime event stream payloads.

use crate::types::IcaoAddress;

/// Why an inbound report was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Payload did not decode.
    Malformed,
    /// Payload decoded but named no aircraft.
    MissingIdentifier,
}

/// Events emitted from the single-writer runtime loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// First report for an aircraft created its record.
    Tracked {
        /// New record id.
        id: IcaoAddress,
    },
    /// A report was merged into an existing record.
    Updated {
        /// Updated record id.
        id: IcaoAddress,
    },
    /// A report was dropped without touching the store.
    Rejected {
        /// Drop reason.
        reason: RejectReason,
    },
    /// A sweep removed a stale record.
    Evicted {
        /// Removed record id.
        id: IcaoAddress,
    },
    /// One sweep cycle replaced the store contents.
    SweepCompleted {
        /// Records kept.
        retained: usize,
        /// Records removed.
        evicted: usize,
    },
    /// One sweep cycle faulted; the store kept its prior contents.
    SweepFailed,
    /// A reset asked the ingest adapter to reconnect.
    ResetRequested {
        /// New reset generation.
        generation: u64,
    },
}
