use std::{
    panic::{self, AssertUnwindSafe},
    time::Duration,
};

use thiserror::Error;

use crate::types::{IcaoAddress, TimestampMs};

use super::store::{RecordMap, StoreSnapshot};

/// A sweep cycle that could not produce a replacement set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SweepError {
    /// Planning panicked; the store was left as it was.
    #[error("sweep planning panicked: {0}")]
    Panicked(String),
}

/// Replacement set computed from one snapshot.
#[derive(Debug, Clone, Default)]
pub struct SweepPlan {
    /// Records whose age is within the TTL.
    pub retained: RecordMap,
    /// Identifiers dropped by this cycle.
    pub evicted: Vec<IcaoAddress>,
}

/// Counts reported after a sweep is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepSummary {
    /// Records left in the store.
    pub retained: usize,
    /// Records removed.
    pub evicted: usize,
}

/// Splits `snapshot` into records with `age <= ttl` and the rest.
pub fn plan_sweep(snapshot: &StoreSnapshot, now_ms: TimestampMs, ttl: Duration) -> SweepPlan {
    let ttl_ms = ttl.as_millis() as u64;
    let mut plan = SweepPlan {
        retained: RecordMap::with_capacity(snapshot.records.len()),
        evicted: Vec::new(),
    };

    for (id, rec) in snapshot.records.iter() {
        if rec.age_ms(now_ms) > ttl_ms {
            plan.evicted.push(*id);
        } else {
            plan.retained.insert(*id, rec.clone());
        }
    }

    plan
}

/// Runs one sweep step, catching a panic as [`SweepError::Panicked`].
pub fn run_isolated<T>(f: impl FnOnce() -> T) -> Result<T, SweepError> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        SweepError::Panicked(msg)
    })
}
