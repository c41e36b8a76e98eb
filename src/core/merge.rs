use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    traffic::TrafficReport,
    types::{IcaoAddress, TimestampMs},
};

use super::store::{TrafficStore, UpsertKind};

/// Reasons a report is refused before touching the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// The report carried no `Icao_addr`.
    #[error("report has no identifier")]
    MissingIdentifier,
}

/// Result of a successful merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Record that was written.
    pub id: IcaoAddress,
    /// Whether the record was new.
    pub kind: UpsertKind,
    /// `lastUpdateTime` now stored on the record.
    pub stamp_ms: TimestampMs,
}

/// Applies `report` to `store` at engine time `now_ms`.
///
/// The stamp never moves backwards for an identifier, even if the clock does.
pub fn merge_report(
    store: &mut TrafficStore,
    report: &TrafficReport,
    now_ms: TimestampMs,
) -> Result<MergeOutcome, MergeError> {
    let Some(id) = report.identifier else {
        warn!("dropping traffic report without identifier");
        return Err(MergeError::MissingIdentifier);
    };

    let stamp_ms = store
        .get(id)
        .and_then(|rec| rec.last_update_ms)
        .map_or(now_ms, |prev| prev.max(now_ms));

    let kind = store.upsert(id, report, stamp_ms);
    store.mark_ingest(now_ms);

    match kind {
        UpsertKind::Created => info!(icao = %id, tracked = store.len(), "tracking new traffic"),
        UpsertKind::Updated => debug!(icao = %id, "merged traffic report"),
    }

    Ok(MergeOutcome { id, kind, stamp_ms })
}
