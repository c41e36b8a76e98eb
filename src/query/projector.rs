use tracing::debug;

use crate::{
    core::store::{RecordMap, StoreSnapshot},
    ingest::link::ConnectivityState,
    traffic::TrafficRecord,
    types::IcaoAddress,
};

use super::views::{ReliableMap, ReliableTraffic, ServiceStatus, SummaryMap, TrafficSummary};

/// Read-only views over one [`StoreSnapshot`].
///
/// Ages are measured against the snapshot's own timestamp, so every view from
/// the same projector agrees.
pub struct Projector<'a> {
    snapshot: &'a StoreSnapshot,
}

impl<'a> Projector<'a> {
    /// Wraps `snapshot`.
    pub fn new(snapshot: &'a StoreSnapshot) -> Self {
        Self { snapshot }
    }

    /// Age and tail number for every tracked record.
    pub fn summary(&self) -> SummaryMap {
        let now_ms = self.snapshot.taken_at_ms;
        self.snapshot
            .records
            .iter()
            .map(|(id, rec)| {
                (
                    *id,
                    TrafficSummary {
                        seconds_since_last_update: rec.seconds_since_update(now_ms),
                        tail_number: rec.tail_number.clone(),
                    },
                )
            })
            .collect()
    }

    /// Every record, unmodified.
    pub fn full(&self) -> RecordMap {
        (*self.snapshot.records).clone()
    }

    /// Records with a complete, valid position fix.
    pub fn reliable(&self) -> ReliableMap {
        let now_ms = self.snapshot.taken_at_ms;
        let out: ReliableMap = self
            .snapshot
            .records
            .iter()
            .filter_map(|(id, rec)| reliable_view(rec, now_ms).map(|view| (*id, view)))
            .collect();
        debug!(
            reliable = out.len(),
            tracked = self.snapshot.len(),
            "projected reliable traffic"
        );
        out
    }

    /// Record for `raw_id`; malformed identifiers are simply not found.
    pub fn detail(&self, raw_id: &str) -> Option<TrafficRecord> {
        let id = raw_id.parse::<IcaoAddress>().ok()?;
        self.detail_by_id(id)
    }

    /// Record for an already-parsed identifier.
    pub fn detail_by_id(&self, id: IcaoAddress) -> Option<TrafficRecord> {
        self.snapshot.records.get(&id).cloned()
    }

    /// Status view combining the snapshot with the ingest link state.
    pub fn status(&self, connectivity: ConnectivityState) -> ServiceStatus {
        let now_ms = self.snapshot.taken_at_ms;
        ServiceStatus {
            connectivity,
            connectivity_code: connectivity.code(),
            seconds_since_last_ingest: self
                .snapshot
                .last_ingest_ms
                .map(|last| now_ms.saturating_sub(last) as f64 / 1000.0),
            tracked_traffic_count: self.snapshot.len(),
        }
    }
}

fn reliable_view(rec: &TrafficRecord, now_ms: u64) -> Option<ReliableTraffic> {
    if !rec.has_reliable_fix() {
        return None;
    }
    Some(ReliableTraffic {
        display_name: rec.display_name(),
        seconds_since_last_update: rec.seconds_since_update(now_ms),
        latitude: rec.latitude?,
        longitude: rec.longitude?,
        on_ground: rec.on_ground?,
        distance: rec.distance?,
        altitude: rec.altitude?,
        bearing: rec.bearing?,
    })
}
