use std::sync::Arc;

use hashbrown::HashMap;

use crate::{
    traffic::{TrafficRecord, TrafficReport},
    types::{IcaoAddress, TimestampMs},
};

/// Identifier-keyed record map.
pub type RecordMap = HashMap<IcaoAddress, TrafficRecord>;

/// Whether an upsert created a record or refreshed an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    /// First report seen for the identifier.
    Created,
    /// Existing record merged in place.
    Updated,
}

/// Immutable view of the store at one instant.
///
/// Cloning is cheap; later writes to the store never show up here.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    /// Records as of `taken_at_ms`.
    pub records: Arc<RecordMap>,
    /// Time of the last successful merge, if any.
    pub last_ingest_ms: Option<TimestampMs>,
    /// Clock time when the snapshot was taken.
    pub taken_at_ms: TimestampMs,
}

impl StoreSnapshot {
    /// Number of tracked records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Authoritative record storage.
///
/// The map sits behind an `Arc` and is copied on write only while a snapshot
/// still holds the previous version.
#[derive(Debug, Default)]
pub struct TrafficStore {
    records: Arc<RecordMap>,
    last_ingest_ms: Option<TimestampMs>,
}

impl TrafficStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `records`.
    pub fn from_records(records: RecordMap) -> Self {
        Self {
            records: Arc::new(records),
            last_ingest_ms: None,
        }
    }

    /// Record for `id`, if tracked.
    pub fn get(&self, id: IcaoAddress) -> Option<&TrafficRecord> {
        self.records.get(&id)
    }

    /// Owned copy of the record for `id`.
    pub fn get_cloned(&self, id: IcaoAddress) -> Option<TrafficRecord> {
        self.get(id).cloned()
    }

    /// Merges every present field of `report` into the record for `id` and
    /// stamps it with `stamp_ms`, creating the record if needed.
    pub fn upsert(&mut self, id: IcaoAddress, report: &TrafficReport, stamp_ms: TimestampMs) -> UpsertKind {
        let records = Arc::make_mut(&mut self.records);
        let mut kind = UpsertKind::Updated;
        let rec = records.entry(id).or_insert_with(|| {
            kind = UpsertKind::Created;
            TrafficRecord::new(id)
        });
        report.apply_to(rec);
        rec.last_update_ms = Some(stamp_ms);
        kind
    }

    /// Swaps in a whole new record set in one step.
    pub fn replace_all(&mut self, records: RecordMap) {
        self.records = Arc::new(records);
    }

    /// Immutable view stamped with `now_ms`.
    pub fn snapshot(&self, now_ms: TimestampMs) -> StoreSnapshot {
        StoreSnapshot {
            records: Arc::clone(&self.records),
            last_ingest_ms: self.last_ingest_ms,
            taken_at_ms: now_ms,
        }
    }

    /// Notes a successful ingest at `now_ms`.
    pub fn mark_ingest(&mut self, now_ms: TimestampMs) {
        self.last_ingest_ms = Some(self.last_ingest_ms.map_or(now_ms, |prev| prev.max(now_ms)));
    }

    /// Time of the last successful merge.
    pub fn last_ingest_ms(&self) -> Option<TimestampMs> {
        self.last_ingest_ms
    }

    /// Number of tracked records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Tracked identifiers, in no particular order.
    pub fn ids(&self) -> Vec<IcaoAddress> {
        self.records.keys().copied().collect()
    }
}
