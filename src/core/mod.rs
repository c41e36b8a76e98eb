//! In-memory record store, merge engine, and eviction planning.

/// Field-level merge of partial reports into the store.
pub mod merge;
/// Authoritative record store with copy-on-write snapshots.
pub mod store;
/// TTL eviction planning over store snapshots.
pub mod sweep;
