//! Read-only projections of the record store.

/// Pure projections over a store snapshot.
pub mod projector;
/// Query operations exposed to an API layer.
pub mod traits;
/// Serializable view types.
pub mod views;

pub use traits::TrafficQueries;
