//! In-memory traffic cache: merges partial aircraft reports per transponder,
//! evicts stale records on a timer, and serves read-only projections.
//!
//! # Examples
//!
//! Merging and projecting with [`core::store::TrafficStore`] directly:
//! ```
//! use trafficcache::{
//!     core::{merge::merge_report, store::TrafficStore},
//!     query::projector::Projector,
//!     traffic::TrafficReport,
//!     types::IcaoAddress,
//! };
//!
//! let id: IcaoAddress = "A1".parse().expect("icao");
//! let mut store = TrafficStore::new();
//! merge_report(&mut store, &TrafficReport {
//!     latitude: Some(47.5),
//!     ..TrafficReport::for_id(id)
//! }, 1_000).expect("merge");
//! merge_report(&mut store, &TrafficReport {
//!     tail_number: Some("N456CD".to_string()),
//!     ..TrafficReport::for_id(id)
//! }, 1_500).expect("merge");
//!
//! let snapshot = store.snapshot(2_000);
//! let rec = Projector::new(&snapshot).detail("A1").expect("tracked");
//! assert_eq!(rec.latitude, Some(47.5));
//! assert_eq!(rec.display_name(), "N456CD");
//! ```
//!
//! Runtime usage with an ingest adapter:
//! ```no_run
//! use std::sync::Arc;
//!
//! use trafficcache::{
//!     clock::SystemClock,
//!     config::CacheConfig,
//!     core::store::TrafficStore,
//!     ingest::{adapter::IngestAdapter, source::TcpLineSource},
//!     query::TrafficQueries,
//!     runtime::handle::spawn_traffic_cache,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = CacheConfig::default();
//! let handle = spawn_traffic_cache(TrafficStore::new(), Arc::new(SystemClock), config.clone());
//! let adapter = IngestAdapter::new(
//!     TcpLineSource::new(config.ingest_addr.clone()),
//!     handle.clone(),
//!     config.reconnect_delay(),
//! );
//! tokio::spawn(adapter.run());
//!
//! let reliable = handle.traffic_reliable().await.expect("reliable");
//! println!("{}", serde_json::to_string(&reliable).expect("json"));
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![deny(missing_docs)]

/// Time sources.
pub mod clock;
/// Runtime configuration.
pub mod config;
/// Record store, merge engine, and eviction planning.
pub mod core;
/// Feed decoding, message sources, and the ingest adapter.
pub mod ingest;
/// Read-only projections and the query interface.
pub mod query;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Traffic record and report types.
pub mod traffic;
/// Shared primitive types.
pub mod types;
