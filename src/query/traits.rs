use async_trait::async_trait;

use crate::{
    core::store::RecordMap, runtime::handle::RuntimeError, traffic::TrafficRecord,
};

use super::views::{ReliableMap, ResetReceipt, ServiceInfo, ServiceStatus, SummaryMap};

/// Operations an API layer can expose, one method per view.
#[async_trait]
pub trait TrafficQueries: Send + Sync {
    /// Service name and version.
    fn service_info(&self) -> ServiceInfo;

    /// Ingest connectivity, time since last ingest, and tracked count.
    async fn service_status(&self) -> Result<ServiceStatus, RuntimeError>;

    /// Asks the ingest adapter to reconnect.
    async fn service_reset(&self) -> Result<ResetReceipt, RuntimeError>;

    /// Age and tail number per tracked record.
    async fn traffic_summary(&self) -> Result<SummaryMap, RuntimeError>;

    /// All tracked records.
    async fn traffic_full(&self) -> Result<RecordMap, RuntimeError>;

    /// Records with a complete, valid position fix.
    async fn traffic_reliable(&self) -> Result<ReliableMap, RuntimeError>;

    /// One record by identifier text, `None` if unknown or malformed.
    async fn traffic_detail(&self, id: &str) -> Result<Option<TrafficRecord>, RuntimeError>;
}
