//! Serializable read models.

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::{ingest::link::ConnectivityState, types::IcaoAddress};

/// Per-aircraft summary row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSummary {
    /// Age of the record.
    pub seconds_since_last_update: f64,
    /// Tail number, if one has been reported.
    pub tail_number: Option<String>,
}

/// Projection of a record with a complete position fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliableTraffic {
    /// Registration, tail number, or identifier text.
    #[serde(rename = "displayName")]
    pub display_name: String,
    /// Age of the record.
    #[serde(rename = "secondsSinceLastUpdate")]
    pub seconds_since_last_update: f64,
    /// Latitude in degrees.
    #[serde(rename = "Lat")]
    pub latitude: f64,
    /// Longitude in degrees.
    #[serde(rename = "Lng")]
    pub longitude: f64,
    /// Ground state.
    #[serde(rename = "OnGround")]
    pub on_ground: bool,
    /// Distance from ownship.
    #[serde(rename = "Distance")]
    pub distance: f64,
    /// Altitude in feet.
    #[serde(rename = "Alt")]
    pub altitude: f64,
    /// Bearing from ownship in degrees.
    #[serde(rename = "Bearing")]
    pub bearing: f64,
}

/// Summary view keyed by identifier.
pub type SummaryMap = HashMap<IcaoAddress, TrafficSummary>;
/// Reliable view keyed by identifier.
pub type ReliableMap = HashMap<IcaoAddress, ReliableTraffic>;

/// Service identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Name and version block.
    pub server: ServerIdentity,
}

/// Name and version of the running service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerIdentity {
    /// Service name.
    pub name: String,
    /// Service version.
    pub version: String,
}

impl ServiceInfo {
    /// Builds the identity block.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            server: ServerIdentity {
                name: name.into(),
                version: version.into(),
            },
        }
    }
}

/// Health of the ingest link and the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    /// Ingest adapter connection state.
    pub connectivity: ConnectivityState,
    /// Numeric form of `connectivity`, 0 through 3.
    pub connectivity_code: u8,
    /// Seconds since the last merged report; `None` before the first one.
    pub seconds_since_last_ingest: Option<f64>,
    /// Records currently tracked.
    pub tracked_traffic_count: usize,
}

/// Acknowledgement of a reset request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetReceipt {
    /// When the reset was requested.
    #[serde(serialize_with = "http_date")]
    pub reset_time: DateTime<Utc>,
    /// Reset generation handed to the ingest adapter.
    pub generation: u64,
}

fn http_date<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&at.format("%a, %d %b %Y %H:%M:%S GMT"))
}
