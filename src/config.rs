//! Runtime configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ingest::source::DEFAULT_MAX_LINE_BYTES;

/// Default upstream feed address.
pub const DEFAULT_INGEST_ADDR: &str = "127.0.0.1:30006";

/// A config value from the environment that did not parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value {value:?} for {key}: expected an integer")]
pub struct ConfigError {
    /// Environment variable name.
    pub key: &'static str,
    /// Raw value found.
    pub value: String,
}

/// Tunables for the cache runtime and ingest adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Address of the newline-delimited JSON traffic feed.
    pub ingest_addr: String,
    /// Maximum record age before eviction.
    pub ttl_ms: u64,
    /// Period of the eviction sweep; `0` disables the timer.
    pub sweep_interval_ms: u64,
    /// Pause before the ingest adapter reconnects after a drop.
    pub reconnect_delay_ms: u64,
    /// Longest feed line accepted; longer lines are dropped as malformed.
    pub max_line_bytes: usize,
    /// Bound of the runtime command queue.
    pub command_queue_bound: usize,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
    /// Name reported by the service-info view.
    pub service_name: String,
    /// Version reported by the service-info view.
    pub service_version: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ingest_addr: DEFAULT_INGEST_ADDR.to_string(),
            ttl_ms: 2_000,
            sweep_interval_ms: 5_000,
            reconnect_delay_ms: 1_000,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            command_queue_bound: 256,
            event_capacity: 1024,
            service_name: env!("CARGO_PKG_NAME").to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl CacheConfig {
    /// Defaults overridden by `TRAFFIC_INGEST_ADDR`, `TRAFFIC_TTL_MS`,
    /// `TRAFFIC_SWEEP_INTERVAL_MS`, `TRAFFIC_RECONNECT_DELAY_MS`, and
    /// `TRAFFIC_MAX_LINE_BYTES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] with a caller-supplied variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(addr) = lookup("TRAFFIC_INGEST_ADDR") {
            config.ingest_addr = addr;
        }
        if let Some(v) = parse_u64(&lookup, "TRAFFIC_TTL_MS")? {
            config.ttl_ms = v;
        }
        if let Some(v) = parse_u64(&lookup, "TRAFFIC_SWEEP_INTERVAL_MS")? {
            config.sweep_interval_ms = v;
        }
        if let Some(v) = parse_u64(&lookup, "TRAFFIC_RECONNECT_DELAY_MS")? {
            config.reconnect_delay_ms = v;
        }
        if let Some(v) = parse_u64(&lookup, "TRAFFIC_MAX_LINE_BYTES")? {
            config.max_line_bytes = usize::try_from(v).unwrap_or(usize::MAX);
        }
        Ok(config)
    }

    /// TTL as a [`Duration`].
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Sweep period, or `None` when the timer is disabled.
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_ms > 0).then(|| Duration::from_millis(self.sweep_interval_ms))
    }

    /// Reconnect pause as a [`Duration`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

fn parse_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<u64>, ConfigError> {
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<u64>().map_err(|_| ConfigError {
                key,
                value: raw.clone(),
            })
        })
        .transpose()
}
