//! Shared primitive IDs and timestamps.

use std::{fmt, str::FromStr};

use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use thiserror::Error;

/// Milliseconds since the Unix epoch.
pub type TimestampMs = u64;

const ICAO_MASK: u32 = 0x00FF_FFFF;

/// 24-bit ICAO transponder address.
///
/// The textual form is uppercase hex without zero padding, so `0xA1` reads
/// back as `"A1"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IcaoAddress(u32);

impl IcaoAddress {
    /// Builds an address from a raw value, rejecting anything wider than 24 bits.
    pub const fn new(raw: u32) -> Option<Self> {
        if raw & !ICAO_MASK != 0 {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Raw 24-bit value.
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

/// Rejected identifier text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid ICAO address {input:?}: expected 1-6 hex digits")]
pub struct IcaoParseError {
    /// The offending input.
    pub input: String,
}

impl FromStr for IcaoAddress {
    type Err = IcaoParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || IcaoParseError {
            input: s.to_string(),
        };
        if trimmed.is_empty() || trimmed.len() > 6 || !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(err());
        }
        let raw = u32::from_str_radix(trimmed, 16).map_err(|_| err())?;
        Self::new(raw).ok_or_else(err)
    }
}

impl fmt::Display for IcaoAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

impl Serialize for IcaoAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Copy)]
struct IcaoVisitor;

impl<'de> Visitor<'de> for IcaoVisitor {
    type Value = IcaoAddress;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a hex ICAO address string or an integer below 2^24")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        u32::try_from(v)
            .ok()
            .and_then(IcaoAddress::new)
            .ok_or_else(|| E::invalid_value(de::Unexpected::Unsigned(v), &self))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
            .and_then(|v| self.visit_u64(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

impl<'de> Deserialize<'de> for IcaoAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IcaoVisitor)
    }
}
