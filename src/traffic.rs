//! Traffic record and sparse report types.

use std::fmt;

use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize,
};

use crate::types::{IcaoAddress, TimestampMs};

/// Merged, authoritative state for one tracked aircraft.
///
/// Serializes with the same keys the ingest feed uses, plus `lastUpdateTime`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficRecord {
    /// Transponder address; never changes for the life of the record.
    #[serde(rename = "Icao_addr")]
    pub identifier: IcaoAddress,
    /// Registration mark, e.g. `N123AB`.
    #[serde(rename = "Reg")]
    pub registration: Option<String>,
    /// Tail number or flight id shown on displays.
    #[serde(rename = "Tail")]
    pub tail_number: Option<String>,
    /// True when the position fields are trustworthy.
    #[serde(rename = "Position_valid", default)]
    pub position_valid: bool,
    /// Latitude in degrees.
    #[serde(rename = "Lat")]
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    #[serde(rename = "Lng")]
    pub longitude: Option<f64>,
    /// Ground state.
    #[serde(rename = "OnGround")]
    pub on_ground: Option<bool>,
    /// Transponder code in its 4-digit text form.
    #[serde(rename = "Squawk")]
    pub squawk: Option<String>,
    /// Distance from ownship.
    #[serde(rename = "Distance")]
    pub distance: Option<f64>,
    /// Altitude in feet.
    #[serde(rename = "Alt")]
    pub altitude: Option<f64>,
    /// Bearing from ownship in degrees.
    #[serde(rename = "Bearing")]
    pub bearing: Option<f64>,
    /// Engine clock time of the latest merge, in epoch milliseconds.
    #[serde(rename = "lastUpdateTime")]
    pub last_update_ms: Option<TimestampMs>,
}

impl TrafficRecord {
    /// Empty record for `identifier`; every optional field absent.
    pub fn new(identifier: IcaoAddress) -> Self {
        Self {
            identifier,
            registration: None,
            tail_number: None,
            position_valid: false,
            latitude: None,
            longitude: None,
            on_ground: None,
            squawk: None,
            distance: None,
            altitude: None,
            bearing: None,
            last_update_ms: None,
        }
    }

    /// Milliseconds since the last merge as seen at `now_ms`.
    ///
    /// An unset timestamp counts as age zero, as does one ahead of `now_ms`.
    pub fn age_ms(&self, now_ms: TimestampMs) -> u64 {
        let Some(last) = self.last_update_ms else {
            return 0;
        };
        now_ms.saturating_sub(last)
    }

    /// [`Self::age_ms`] in fractional seconds.
    pub fn seconds_since_update(&self, now_ms: TimestampMs) -> f64 {
        self.age_ms(now_ms) as f64 / 1000.0
    }

    /// Registration, then tail number, then the identifier text.
    pub fn display_name(&self) -> String {
        [&self.registration, &self.tail_number]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.identifier.to_string())
    }

    /// True when the record carries a complete, valid position fix.
    pub fn has_reliable_fix(&self) -> bool {
        self.position_valid
            && self.latitude.is_some()
            && self.longitude.is_some()
            && self.on_ground.is_some()
            && self.distance.is_some()
            && self.altitude.is_some()
            && self.bearing.is_some()
            && self.last_update_ms.is_some()
    }
}

/// Sparse report where each `Some` field overwrites the record value.
///
/// JSON `null` and a missing key both decode to `None`, so neither can clear a
/// known value. Blank text fields decode to `None` as well; non-blank text is
/// kept exactly as sent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrafficReport {
    /// Target record; reports without one are rejected by the merge engine.
    #[serde(rename = "Icao_addr", default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<IcaoAddress>,
    /// Optional replacement for registration.
    #[serde(
        rename = "Reg",
        default,
        deserialize_with = "non_blank_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub registration: Option<String>,
    /// Optional replacement for tail number.
    #[serde(
        rename = "Tail",
        default,
        deserialize_with = "non_blank_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub tail_number: Option<String>,
    /// Optional replacement for the position-valid flag.
    #[serde(rename = "Position_valid", default, skip_serializing_if = "Option::is_none")]
    pub position_valid: Option<bool>,
    /// Optional replacement for latitude.
    #[serde(rename = "Lat", default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Optional replacement for longitude.
    #[serde(rename = "Lng", default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Optional replacement for ground state.
    #[serde(rename = "OnGround", default, skip_serializing_if = "Option::is_none")]
    pub on_ground: Option<bool>,
    /// Optional replacement for squawk; accepts text or an integer.
    #[serde(
        rename = "Squawk",
        default,
        deserialize_with = "squawk_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub squawk: Option<String>,
    /// Optional replacement for distance.
    #[serde(rename = "Distance", default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Optional replacement for altitude.
    #[serde(rename = "Alt", default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Optional replacement for bearing.
    #[serde(rename = "Bearing", default, skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f64>,
}

impl TrafficReport {
    /// Report addressed to `identifier` with no fields set.
    pub fn for_id(identifier: IcaoAddress) -> Self {
        Self {
            identifier: Some(identifier),
            ..Self::default()
        }
    }

    /// Returns true when no field besides the identifier is set.
    pub fn is_empty(&self) -> bool {
        Self {
            identifier: None,
            ..self.clone()
        } == Self::default()
    }

    /// Applies every present field in place to `rec`.
    ///
    /// Leaves `identifier` and `last_update_ms` alone; the merge engine owns both.
    pub fn apply_to(&self, rec: &mut TrafficRecord) {
        if let Some(v) = &self.registration {
            rec.registration = Some(v.clone());
        }
        if let Some(v) = &self.tail_number {
            rec.tail_number = Some(v.clone());
        }
        if let Some(v) = self.position_valid {
            rec.position_valid = v;
        }
        if let Some(v) = self.latitude {
            rec.latitude = Some(v);
        }
        if let Some(v) = self.longitude {
            rec.longitude = Some(v);
        }
        if let Some(v) = self.on_ground {
            rec.on_ground = Some(v);
        }
        if let Some(v) = &self.squawk {
            rec.squawk = Some(v.clone());
        }
        if let Some(v) = self.distance {
            rec.distance = Some(v);
        }
        if let Some(v) = self.altitude {
            rec.altitude = Some(v);
        }
        if let Some(v) = self.bearing {
            rec.bearing = Some(v);
        }
    }
}

fn non_blank_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

struct SquawkVisitor;

impl<'de> Visitor<'de> for SquawkVisitor {
    type Value = Option<String>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a squawk code as text or a non-negative integer")
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(format!("{v:04}")))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v)
            .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &"a non-negative squawk"))
            .and_then(|v| self.visit_u64(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok((!v.trim().is_empty()).then(|| v.to_string()))
    }
}

fn squawk_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    deserializer.deserialize_option(SquawkVisitor)
}
