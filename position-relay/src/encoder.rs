use std::fmt;

use serde::Serialize;

use crate::error::EncodeError;
use crate::position::{Altitude, PositionRecord};

/// A record serialized for the sinks. Compact JSON, fields in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRecord(pub(crate) String);

impl EncodedRecord {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for EncodedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Downstream map clients expect `position` to hold a GeoJSON document as a
// string, not as a nested object.
#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
struct WireRecord<'a> {
    callsign: &'a str,
    altitude: Altitude,
    position: String,
}

/// Serializes a record. Pure: the same record always encodes to the same text.
pub fn encode(record: &PositionRecord) -> Result<EncodedRecord, EncodeError> {
    check_finite("altitude", record.altitude.as_f64())?;
    check_finite("longitude", record.position.longitude)?;
    check_finite("latitude", record.position.latitude)?;
    if let Some(elevation) = record.position.elevation {
        check_finite("elevation", elevation)?;
    }

    let wire = WireRecord {
        callsign: &record.callsign,
        altitude: record.altitude,
        position: record.position.to_geojson()?,
    };
    Ok(EncodedRecord(serde_json::to_string(&wire)?))
}

// serde_json would quietly write NaN and infinities as null.
fn check_finite(field: &'static str, value: f64) -> Result<(), EncodeError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EncodeError::NonFinite { field })
    }
}
