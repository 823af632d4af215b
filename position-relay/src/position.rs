use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FieldExtractionError;
use crate::message::{describe, number, DecodedMessage};

/// Feet per meter.
pub const FEET_PER_METER: f64 = 3.2808;

/// A GeoJSON point. Coordinates are always (longitude, latitude[, elevation]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
    pub elevation: Option<f64>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Point { coordinates: Vec<f64> },
}

impl GeoPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
            elevation: None,
        }
    }

    pub fn with_elevation(longitude: f64, latitude: f64, elevation: f64) -> Self {
        Self {
            longitude,
            latitude,
            elevation: Some(elevation),
        }
    }

    pub fn coordinates(&self) -> Vec<f64> {
        let mut coordinates = vec![self.longitude, self.latitude];
        coordinates.extend(self.elevation);
        coordinates
    }

    /// `{"type":"Point","coordinates":[lon,lat]}`, with a third coordinate
    /// when the point carries an elevation.
    pub fn to_geojson(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&Geometry::Point {
            coordinates: self.coordinates(),
        })
    }

    pub fn from_geojson(text: &str) -> Result<Self, serde_json::Error> {
        let Geometry::Point { coordinates } = serde_json::from_str(text)?;
        match coordinates[..] {
            [longitude, latitude] => Ok(Self::new(longitude, latitude)),
            [longitude, latitude, elevation] => {
                Ok(Self::with_elevation(longitude, latitude, elevation))
            }
            _ => Err(serde::de::Error::invalid_length(
                coordinates.len(),
                &"2 or 3 coordinates",
            )),
        }
    }
}

/// Altitude in the unit the deployment was configured with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Altitude {
    Feet(i64),
    Meters(f64),
}

impl Altitude {
    pub fn as_f64(&self) -> f64 {
        match self {
            Altitude::Feet(feet) => *feet as f64,
            Altitude::Meters(meters) => *meters,
        }
    }
}

/// How altitude is handled. Fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AltitudeMode {
    /// Feet as received, two-dimensional geometry.
    #[default]
    PassThrough,
    /// Meters, and the elevation is embedded in the geometry.
    Converted,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseAltitudeModeError(String);

impl fmt::Display for ParseAltitudeModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown altitude unit {:?}, expected feet or meters", self.0)
    }
}

impl std::error::Error for ParseAltitudeModeError {}

impl FromStr for AltitudeMode {
    type Err = ParseAltitudeModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "feet" | "ft" => Ok(AltitudeMode::PassThrough),
            "meters" | "metres" | "m" => Ok(AltitudeMode::Converted),
            _ => Err(ParseAltitudeModeError(s.to_owned())),
        }
    }
}

impl fmt::Display for AltitudeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AltitudeMode::PassThrough => write!(f, "feet"),
            AltitudeMode::Converted => write!(f, "meters"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionRecord {
    pub callsign: String,
    pub altitude: Altitude,
    pub position: GeoPoint,
}

/// Builds `PositionRecord`s out of position updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transformer {
    mode: AltitudeMode,
}

impl Transformer {
    pub fn new(mode: AltitudeMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> AltitudeMode {
        self.mode
    }

    /// Latitude and longitude are passed through untouched, out-of-range
    /// values included.
    pub fn transform(
        &self,
        message: &DecodedMessage,
    ) -> Result<PositionRecord, FieldExtractionError> {
        let fields = message.position_fields()?;
        let callsign = fields.callsign()?;
        let latitude = fields.latitude()?;
        let longitude = fields.longitude()?;
        let altitude = fields.altitude()?;

        let record = match self.mode {
            AltitudeMode::PassThrough => PositionRecord {
                callsign,
                altitude: Altitude::Feet(whole_feet(altitude)?),
                position: GeoPoint::new(longitude, latitude),
            },
            AltitudeMode::Converted => {
                let meters = number("altitude", Some(altitude))? / FEET_PER_METER;
                PositionRecord {
                    callsign,
                    altitude: Altitude::Meters(meters),
                    position: GeoPoint::with_elevation(longitude, latitude, meters),
                }
            }
        };
        Ok(record)
    }
}

/// Integral feet. Fractional input is rounded half to even.
fn whole_feet(altitude: &Value) -> Result<i64, FieldExtractionError> {
    if let Some(feet) = altitude.as_i64() {
        return Ok(feet);
    }
    let feet = number("altitude", Some(altitude))?.round_ties_even();
    if feet.is_finite() && feet >= i64::MIN as f64 && feet <= i64::MAX as f64 {
        Ok(feet as i64)
    } else {
        Err(FieldExtractionError {
            field: "altitude",
            found: describe(altitude),
        })
    }
}
