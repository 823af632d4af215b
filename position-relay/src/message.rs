use serde::Deserialize;
use serde_json::Value;

use crate::error::{DecodeError, FieldExtractionError};

/// The only message type the relay forwards.
pub const POSITION_UPDATE: &str = "update_position";

/// Envelope shared by every message on the feed.
///
/// `data` is kept untyped until the filter has decided the message is worth
/// looking at: other message types carry unrelated shapes there.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DecodedMessage {
    pub message_type: String,
    #[serde(default)]
    pub data: Value,
}

impl DecodedMessage {
    /// Parses a raw feed payload.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        if payload.is_empty() {
            return Err(DecodeError::Empty);
        }
        let text = std::str::from_utf8(payload)?;
        tracing::trace!(json = text, "decoding feed message");
        Ok(serde_json::from_str(text)?)
    }

    pub fn is_position_update(&self) -> bool {
        self.message_type == POSITION_UPDATE
    }

    /// The fields a position update is expected to carry, each one optional
    /// so that absence can be reported per field.
    pub fn position_fields(&self) -> Result<PositionFields, FieldExtractionError> {
        match &self.data {
            Value::Object(_) => Ok(PositionFields::deserialize(&self.data).map_err(|e| {
                FieldExtractionError {
                    field: "data",
                    found: e.to_string(),
                }
            })?),
            Value::Null => Err(FieldExtractionError::missing("data")),
            other => Err(FieldExtractionError {
                field: "data",
                found: describe(other),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PositionFields {
    pub callsign: Option<Value>,
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
    pub altitude: Option<Value>,
}

impl PositionFields {
    pub fn callsign(&self) -> Result<String, FieldExtractionError> {
        match &self.callsign {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            Some(other) => Err(FieldExtractionError {
                field: "callsign",
                found: describe(other),
            }),
            None => Err(FieldExtractionError::missing("callsign")),
        }
    }

    pub fn latitude(&self) -> Result<f64, FieldExtractionError> {
        number("latitude", self.latitude.as_ref())
    }

    pub fn longitude(&self) -> Result<f64, FieldExtractionError> {
        number("longitude", self.longitude.as_ref())
    }

    pub fn altitude(&self) -> Result<&Value, FieldExtractionError> {
        self.altitude
            .as_ref()
            .filter(|v| !v.is_null())
            .ok_or_else(|| FieldExtractionError::missing("altitude"))
    }
}

/// Reads a float out of a JSON number or a numeric string.
pub(crate) fn number(
    field: &'static str,
    value: Option<&Value>,
) -> Result<f64, FieldExtractionError> {
    let unusable = |v: &Value| FieldExtractionError {
        field,
        found: describe(v),
    };
    match value {
        Some(v @ Value::Number(n)) => n.as_f64().ok_or_else(|| unusable(v)),
        Some(v @ Value::String(s)) => s.trim().parse::<f64>().map_err(|_| unusable(v)),
        Some(other) => Err(unusable(other)),
        None => Err(FieldExtractionError::missing(field)),
    }
}

/// Short human description of a JSON value, for error messages.
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(a) => format!("array of {} items", a.len()),
        Value::Object(_) => "object".to_owned(),
    }
}
