//! Sighting normalization from raw MQTT payloads

use super::types::Sighting;
use serde_json::{Map, Value};

#[derive(Debug)]
pub enum IngestError {
    /// Payload is not UTF-8 JSON, or not a JSON object
    MalformedMessage(String),
    /// Payload parsed but carries no usable `mmsi`
    MissingIdentifier,
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::MalformedMessage(e) => write!(f, "Malformed message: {}", e),
            IngestError::MissingIdentifier => write!(f, "Message missing MMSI"),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::MalformedMessage(err.to_string())
    }
}

impl From<std::str::Utf8Error> for IngestError {
    fn from(err: std::str::Utf8Error) -> Self {
        IngestError::MalformedMessage(err.to_string())
    }
}

impl Sighting {
    /// Parse a sighting from a raw payload received at `received_at`
    ///
    /// `shipname` wins over `name` when both are present. A non-integer
    /// `type` is treated as absent.
    pub fn from_payload(payload: &[u8], received_at: i64) -> Result<Self, IngestError> {
        let text = std::str::from_utf8(payload)?;
        let value: Value = serde_json::from_str(text)?;
        let object = value.as_object().ok_or_else(|| {
            IngestError::MalformedMessage("expected a JSON object".to_string())
        })?;

        let identifier = identifier_field(object).ok_or(IngestError::MissingIdentifier)?;

        let inline_name = text_field(object, "shipname").or_else(|| text_field(object, "name"));
        let message_type = object.get("type").and_then(Value::as_i64);

        Ok(Self {
            identifier,
            inline_name,
            message_type,
            observed_at: received_at,
        })
    }
}

fn identifier_field(object: &Map<String, Value>) -> Option<String> {
    match object.get("mmsi")? {
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        _ => None,
    }
}

fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    let s = object.get(key)?.as_str()?.trim();
    (!s.is_empty()).then(|| s.to_string())
}
