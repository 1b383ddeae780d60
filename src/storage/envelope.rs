//! The `{value, timestamp, type}` wrapper applied to every persisted value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored value together with when it was written and what shape it had.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The wrapped value
    pub value: Value,

    /// Write time, milliseconds since the Unix epoch
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// Shape of `value` at write time
    #[serde(rename = "type")]
    pub type_tag: TypeTag,
}

/// Coarse JSON type of an enveloped value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl TypeTag {
    /// Tag describing `value`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => TypeTag::Null,
            Value::Bool(_) => TypeTag::Boolean,
            Value::Number(_) => TypeTag::Number,
            Value::String(_) => TypeTag::String,
            Value::Array(_) => TypeTag::Array,
            Value::Object(_) => TypeTag::Object,
        }
    }
}

impl Envelope {
    /// Wrap `value`, stamped with `timestamp`.
    pub fn wrap(value: Value, timestamp: DateTime<Utc>) -> Self {
        let type_tag = TypeTag::of(&value);
        Self {
            value,
            timestamp,
            type_tag,
        }
    }
}

/// What a raw stored string turned out to hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Stored {
    /// Written through the adapter
    Enveloped(Envelope),
    /// Written by something that did not wrap it
    Legacy(Value),
    /// Nothing usable (`undefined`, blank)
    Absent,
}

/// Interpret a raw stored string.
///
/// JSON objects carrying both `value` and `timestamp` are envelopes. Other
/// JSON is a legacy bare value; text that is not JSON at all is a legacy
/// bare string, except the literal `undefined` which counts as absent.
pub fn unwrap_raw(raw: &str) -> Stored {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "undefined" {
        return Stored::Absent;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) if map.contains_key("value") && map.contains_key("timestamp") => {
            match serde_json::from_value::<Envelope>(Value::Object(map.clone())) {
                Ok(envelope) => Stored::Enveloped(envelope),
                // Envelope-shaped but with an odd timestamp or tag: keep the payload
                Err(_) => Stored::Legacy(map.get("value").cloned().unwrap_or(Value::Null)),
            }
        }
        Ok(value) => Stored::Legacy(value),
        Err(_) => Stored::Legacy(Value::String(raw.to_string())),
    }
}
