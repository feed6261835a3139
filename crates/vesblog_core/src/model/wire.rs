//! Boundary conversion between typed records and JSON field maps.
//!
//! Core logic only handles typed records; transports that speak loose
//! field maps convert here, once, at the edge.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Wire conversion failure.
#[derive(Debug)]
pub enum WireError {
    /// The record did not serialize to a JSON object.
    NotAnObject,
    /// Field map does not describe a valid record.
    Json(serde_json::Error),
}

impl Display for WireError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "record does not serialize to a field map"),
            Self::Json(err) => write!(f, "invalid field map: {err}"),
        }
    }
}

impl Error for WireError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotAnObject => None,
            Self::Json(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for WireError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Converts a typed record into its wire field map.
pub fn to_wire<T: Serialize>(record: &T) -> Result<Map<String, Value>, WireError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map),
        _ => Err(WireError::NotAnObject),
    }
}

/// Builds a typed record from a wire field map.
pub fn from_wire<T: DeserializeOwned>(fields: Map<String, Value>) -> Result<T, WireError> {
    Ok(serde_json::from_value(Value::Object(fields))?)
}

/// Overlays `patch` onto the wire form of `existing`.
///
/// Top-level keys in `patch` replace the stored value; keys it does not
/// mention keep their current value. `extension_attributes` merges per key.
pub fn merge_patch<T>(existing: &T, patch: &Map<String, Value>) -> Result<T, WireError>
where
    T: Serialize + DeserializeOwned,
{
    let mut fields = to_wire(existing)?;
    for (key, value) in patch {
        if key == "extension_attributes" {
            if let (Some(Value::Object(current)), Value::Object(incoming)) =
                (fields.get_mut(key), value)
            {
                for (ext_key, ext_value) in incoming {
                    current.insert(ext_key.clone(), ext_value.clone());
                }
                continue;
            }
        }
        fields.insert(key.clone(), value.clone());
    }
    from_wire(fields)
}
