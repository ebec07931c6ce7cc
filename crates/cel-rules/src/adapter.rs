//! Conversion between JSON documents and [`Value`]s.
//!
//! Incoming JSON numbers that fit in an `i64` become [`Value::Int`], so that
//! `totalAmount == 750000` compares two ints rather than an int and a double.
//! Everything else numeric becomes [`Value::Double`].

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{Map, Number};
use thiserror::Error;

use crate::eval::{OptionalValue, Value, ValueMap};

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} cannot be represented in JSON")]
    NonFiniteDouble(f64),
}

/// Anything that can be turned into a normalized [`Value`] tree.
///
/// Normalizing an already-normalized [`Value`] returns an equal value.
pub trait RawDocument {
    fn normalize(&self) -> Value;
}

impl RawDocument for serde_json::Value {
    fn normalize(&self) -> Value {
        normalize(self)
    }
}

impl RawDocument for Value {
    fn normalize(&self) -> Value {
        self.clone()
    }
}

/// Converts a parsed JSON tree into a [`Value`].
pub fn normalize(raw: &serde_json::Value) -> Value {
    match raw {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => normalize_number(n),
        serde_json::Value::String(s) => Value::string(s.as_str()),
        serde_json::Value::Array(items) => Value::list(items.iter().map(normalize).collect::<Vec<_>>()),
        serde_json::Value::Object(fields) => Value::from(
            fields
                .iter()
                .map(|(k, v)| (k.as_str(), normalize(v)))
                .collect::<ValueMap>(),
        ),
    }
}

fn normalize_number(n: &Number) -> Value {
    match (n.as_i64(), n.as_f64()) {
        (Some(i), _) => Value::Int(i),
        // Integers above i64::MAX have no exact representation; keep the magnitude.
        (None, Some(d)) => Value::Double(d),
        (None, None) => Value::Double(f64::NAN),
    }
}

/// Parses JSON text and normalizes it.
pub fn from_json_str(text: &str) -> Result<Value, AdapterError> {
    let raw: serde_json::Value = serde_json::from_str(text)?;
    Ok(normalize(&raw))
}

/// Converts an evaluation result back into JSON.
///
/// Bytes are base64 encoded and an empty optional becomes `null`.
pub fn to_json(value: &Value) -> Result<serde_json::Value, AdapterError> {
    Ok(match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Double(d) => Number::from_f64(*d)
            .map(serde_json::Value::Number)
            .ok_or(AdapterError::NonFiniteDouble(*d))?,
        Value::String(s) => serde_json::Value::String(s.to_string()),
        Value::Bytes(b) => serde_json::Value::String(BASE64.encode(b)),
        Value::List(items) => serde_json::Value::Array(items.iter().map(to_json).collect::<Result<_, _>>()?),
        Value::Map(map) => {
            let mut object = Map::new();
            for (k, v) in map.iter() {
                object.insert(k.to_string(), to_json(v)?);
            }
            serde_json::Value::Object(object)
        }
        Value::Optional(OptionalValue::None) => serde_json::Value::Null,
        Value::Optional(OptionalValue::Some(inner)) => to_json(inner)?,
    })
}
