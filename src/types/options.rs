//! Sampling option values
//!
//! Ollama accepts an open-ended `options` object (`temperature`,
//! `num_predict`, `stop`, ...). Values are restricted to JSON scalars and
//! keep their exact type on the wire.

use crate::errors::ClientError;
use serde::de::{self, Deserializer, Visitor};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Option map sent under the `options` key
pub type GenerationOptions = BTreeMap<String, OptionValue>;

/// A single scalar option value
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
}

impl OptionValue {
    /// Floats must be finite to have a JSON representation
    pub fn is_encodable(&self) -> bool {
        match self {
            OptionValue::Float(f) => f.is_finite(),
            _ => true,
        }
    }

    /// Convert loosely typed JSON, e.g. an option table read from config
    ///
    /// Null, arrays, objects and integers beyond `i64` fail with
    /// [`ClientError::Encoding`] naming `key`.
    pub fn from_json(key: &str, value: serde_json::Value) -> Result<Self, ClientError> {
        use serde_json::Value;

        match value {
            Value::Bool(b) => Ok(OptionValue::Boolean(b)),
            Value::String(s) => Ok(OptionValue::String(s)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(OptionValue::Integer(i))
                } else if let Some(f) = n.as_f64().filter(|_| !n.is_u64()) {
                    Ok(OptionValue::Float(f))
                } else {
                    Err(ClientError::Encoding {
                        option: key.to_string(),
                        value: n.to_string(),
                    })
                }
            }
            other => Err(ClientError::Encoding {
                option: key.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Integer(i) => write!(f, "{}", i),
            OptionValue::Float(x) => write!(f, "{}", x),
            OptionValue::Boolean(b) => write!(f, "{}", b),
            OptionValue::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl Serialize for OptionValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OptionValue::Integer(i) => serializer.serialize_i64(*i),
            OptionValue::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            OptionValue::Float(f) => Err(ser::Error::custom(format!(
                "non-finite float {} has no JSON representation",
                f
            ))),
            OptionValue::Boolean(b) => serializer.serialize_bool(*b),
            OptionValue::String(s) => serializer.serialize_str(s),
        }
    }
}

struct OptionValueVisitor;

impl<'de> Visitor<'de> for OptionValueVisitor {
    type Value = OptionValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer, float, boolean or string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<OptionValue, E> {
        Ok(OptionValue::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<OptionValue, E> {
        i64::try_from(v)
            .map(OptionValue::Integer)
            .map_err(|_| E::custom(format!("integer {} out of range", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<OptionValue, E> {
        Ok(OptionValue::Float(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<OptionValue, E> {
        Ok(OptionValue::Boolean(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<OptionValue, E> {
        Ok(OptionValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<OptionValue, E> {
        Ok(OptionValue::String(v))
    }
}

impl<'de> Deserialize<'de> for OptionValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(OptionValueVisitor)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Integer(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        OptionValue::Integer(v.into())
    }
}

impl From<u32> for OptionValue {
    fn from(v: u32) -> Self {
        OptionValue::Integer(v.into())
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Float(v)
    }
}

impl From<f32> for OptionValue {
    fn from(v: f32) -> Self {
        OptionValue::Float(v.into())
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Boolean(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::String(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::String(v)
    }
}

/// Convert a loosely typed table into options, naming the first bad key
pub fn options_from_json(
    table: BTreeMap<String, serde_json::Value>,
) -> Result<GenerationOptions, ClientError> {
    table
        .into_iter()
        .map(|(key, value)| OptionValue::from_json(&key, value).map(|v| (key, v)))
        .collect()
}
