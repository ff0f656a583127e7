// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Host values and their engine representation.
//!
//! Workflow code works with [`Value`]; engine bindings accept and return
//! [`serde_json::Value`]. Only the serializable subset crosses the boundary.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde_json::{Map, Number, Value as EngineValue};

use crate::error::ConversionError;

/// A host-language value.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum Value {
    Nil,
    Boolean(bool),
    Int(i64),
    Float(f64),
    /// Decimal kept as its literal text.
    Decimal(String),
    String(String),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// Reference to a function; never serializable.
    Function(String),
}

impl Value {
    /// Build a map value from key/value pairs.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Name of the value's shape, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Function(_) => "function",
        }
    }

    /// Field of a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// String content, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert into the engine representation.
    pub fn to_engine(&self) -> Result<EngineValue, ConversionError> {
        Ok(match self {
            Value::Nil => EngineValue::Null,
            Value::Boolean(b) => EngineValue::Bool(*b),
            Value::Int(i) => EngineValue::from(*i),
            Value::Float(f) => Number::from_f64(*f)
                .map(EngineValue::Number)
                .ok_or(ConversionError::NonFiniteFloat(*f))?,
            Value::Decimal(text) => Number::from_str(text)
                .map(EngineValue::Number)
                .map_err(|_| ConversionError::InvalidDecimal(text.clone()))?,
            Value::String(s) => EngineValue::String(s.clone()),
            Value::Array(items) => EngineValue::Array(
                items
                    .iter()
                    .map(Value::to_engine)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Map(entries) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), value.to_engine()?);
                }
                EngineValue::Object(map)
            }
            Value::Function(_) => return Err(ConversionError::Unsupported("function")),
        })
    }

    /// Convert a map value into an engine object.
    pub fn to_engine_object(&self) -> Result<EngineValue, ConversionError> {
        match self {
            Value::Map(_) => self.to_engine(),
            other => Err(ConversionError::UnexpectedShape {
                expected: "map",
                found: other.kind(),
            }),
        }
    }

    /// Convert back from the engine representation.
    ///
    /// Integral numbers that fit in `i64` become [`Value::Int`]; every other
    /// number becomes [`Value::Float`].
    pub fn from_engine(value: EngineValue) -> Self {
        match value {
            EngineValue::Null => Value::Nil,
            EngineValue::Bool(b) => Value::Boolean(b),
            EngineValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            EngineValue::String(s) => Value::String(s),
            EngineValue::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_engine).collect())
            }
            EngineValue::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from_engine(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_map_to_engine() {
        let value = Value::map([
            ("id", Value::from("order-1")),
            ("amount", Value::Decimal("10.50".to_string())),
            ("lines", Value::from(vec![Value::Int(1), Value::Nil])),
        ]);
        assert_eq!(
            value.to_engine().unwrap(),
            json!({"id": "order-1", "amount": 10.5, "lines": [1, null]})
        );
    }

    #[test]
    fn test_function_is_rejected_inside_containers() {
        let value = Value::map([("callback", Value::Function("notify".to_string()))]);
        assert_eq!(
            value.to_engine(),
            Err(ConversionError::Unsupported("function"))
        );
    }

    #[test]
    fn test_non_finite_float() {
        assert!(matches!(
            Value::Float(f64::INFINITY).to_engine(),
            Err(ConversionError::NonFiniteFloat(_))
        ));
    }

    #[test]
    fn test_invalid_decimal() {
        assert_eq!(
            Value::Decimal("ten".to_string()).to_engine(),
            Err(ConversionError::InvalidDecimal("ten".to_string()))
        );
    }

    #[test]
    fn test_object_shape_required() {
        assert_eq!(
            Value::Int(3).to_engine_object(),
            Err(ConversionError::UnexpectedShape {
                expected: "map",
                found: "int",
            })
        );
    }

    #[test]
    fn test_from_engine_numbers() {
        let value = Value::from_engine(json!({"n": 7, "f": 2.5, "ok": true}));
        assert_eq!(value.get("n"), Some(&Value::Int(7)));
        assert_eq!(value.get("f"), Some(&Value::Float(2.5)));
        assert_eq!(value.get("ok"), Some(&Value::Boolean(true)));
    }
}
