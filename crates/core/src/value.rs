// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loose value tree accepted on the way into the engine.
//!
//! [`PayloadValue`] is the sanitizer's domain: unlike `serde_json::Value`
//! it can carry absent members (`Undefined`), non-finite numbers, invalid
//! timestamps, and opaque non-serializable handles. The sanitizer maps
//! this tree into clean JSON; nothing downstream of it ever sees these
//! shapes.

use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    /// An absent member; pruned by sanitization.
    Undefined,
    Null,
    Bool(bool),
    /// May be NaN or infinite.
    Number(f64),
    Text(String),
    /// Epoch milliseconds of a date-like value; NaN for an invalid instant.
    Timestamp(f64),
    Array(Vec<PayloadValue>),
    Object(BTreeMap<String, PayloadValue>),
    /// A non-serializable handle (closure, unique symbol); carries a tag
    /// for the sanitization report.
    Opaque(String),
}

impl PayloadValue {
    /// Build an object from key/value pairs.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, PayloadValue)>,
    {
        PayloadValue::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn text(s: impl Into<String>) -> Self {
        PayloadValue::Text(s.into())
    }

    pub fn opaque(tag: impl Into<String>) -> Self {
        PayloadValue::Opaque(tag.into())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, PayloadValue::Undefined)
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, PayloadValue>> {
        match self {
            PayloadValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Member lookup on objects; `Undefined` for anything else.
    pub fn get(&self, key: &str) -> &PayloadValue {
        match self {
            PayloadValue::Object(map) => map.get(key).unwrap_or(&PayloadValue::Undefined),
            _ => &PayloadValue::Undefined,
        }
    }
}

impl From<bool> for PayloadValue {
    fn from(b: bool) -> Self {
        PayloadValue::Bool(b)
    }
}

impl From<f64> for PayloadValue {
    fn from(n: f64) -> Self {
        PayloadValue::Number(n)
    }
}

impl From<i64> for PayloadValue {
    fn from(n: i64) -> Self {
        PayloadValue::Number(n as f64)
    }
}

impl From<&str> for PayloadValue {
    fn from(s: &str) -> Self {
        PayloadValue::Text(s.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(s: String) -> Self {
        PayloadValue::Text(s)
    }
}

/// Clean JSON lifts losslessly into the loose tree.
impl From<Value> for PayloadValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => PayloadValue::Null,
            Value::Bool(b) => PayloadValue::Bool(b),
            Value::Number(n) => PayloadValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => PayloadValue::Text(s),
            Value::Array(items) => {
                PayloadValue::Array(items.into_iter().map(PayloadValue::from).collect())
            }
            Value::Object(map) => PayloadValue::Object(
                map.into_iter().map(|(k, v)| (k, PayloadValue::from(v))).collect(),
            ),
        }
    }
}

/// Render a finite f64 as a JSON number, preferring integers when exact.
pub(crate) fn finite_number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < (i64::MAX as f64) {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
