// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound payload sanitization.
//!
//! The remote document store rejects absent members, cannot represent
//! non-finite numbers, and is intolerant of non-plain object graphs.
//! Centralizing the rule set here means every write path gets identical
//! guarantees instead of depending on caller discipline.

use crate::value::{finite_number, PayloadValue};
use serde_json::Value;

/// Path label for the root of the sanitized tree.
const ROOT: &str = "$";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SanitizeOptions {
    /// Drop string members that are empty after trimming instead of
    /// keeping them as `""`.
    pub remove_empty_strings: bool,
}

/// Parallel lists of dotted/bracketed paths touched by sanitization.
///
/// Returned by value; the caller decides whether to log it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SanitizationReport {
    /// Members dropped from the output entirely.
    pub removed: Vec<String>,
    /// Strings rewritten by trimming.
    pub trimmed: Vec<String>,
    /// Non-finite numbers replaced with `null`.
    pub numbers_nulled: Vec<String>,
    /// Members whose type was rewritten (numeric strings, clamped ints).
    pub coerced: Vec<String>,
}

impl SanitizationReport {
    pub fn is_clean(&self) -> bool {
        self.removed.is_empty()
            && self.trimmed.is_empty()
            && self.numbers_nulled.is_empty()
            && self.coerced.is_empty()
    }

    pub fn merge(&mut self, other: SanitizationReport) {
        self.removed.extend(other.removed);
        self.trimmed.extend(other.trimmed);
        self.numbers_nulled.extend(other.numbers_nulled);
        self.coerced.extend(other.coerced);
    }
}

/// Transform a loose value tree into JSON safe for the remote store.
///
/// `None` means the value itself sanitized away (an "undefined" result);
/// containers never keep such members. See the module docs for the rules.
pub fn safe_serialize(
    value: &PayloadValue,
    options: &SanitizeOptions,
) -> (Option<Value>, SanitizationReport) {
    let mut report = SanitizationReport::default();
    let out = sanitize_at(value, options, ROOT, &mut report);
    (out, report)
}

fn sanitize_at(
    value: &PayloadValue,
    options: &SanitizeOptions,
    path: &str,
    report: &mut SanitizationReport,
) -> Option<Value> {
    match value {
        PayloadValue::Undefined | PayloadValue::Opaque(_) => {
            report.removed.push(path.to_string());
            None
        }
        PayloadValue::Null => Some(Value::Null),
        PayloadValue::Bool(b) => Some(Value::Bool(*b)),
        PayloadValue::Number(n) | PayloadValue::Timestamp(n) => {
            if n.is_finite() {
                Some(finite_number(*n))
            } else {
                report.numbers_nulled.push(path.to_string());
                Some(Value::Null)
            }
        }
        PayloadValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.len() != s.len() {
                report.trimmed.push(path.to_string());
            }
            if trimmed.is_empty() && options.remove_empty_strings {
                report.removed.push(path.to_string());
                None
            } else {
                Some(Value::String(trimmed.to_string()))
            }
        }
        PayloadValue::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                // Dropped elements are omitted; the array is compacted,
                // never left sparse.
                if let Some(v) = sanitize_at(item, options, &index_path(path, i), report) {
                    out.push(v);
                }
            }
            Some(Value::Array(out))
        }
        PayloadValue::Object(members) => {
            let mut out = serde_json::Map::new();
            for (key, member) in members {
                if let Some(v) = sanitize_at(member, options, &member_path(path, key), report) {
                    out.insert(key.clone(), v);
                }
            }
            Some(Value::Object(out))
        }
    }
}

/// Structural cleanup only: prune undefined/opaque members and compact
/// containers, without trimming strings or nulling numbers.
pub fn strip_undefined(value: &PayloadValue) -> Option<PayloadValue> {
    match value {
        PayloadValue::Undefined | PayloadValue::Opaque(_) => None,
        PayloadValue::Array(items) => {
            Some(PayloadValue::Array(items.iter().filter_map(strip_undefined).collect()))
        }
        PayloadValue::Object(members) => Some(PayloadValue::Object(
            members
                .iter()
                .filter_map(|(k, v)| strip_undefined(v).map(|v| (k.clone(), v)))
                .collect(),
        )),
        other => Some(other.clone()),
    }
}

fn member_path(parent: &str, key: &str) -> String {
    if parent == ROOT {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn index_path(parent: &str, index: usize) -> String {
    if parent == ROOT {
        format!("[{index}]")
    } else {
        format!("{parent}[{index}]")
    }
}

#[cfg(test)]
#[path = "sanitize_tests.rs"]
mod tests;
