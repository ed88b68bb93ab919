// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pending-op identifier.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Unique identifier for a queued mutation.
///
/// Format is `op-{nanoid}` (23 characters total, fits SmolStr inline
/// capacity). Stable for the life of the op, including across schema
/// migrations of the queue itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpId(SmolStr);

impl OpId {
    pub const PREFIX: &'static str = "op-";

    /// Generate a new random ID with the type prefix.
    pub fn new() -> Self {
        Self(SmolStr::new(format!("{}{}", Self::PREFIX, nanoid::nanoid!(19))))
    }

    /// Create an ID from an existing string (parsing, migration).
    pub fn from_string(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for OpId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OpId {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for OpId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl PartialEq<str> for OpId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for OpId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
