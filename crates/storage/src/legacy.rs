// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only access to the legacy flat key/value storage.
//!
//! The old format kept four independent JSON-encoded slots. Each is
//! optional, and an unreadable slot is treated the same as an absent one;
//! the bootstrapper substitutes its fallback field either way. This
//! module never writes.

use serde_json::Value;
use std::path::PathBuf;

pub const JOBS_SLOT: &str = "jobs";
pub const POLICY_SLOT: &str = "policy";
pub const ACTIVE_DATE_SLOT: &str = "activeDate";
pub const USER_SLOT: &str = "user";

/// Reader over a directory of `{slot}.json` files.
#[derive(Debug, Clone)]
pub struct LegacyStore {
    dir: PathBuf,
}

impl LegacyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Read and decode one slot. Absent, unreadable, and undecodable
    /// slots are all `None`.
    pub fn read_slot(&self, slot: &str) -> Option<Value> {
        let path = self.dir.join(format!("{slot}.json"));
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(_) => return None,
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(slot, error = %e, "legacy slot does not decode, ignoring");
                None
            }
        }
    }

    /// True when any slot holds data.
    pub fn has_any_data(&self) -> bool {
        [JOBS_SLOT, POLICY_SLOT, ACTIVE_DATE_SLOT, USER_SLOT]
            .iter()
            .any(|slot| self.read_slot(slot).is_some())
    }
}

#[cfg(test)]
#[path = "legacy_tests.rs"]
mod tests;
