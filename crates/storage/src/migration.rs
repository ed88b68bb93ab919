// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema migration registry.
//!
//! Migrations rewrite the raw snapshot document (as JSON) before it is
//! parsed into typed tables, one version step at a time in increasing
//! order. Every step must be re-entrant: running it against an
//! already-migrated snapshot is a no-op.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MigrationError {
    /// Snapshot was written by a newer build than this one.
    #[error("snapshot version {0} is newer than supported version {1}")]
    TooNew(u32, u32),

    /// No registered migration covers this version gap.
    #[error("no migration path from version {0} to {1}")]
    NoPath(u32, u32),

    #[error("migration transform failed: {0}")]
    Transform(String),
}

/// A single version-step transform over the raw snapshot document.
pub trait Migration: Send + Sync {
    fn source_version(&self) -> u32;
    fn target_version(&self) -> u32;
    /// Rewrite `snapshot` in place. `now_ms` is the wall time at open;
    /// freshly stamped fields must derive from it, never from old data.
    fn migrate(&self, snapshot: &mut Value, now_ms: u64) -> Result<(), MigrationError>;
}

/// Ordered collection of migration steps.
pub struct MigrationRegistry {
    pub(crate) migrations: Vec<Box<dyn Migration>>,
}

impl MigrationRegistry {
    /// Registry with all real migrations registered.
    pub fn new() -> Self {
        Self { migrations: vec![Box::new(PendingOpsV1ToV2)] }
    }

    /// Apply migrations until `snapshot` reaches `target`.
    pub fn migrate_to(
        &self,
        mut snapshot: Value,
        target: u32,
        now_ms: u64,
    ) -> Result<Value, MigrationError> {
        let mut version = snapshot_version(&snapshot);
        if version > target {
            return Err(MigrationError::TooNew(version, target));
        }
        while version < target {
            let step = self
                .migrations
                .iter()
                .find(|m| m.source_version() == version)
                .ok_or(MigrationError::NoPath(version, target))?;
            step.migrate(&mut snapshot, now_ms)?;
            version = step.target_version();
            let doc = snapshot
                .as_object_mut()
                .ok_or_else(|| MigrationError::Transform("snapshot is not an object".into()))?;
            doc.insert("v".to_string(), version.into());
        }
        Ok(snapshot)
    }
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Missing or malformed version metadata is treated as the oldest
/// supported version.
pub fn snapshot_version(snapshot: &Value) -> u32 {
    snapshot.get("v").and_then(Value::as_u64).unwrap_or(1) as u32
}

/// v1 → v2: rewrite legacy pending-operation records into the current
/// PendingOp shape.
///
/// A v1 entry is keyed by `queueId` and shaped
/// `{queueId, kind, table, key, payload, ts}`. The rewrite copies
/// `queueId` into `id` (retaining the original field for backward
/// inspection), renames `kind` to `type`, initializes `attempt = 0`, and
/// stamps `nextAt`/`createdAt`/`updatedAt` from the open-time clock —
/// never from `ts`. Entries already carrying `id` and `attempt` are left
/// untouched, so the step is re-entrant.
struct PendingOpsV1ToV2;

impl Migration for PendingOpsV1ToV2 {
    fn source_version(&self) -> u32 {
        1
    }

    fn target_version(&self) -> u32 {
        2
    }

    fn migrate(&self, snapshot: &mut Value, now_ms: u64) -> Result<(), MigrationError> {
        let Some(ops) = snapshot.pointer_mut("/tables/pendingOps") else {
            return Ok(());
        };
        let ops = ops
            .as_object_mut()
            .ok_or_else(|| MigrationError::Transform("pendingOps is not an object".into()))?;

        // Stamps must be strictly positive even under a degenerate clock.
        let stamp = now_ms.max(1);

        for (key, entry) in ops.iter_mut() {
            let op = entry.as_object_mut().ok_or_else(|| {
                MigrationError::Transform(format!("pending op '{key}' is not an object"))
            })?;

            if op.contains_key("id") && op.contains_key("attempt") {
                continue;
            }

            let id = op
                .get("queueId")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| key.clone());
            op.insert("id".to_string(), Value::String(id));

            if let Some(kind) = op.remove("kind") {
                op.insert("type".to_string(), kind);
            }

            op.insert("attempt".to_string(), 0.into());
            op.insert("nextAt".to_string(), stamp.into());
            op.insert("createdAt".to_string(), stamp.into());
            op.insert("updatedAt".to_string(), stamp.into());
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
