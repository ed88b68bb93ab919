// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable, versioned record storage.
//!
//! One directory per store: an exclusive advisory lock file, a JSON
//! snapshot document holding every table, and zstd archives of
//! pre-migration snapshots. All mutations serialize through a mutex and
//! rewrite the snapshot atomically (temp file + rename), so readers never
//! observe a partially applied batch and a crash mid-write leaves the
//! previous snapshot intact.

use crate::error::StoreError;
use crate::migration::{snapshot_version, MigrationRegistry};
use fs2::FileExt;
use gl_core::{
    AppStateRecord, JobRecord, OpId, PendingOp, PolicyRecord, StoreTable, StoredRecord,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Current on-disk schema version.
pub const SCHEMA_VERSION: u32 = 2;

const STORE_FILE: &str = "store.json";
const LOCK_FILE: &str = "store.lock";
const MAX_BACKUPS: u32 = 3;

/// Ordered secondary access paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexField {
    /// Jobs by ISO date.
    Date,
    /// Pending ops by enqueue time.
    CreatedAt,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableSet {
    #[serde(default)]
    jobs: BTreeMap<String, JobRecord>,
    #[serde(default)]
    policy: BTreeMap<String, PolicyRecord>,
    #[serde(default)]
    state: BTreeMap<String, AppStateRecord>,
    #[serde(default)]
    pending_ops: BTreeMap<String, PendingOp>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreDoc {
    v: u32,
    tables: TableSet,
}

/// The on-device system of record.
#[derive(Debug)]
pub struct LocalStore {
    dir: PathBuf,
    inner: Mutex<TableSet>,
    /// Held for the lifetime of the store; dropping releases the lock.
    _lock: File,
}

impl LocalStore {
    /// Open or create the store at `dir`, migrating an older snapshot
    /// first. `now_ms` stamps any freshly computed migration fields.
    ///
    /// Errors: [`StoreError::Unavailable`] when the directory or lock
    /// cannot be acquired; [`StoreError::Migration`] when the snapshot is
    /// newer than this build or an upgrade transform fails.
    pub fn open(dir: &Path, now_ms: u64) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)
            .map_err(|e| StoreError::Unavailable(format!("cannot create {}: {e}", dir.display())))?;

        let lock_path = dir.join(LOCK_FILE);
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| StoreError::Unavailable(format!("cannot open lock file: {e}")))?;
        lock.try_lock_exclusive()
            .map_err(|e| StoreError::Unavailable(format!("store is locked: {e}")))?;

        let store = Self { dir: dir.to_path_buf(), inner: Mutex::new(TableSet::default()), _lock: lock };
        let tables = store.load_snapshot(now_ms)?;
        *store.inner.lock() = tables;
        Ok(store)
    }

    fn store_path(&self) -> PathBuf {
        self.dir.join(STORE_FILE)
    }

    fn load_snapshot(&self, now_ms: u64) -> Result<TableSet, StoreError> {
        let path = self.store_path();
        if !path.exists() {
            self.write_snapshot(&TableSet::default())?;
            return Ok(TableSet::default());
        }

        let bytes = fs::read(&path)?;
        let raw: Value = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt store snapshot, starting empty");
                rotate_to_backup(&path)?;
                self.write_snapshot(&TableSet::default())?;
                return Ok(TableSet::default());
            }
        };

        let version = snapshot_version(&raw);
        let raw = if version < SCHEMA_VERSION {
            tracing::info!(from = version, to = SCHEMA_VERSION, "migrating store snapshot");
            self.archive_snapshot(version, &bytes);
            let migrated = MigrationRegistry::new().migrate_to(raw, SCHEMA_VERSION, now_ms)?;
            // Persist before anything else reads the store, so a crash
            // here re-runs the (re-entrant) migration rather than
            // observing a half-upgraded snapshot.
            self.write_raw_snapshot(&migrated)?;
            migrated
        } else if version > SCHEMA_VERSION {
            return Err(crate::migration::MigrationError::TooNew(version, SCHEMA_VERSION).into());
        } else {
            raw
        };

        let doc: StoreDoc = serde_json::from_value(raw).map_err(|e| {
            StoreError::Migration(crate::migration::MigrationError::Transform(format!(
                "snapshot does not parse at version {SCHEMA_VERSION}: {e}"
            )))
        })?;
        Ok(doc.tables)
    }

    /// Best-effort compressed archive of the pre-migration snapshot.
    fn archive_snapshot(&self, version: u32, bytes: &[u8]) {
        let path = self.dir.join(format!("store.v{version}.json.zst"));
        match zstd::stream::encode_all(bytes, 3) {
            Ok(compressed) => {
                if let Err(e) = fs::write(&path, compressed) {
                    tracing::warn!(path = %path.display(), error = %e, "failed to write migration archive");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to compress migration archive"),
        }
    }

    fn write_snapshot(&self, tables: &TableSet) -> Result<(), StoreError> {
        let doc = StoreDoc { v: SCHEMA_VERSION, tables: tables.clone() };
        self.write_raw_snapshot(&serde_json::to_value(&doc)?)
    }

    fn write_raw_snapshot(&self, doc: &Value) -> Result<(), StoreError> {
        let path = self.store_path();
        let tmp = self.dir.join(format!("{STORE_FILE}.tmp"));
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&serde_json::to_vec(doc)?)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Run `apply` against the tables and persist the result as one unit.
    /// If the snapshot write fails the in-memory state is rolled back, so
    /// a batch is all-or-nothing.
    fn mutate<T>(&self, apply: impl FnOnce(&mut TableSet) -> T) -> Result<T, StoreError> {
        let mut inner = self.inner.lock();
        let rollback = inner.clone();
        let out = apply(&mut inner);
        if let Err(e) = self.write_snapshot(&inner) {
            *inner = rollback;
            return Err(e);
        }
        Ok(out)
    }

    // ── Generic table API ───────────────────────────────────────────────

    /// Fetch by primary key. Absence is `None`, never an error.
    pub fn get(&self, table: StoreTable, key: &str) -> Option<StoredRecord> {
        let inner = self.inner.lock();
        match table {
            StoreTable::Jobs => inner.jobs.get(key).cloned().map(StoredRecord::Job),
            StoreTable::Policy => inner.policy.get(key).cloned().map(StoredRecord::Policy),
            StoreTable::State => inner.state.get(key).cloned().map(StoredRecord::State),
            StoreTable::PendingOps => {
                inner.pending_ops.get(key).cloned().map(StoredRecord::Pending)
            }
        }
    }

    /// Upsert one record into its table.
    pub fn put(&self, record: StoredRecord) -> Result<(), StoreError> {
        self.bulk_upsert(vec![record])
    }

    /// Upsert a batch as one durable unit; partial application is not
    /// possible.
    pub fn bulk_upsert(&self, records: Vec<StoredRecord>) -> Result<(), StoreError> {
        self.mutate(|tables| {
            for record in records {
                match record {
                    StoredRecord::Job(job) => {
                        tables.jobs.insert(job.key(), job);
                    }
                    StoredRecord::Policy(policy) => {
                        tables.policy.insert(policy.key.clone(), policy);
                    }
                    StoredRecord::State(state) => {
                        tables.state.insert(state.key.clone(), state);
                    }
                    StoredRecord::Pending(op) => {
                        tables.pending_ops.insert(op.id.to_string(), op);
                    }
                }
            }
        })
    }

    /// Delete by primary key; returns whether a record was removed.
    pub fn delete(&self, table: StoreTable, key: &str) -> Result<bool, StoreError> {
        self.mutate(|tables| match table {
            StoreTable::Jobs => tables.jobs.remove(key).is_some(),
            StoreTable::Policy => tables.policy.remove(key).is_some(),
            StoreTable::State => tables.state.remove(key).is_some(),
            StoreTable::PendingOps => tables.pending_ops.remove(key).is_some(),
        })
    }

    /// Replace a table's entire contents as one durable unit.
    pub fn replace_all(
        &self,
        table: StoreTable,
        records: Vec<StoredRecord>,
    ) -> Result<(), StoreError> {
        self.mutate(|tables| {
            match table {
                StoreTable::Jobs => tables.jobs.clear(),
                StoreTable::Policy => tables.policy.clear(),
                StoreTable::State => tables.state.clear(),
                StoreTable::PendingOps => tables.pending_ops.clear(),
            }
            for record in records {
                match record {
                    StoredRecord::Job(job) => {
                        tables.jobs.insert(job.key(), job);
                    }
                    StoredRecord::Policy(policy) => {
                        tables.policy.insert(policy.key.clone(), policy);
                    }
                    StoredRecord::State(state) => {
                        tables.state.insert(state.key.clone(), state);
                    }
                    StoredRecord::Pending(op) => {
                        tables.pending_ops.insert(op.id.to_string(), op);
                    }
                }
            }
        })
    }

    /// Remove every record in a table.
    pub fn clear(&self, table: StoreTable) -> Result<(), StoreError> {
        self.mutate(|tables| match table {
            StoreTable::Jobs => tables.jobs.clear(),
            StoreTable::Policy => tables.policy.clear(),
            StoreTable::State => tables.state.clear(),
            StoreTable::PendingOps => tables.pending_ops.clear(),
        })
    }

    pub fn count(&self, table: StoreTable) -> usize {
        let inner = self.inner.lock();
        match table {
            StoreTable::Jobs => inner.jobs.len(),
            StoreTable::Policy => inner.policy.len(),
            StoreTable::State => inner.state.len(),
            StoreTable::PendingOps => inner.pending_ops.len(),
        }
    }

    /// Ordered scan over a table's indexed field. Finite and restartable:
    /// each call materializes a fresh ordered snapshot.
    pub fn scan_ordered(
        &self,
        table: StoreTable,
        index: IndexField,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        match (table, index) {
            (StoreTable::Jobs, IndexField::Date) => {
                Ok(self.jobs_by_date().into_iter().map(StoredRecord::Job).collect())
            }
            (StoreTable::PendingOps, IndexField::CreatedAt) => {
                Ok(self.pending_by_created().into_iter().map(StoredRecord::Pending).collect())
            }
            _ => Err(StoreError::InvalidIndex { table, index }),
        }
    }

    // ── Typed convenience accessors ─────────────────────────────────────

    /// All jobs ordered by (date, id).
    pub fn jobs_by_date(&self) -> Vec<JobRecord> {
        let inner = self.inner.lock();
        let mut jobs: Vec<JobRecord> = inner.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        jobs
    }

    /// All pending ops ordered by (created_at, id).
    pub fn pending_by_created(&self) -> Vec<PendingOp> {
        let inner = self.inner.lock();
        let mut ops: Vec<PendingOp> = inner.pending_ops.values().cloned().collect();
        ops.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        ops
    }

    pub fn policy(&self, key: &str) -> Option<PolicyRecord> {
        self.inner.lock().policy.get(key).cloned()
    }

    pub fn state(&self, key: &str) -> Option<AppStateRecord> {
        self.inner.lock().state.get(key).cloned()
    }

    /// Rewrite one pending op's retry bookkeeping in place. Returns false
    /// if the op no longer exists.
    pub fn update_pending(
        &self,
        id: &OpId,
        rewrite: impl FnOnce(&mut PendingOp),
    ) -> Result<bool, StoreError> {
        self.mutate(|tables| match tables.pending_ops.get_mut(id.as_str()) {
            Some(op) => {
                rewrite(op);
                true
            }
            None => false,
        })
    }
}

/// Rotate a corrupt snapshot out of the way, keeping the most recent
/// `MAX_BACKUPS` copies (`.bak`, `.bak.2`, `.bak.3`).
fn rotate_to_backup(path: &Path) -> Result<(), StoreError> {
    let backup = |n: u32| -> PathBuf {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };
    let oldest = backup(MAX_BACKUPS);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for n in (1..MAX_BACKUPS).rev() {
        let from = backup(n);
        if from.exists() {
            fs::rename(&from, backup(n + 1))?;
        }
    }
    fs::rename(path, backup(1))?;
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
