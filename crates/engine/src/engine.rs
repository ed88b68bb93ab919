// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine's top-level type and caller-facing persistence surface.
//!
//! The local store is the source of truth for everything the UI shows;
//! persist calls land there synchronously and never wait on the remote
//! backend. The store handle is explicit and owned here — constructed at
//! most once, shared by reference with the bootstrapper and the outbox.

use crate::error::EngineError;
use crate::remote::RemoteStore;
use gl_core::{
    AppStateRecord, Clock, JobRecord, PolicyRecord, StoreTable, StoredRecord, SyncConfig,
    SystemClock, User, ACTIVE_DATE_KEY, CURRENT_USER_KEY, POLICY_KEY,
};
use gl_storage::{dates::normalize_date, LocalStore, StoreError};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Count of jobs rewritten by [`SyncEngine::cleanup_data`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub jobs: usize,
}

/// Offline-first persistence and sync engine.
pub struct SyncEngine<C: Clock = SystemClock> {
    pub(crate) config: SyncConfig,
    pub(crate) clock: C,
    pub(crate) remote: Arc<dyn RemoteStore>,
    /// Opened at most once; `None` until bootstrap succeeds in opening.
    store: Mutex<Option<Arc<LocalStore>>>,
    /// One session acquisition per engine lifetime.
    pub(crate) session: tokio::sync::OnceCell<()>,
    /// (table, key) pairs with an in-flight remote write.
    pub(crate) in_flight: Mutex<HashSet<String>>,
}

impl SyncEngine<SystemClock> {
    pub fn new(config: SyncConfig, remote: Arc<dyn RemoteStore>) -> Self {
        Self::with_clock(config, remote, SystemClock)
    }
}

impl<C: Clock> SyncEngine<C> {
    pub fn with_clock(config: SyncConfig, remote: Arc<dyn RemoteStore>, clock: C) -> Self {
        Self {
            config,
            clock,
            remote,
            store: Mutex::new(None),
            session: tokio::sync::OnceCell::new(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Open the store if it has not been opened yet, returning the shared
    /// handle. Serialized so concurrent callers cannot race two opens
    /// against the same lock file.
    pub(crate) fn open_store(&self) -> Result<Arc<LocalStore>, StoreError> {
        let mut slot = self.store.lock();
        if let Some(store) = slot.as_ref() {
            return Ok(store.clone());
        }
        let store = Arc::new(LocalStore::open(&self.config.data_dir, self.clock.epoch_ms())?);
        *slot = Some(store.clone());
        Ok(store)
    }

    /// The already-opened store, if any. Persist paths use this: when the
    /// durable medium never became available the session runs purely
    /// in-memory and writes are skipped.
    pub(crate) fn store_handle(&self) -> Option<Arc<LocalStore>> {
        self.store.lock().clone()
    }

    // ── Persistence surface ─────────────────────────────────────────────

    /// Replace the jobs table with `jobs`. An empty list clears the table
    /// rather than leaving stale rows.
    pub fn persist_jobs(&self, jobs: &[JobRecord]) -> Result<(), EngineError> {
        let Some(store) = self.store_handle() else {
            tracing::debug!("store unavailable, keeping jobs in memory only");
            return Ok(());
        };
        let now = self.clock.epoch_ms();
        let mut records = Vec::with_capacity(jobs.len());
        for job in jobs {
            let mut job = job.clone();
            match normalize_date(&job.date) {
                Some(date) => job.date = date,
                None => {
                    tracing::warn!(id = job.id, "skipping job with empty date");
                    continue;
                }
            }
            job.derive_both_crews();
            job.updated_at = now;
            records.push(StoredRecord::Job(job));
        }
        store.replace_all(StoreTable::Jobs, records)?;
        Ok(())
    }

    pub fn persist_policy(&self, policy: &PolicyRecord) -> Result<(), EngineError> {
        let Some(store) = self.store_handle() else {
            tracing::debug!("store unavailable, keeping policy in memory only");
            return Ok(());
        };
        let mut policy = policy.clone();
        policy.key = POLICY_KEY.to_string();
        policy.updated_at = self.clock.epoch_ms();
        store.put(StoredRecord::Policy(policy))?;
        Ok(())
    }

    pub fn persist_active_date(&self, date: &str) -> Result<(), EngineError> {
        self.persist_state(ACTIVE_DATE_KEY, serde_json::Value::String(date.to_string()))
    }

    /// `None` unsets the stored user; absence of the key is a valid state.
    pub fn persist_user(&self, user: Option<&User>) -> Result<(), EngineError> {
        let Some(store) = self.store_handle() else {
            return Ok(());
        };
        match user {
            Some(user) => self.persist_state(
                CURRENT_USER_KEY,
                serde_json::to_value(user).map_err(StoreError::from)?,
            ),
            None => {
                store.delete(StoreTable::State, CURRENT_USER_KEY)?;
                Ok(())
            }
        }
    }

    fn persist_state(&self, key: &str, value: serde_json::Value) -> Result<(), EngineError> {
        let Some(store) = self.store_handle() else {
            tracing::debug!(key, "store unavailable, keeping state in memory only");
            return Ok(());
        };
        store.put(StoredRecord::State(AppStateRecord {
            key: key.to_string(),
            value,
            updated_at: self.clock.epoch_ms(),
        }))?;
        Ok(())
    }

    // ── Maintenance ─────────────────────────────────────────────────────

    /// Re-normalize string fields across all stored jobs: trims free-text
    /// fields and canonicalizes dates. Nested `materials` sub-objects are
    /// left untouched.
    pub fn cleanup_data(&self) -> Result<CleanupReport, EngineError> {
        let Some(store) = self.store_handle() else {
            return Ok(CleanupReport::default());
        };
        let now = self.clock.epoch_ms();
        let mut rewritten = Vec::new();

        for mut job in store.jobs_by_date() {
            let mut touched = false;
            for field in [&mut job.crew, &mut job.client, &mut job.scope] {
                let trimmed = field.trim();
                if trimmed.len() != field.len() {
                    *field = trimmed.to_string();
                    touched = true;
                }
            }
            for field in [&mut job.notes, &mut job.address, &mut job.neighborhood, &mut job.zip] {
                if let Some(text) = field {
                    let trimmed = text.trim();
                    if trimmed.len() != text.len() {
                        *text = trimmed.to_string();
                        touched = true;
                    }
                }
            }
            if let Some(date) = normalize_date(&job.date) {
                if date != job.date {
                    job.date = date;
                    touched = true;
                }
            }
            let both = job.crew == gl_core::BOTH_CREWS;
            if job.both_crews != both {
                job.both_crews = both;
                touched = true;
            }
            if touched {
                job.updated_at = now;
                rewritten.push(StoredRecord::Job(job));
            }
        }

        let count = rewritten.len();
        if count > 0 {
            store.bulk_upsert(rewritten)?;
            tracing::info!(jobs = count, "cleanup normalized stored jobs");
        }
        Ok(CleanupReport { jobs: count })
    }

    /// Number of ops waiting in the outbox.
    pub fn pending_count(&self) -> usize {
        self.store_handle().map(|store| store.count(StoreTable::PendingOps)).unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
