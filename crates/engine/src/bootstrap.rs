// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot startup hydration.
//!
//! Bootstrap produces exactly one snapshot for the application, choosing
//! between the durable store, a one-time import of the legacy flat
//! format, and a caller-supplied in-memory fallback. The legacy import
//! only triggers while the jobs table is empty, so once any job has been
//! persisted it can never re-import — the legacy slots themselves are
//! never written or deleted.

use crate::engine::SyncEngine;
use crate::error::EngineError;
use gl_core::{
    AppDataSnapshot, AppStateRecord, Clock, JobRecord, PolicyRecord, StoreTable, StoredRecord,
    User, ACTIVE_DATE_KEY, CURRENT_USER_KEY, POLICY_KEY,
};
use gl_storage::dates::normalize_date;
use gl_storage::legacy::{ACTIVE_DATE_SLOT, JOBS_SLOT, POLICY_SLOT, USER_SLOT};
use gl_storage::{LegacyStore, LocalStore};
use serde_json::Value;
use std::sync::Arc;

/// Where the bootstrap snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotSource {
    /// Read back out of the durable store.
    Store,
    /// Imported from the legacy flat key/value format.
    LegacyFlat,
    /// The caller-supplied in-memory snapshot.
    Fallback,
}

impl SnapshotSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotSource::Store => "store",
            SnapshotSource::LegacyFlat => "legacy-flat",
            SnapshotSource::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapResult {
    pub snapshot: AppDataSnapshot,
    pub source: SnapshotSource,
    /// False only when the durable store never became usable this
    /// session.
    pub store_available: bool,
}

impl<C: Clock> SyncEngine<C> {
    /// Produce the startup snapshot. Never fails: every error path
    /// degrades to `fallback` so the application stays usable offline.
    pub fn bootstrap_app_data(&self, fallback: AppDataSnapshot) -> BootstrapResult {
        let store = match self.open_store() {
            Ok(store) => store,
            Err(e) => {
                // Unavailable is the expected degraded path; a failed
                // migration is a harder signal since data may be stuck at
                // an old version.
                if e.is_unavailable() {
                    tracing::warn!(error = %e, "local store unavailable, serving fallback snapshot");
                } else {
                    tracing::warn!(error = %e, "local store migration failed, serving fallback snapshot");
                }
                return BootstrapResult {
                    snapshot: fallback,
                    source: SnapshotSource::Fallback,
                    store_available: false,
                };
            }
        };

        match self.hydrate(&store, &fallback) {
            Ok(result) => result,
            Err(e) => {
                // The store stays open and usable for later writes even
                // though this read fell back.
                tracing::warn!(error = %e, "bootstrap read failed, serving fallback snapshot");
                BootstrapResult {
                    snapshot: fallback,
                    source: SnapshotSource::Fallback,
                    store_available: true,
                }
            }
        }
    }

    fn hydrate(
        &self,
        store: &Arc<LocalStore>,
        fallback: &AppDataSnapshot,
    ) -> Result<BootstrapResult, EngineError> {
        if store.count(StoreTable::Jobs) == 0 {
            return self.import_legacy(store, fallback);
        }

        let snapshot = AppDataSnapshot {
            jobs: store.jobs_by_date(),
            policy: store.policy(POLICY_KEY).unwrap_or_else(|| fallback.policy.clone()),
            active_date: store
                .state(ACTIVE_DATE_KEY)
                .and_then(|record| record.value.as_str().map(str::to_string))
                .unwrap_or_else(|| fallback.active_date.clone()),
            user: store
                .state(CURRENT_USER_KEY)
                .and_then(|record| serde_json::from_value::<User>(record.value).ok())
                .or_else(|| fallback.user.clone()),
        };
        Ok(BootstrapResult {
            snapshot,
            source: SnapshotSource::Store,
            store_available: true,
        })
    }

    /// One-time migration out of the legacy flat format. Each slot is
    /// independently optional and falls back to the corresponding field
    /// of the caller's snapshot.
    fn import_legacy(
        &self,
        store: &Arc<LocalStore>,
        fallback: &AppDataSnapshot,
    ) -> Result<BootstrapResult, EngineError> {
        let now = self.clock.epoch_ms();
        let legacy = self.config.legacy_dir.as_ref().map(LegacyStore::new);
        let read_slot =
            |slot: &str| -> Option<Value> { legacy.as_ref().and_then(|l| l.read_slot(slot)) };

        let jobs = match read_slot(JOBS_SLOT) {
            Some(Value::Array(entries)) => {
                let mut jobs = Vec::with_capacity(entries.len());
                for entry in &entries {
                    match job_from_legacy(entry, now) {
                        Some(job) => jobs.push(job),
                        None => tracing::warn!("skipping undecodable legacy job entry"),
                    }
                }
                jobs
            }
            Some(_) | None => fallback.jobs.clone(),
        };

        let policy = match read_slot(POLICY_SLOT) {
            Some(value) => policy_from_legacy(value, now),
            None => fallback.policy.clone(),
        };

        let active_date = read_slot(ACTIVE_DATE_SLOT)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| fallback.active_date.clone());

        let user = match read_slot(USER_SLOT) {
            Some(Value::Null) => None,
            Some(value) => serde_json::from_value::<User>(value).ok().or_else(|| fallback.user.clone()),
            None => fallback.user.clone(),
        };

        store.bulk_upsert(jobs.iter().cloned().map(StoredRecord::Job).collect())?;
        store.put(StoredRecord::Policy(policy.clone()))?;
        store.put(StoredRecord::State(AppStateRecord {
            key: ACTIVE_DATE_KEY.to_string(),
            value: Value::String(active_date.clone()),
            updated_at: now,
        }))?;
        if let Some(user) = &user {
            store.put(StoredRecord::State(AppStateRecord {
                key: CURRENT_USER_KEY.to_string(),
                value: serde_json::to_value(user).map_err(gl_storage::StoreError::from)?,
                updated_at: now,
            }))?;
        }

        tracing::info!(jobs = jobs.len(), "imported legacy flat storage into local store");

        let mut jobs = jobs;
        jobs.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
        Ok(BootstrapResult {
            snapshot: AppDataSnapshot { jobs, policy, active_date, user },
            source: SnapshotSource::LegacyFlat,
            store_available: true,
        })
    }
}

/// Decode one legacy job entry, tolerating the loose typing of the old
/// format (numeric strings, missing flags). Entries without a usable id
/// or date are dropped.
fn job_from_legacy(entry: &Value, now: u64) -> Option<JobRecord> {
    let obj = entry.as_object()?;
    let id = match obj.get("id") {
        Some(Value::Number(n)) => n.as_i64()?,
        Some(Value::String(s)) => s.trim().parse().ok()?,
        _ => return None,
    };
    let date = normalize_date(obj.get("date").and_then(Value::as_str).unwrap_or(""))?;

    let text = |field: &str| -> String {
        obj.get(field).and_then(Value::as_str).unwrap_or("").trim().to_string()
    };
    let optional_text = |field: &str| -> Option<String> {
        obj.get(field).and_then(Value::as_str).map(|s| s.trim().to_string())
    };
    let number = |field: &str| -> Option<f64> {
        match obj.get(field) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
    };

    let mut job = JobRecord {
        id,
        date,
        crew: text("crew"),
        client: text("client"),
        scope: text("scope"),
        notes: optional_text("notes"),
        address: optional_text("address"),
        neighborhood: optional_text("neighborhood"),
        zip: optional_text("zip"),
        house_tier: number("houseTier").map(|n| n as i64),
        rehang_price: number("rehangPrice"),
        lifetime_spend: number("lifetimeSpend"),
        vip: obj.get("vip").and_then(Value::as_bool).unwrap_or(false),
        both_crews: false,
        materials: obj.get("materials").cloned(),
        updated_at: obj.get("updatedAt").and_then(Value::as_u64).unwrap_or(now),
    };
    job.derive_both_crews();
    Some(job)
}

fn policy_from_legacy(value: Value, now: u64) -> PolicyRecord {
    let mut policy: PolicyRecord = serde_json::from_value(value).unwrap_or_default();
    policy.key = POLICY_KEY.to_string();
    if policy.updated_at == 0 {
        policy.updated_at = now;
    }
    policy
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
