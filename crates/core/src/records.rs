// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted record shapes for the local store and outbox.
//!
//! All records serialize with camelCase member names so the on-disk layout
//! keeps the field vocabulary of the data it migrates (`nextAt`,
//! `houseTier`, `queueId`, ...). Record kinds form a closed set: one
//! tagged [`StoredRecord`] variant per table, handled exhaustively by the
//! store and the migration step.

use crate::id::OpId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Crew label that marks a job as needing both installation crews.
pub const BOTH_CREWS: &str = "Both Crews";

/// Primary key of the singleton policy record.
pub const POLICY_KEY: &str = "org";

/// State-table key holding the currently selected schedule date.
pub const ACTIVE_DATE_KEY: &str = "activeDate";

/// State-table key holding the signed-in user.
pub const CURRENT_USER_KEY: &str = "currentUser";

/// A scheduled installation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    /// Unique across the jobs table.
    pub id: i64,
    /// ISO `YYYY-MM-DD`; non-empty after normalization.
    pub date: String,
    pub crew: String,
    pub client: String,
    pub scope: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_tier: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rehang_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime_spend: Option<f64>,
    #[serde(default)]
    pub vip: bool,
    /// Derived: true iff `crew == "Both Crews"`.
    #[serde(default)]
    pub both_crews: bool,
    /// Free-form materials sub-object; never rewritten by cleanup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materials: Option<Value>,
    /// Epoch milliseconds of the last write.
    #[serde(default)]
    pub updated_at: u64,
}

impl JobRecord {
    /// Store key for this record.
    pub fn key(&self) -> String {
        self.id.to_string()
    }

    /// Recompute the derived `both_crews` flag from `crew`.
    pub fn derive_both_crews(&mut self) {
        self.both_crews = self.crew == BOTH_CREWS;
    }
}

/// Scheduling policy, a singleton keyed [`POLICY_KEY`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRecord {
    #[serde(default = "default_policy_key")]
    pub key: String,
    /// Last date new jobs may be booked for the season.
    pub cutoff_date: String,
    #[serde(default)]
    pub blocked_clients: Vec<String>,
    #[serde(default = "default_max_jobs_per_day")]
    pub max_jobs_per_day: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaderboard: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awards: Option<Value>,
    #[serde(default)]
    pub updated_at: u64,
}

fn default_policy_key() -> String {
    POLICY_KEY.to_string()
}

fn default_max_jobs_per_day() -> u32 {
    6
}

impl Default for PolicyRecord {
    fn default() -> Self {
        Self {
            key: default_policy_key(),
            cutoff_date: String::new(),
            blocked_clients: Vec::new(),
            max_jobs_per_day: default_max_jobs_per_day(),
            season: None,
            leaderboard: None,
            awards: None,
            updated_at: 0,
        }
    }
}

/// Generic key → value cell in the state table.
///
/// Absence of a key is a valid state ("unset"), not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStateRecord {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub updated_at: u64,
}

/// Signed-in user, stored under [`CURRENT_USER_KEY`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Closed set of mutation kinds the outbox accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpType {
    #[serde(rename = "job.add")]
    JobAdd,
    #[serde(rename = "job.update")]
    JobUpdate,
    #[serde(rename = "job.delete")]
    JobDelete,
    #[serde(rename = "put")]
    Put,
    #[serde(rename = "delete")]
    Delete,
}

impl OpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpType::JobAdd => "job.add",
            OpType::JobUpdate => "job.update",
            OpType::JobDelete => "job.delete",
            OpType::Put => "put",
            OpType::Delete => "delete",
        }
    }

    /// Deletes carry no payload body.
    pub fn is_delete(&self) -> bool {
        matches!(self, OpType::JobDelete | OpType::Delete)
    }
}

impl std::fmt::Display for OpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The store's tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreTable {
    #[serde(rename = "jobs")]
    Jobs,
    #[serde(rename = "policy")]
    Policy,
    #[serde(rename = "state")]
    State,
    #[serde(rename = "pendingOps")]
    PendingOps,
}

impl StoreTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreTable::Jobs => "jobs",
            StoreTable::Policy => "policy",
            StoreTable::State => "state",
            StoreTable::PendingOps => "pendingOps",
        }
    }
}

impl std::fmt::Display for StoreTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A durably queued mutation awaiting replay against the remote backend.
///
/// Owned by the outbox: created at enqueue, deleted once the remote write
/// is acknowledged. Only `attempt`, `next_at`, and `updated_at` are ever
/// rewritten in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOp {
    pub id: OpId,
    /// Pre-migration primary key, retained for backward inspection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<String>,
    #[serde(rename = "type")]
    pub op_type: OpType,
    /// Target collection.
    pub table: StoreTable,
    /// Target record key; absent for creates that carry the key in the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Sanitized-at-enqueue mutation body.
    pub payload: Value,
    /// Retry counter, starts at 0.
    #[serde(default)]
    pub attempt: u32,
    /// Earliest epoch ms this op is eligible for (re)dispatch.
    pub next_at: u64,
    pub created_at: u64,
    pub updated_at: u64,
}

impl PendingOp {
    /// Logical target identity used for same-key ordering: the explicit
    /// key when present, else the payload's `id`, else the op's own id.
    pub fn ordering_key(&self) -> String {
        if let Some(key) = &self.key {
            return key.clone();
        }
        match self.payload.get("id") {
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(s)) => s.clone(),
            _ => self.id.to_string(),
        }
    }

    /// Remote document id for this op's write.
    pub fn doc_id(&self) -> String {
        self.ordering_key()
    }
}

/// One tagged case per table; the store and migration handle these
/// exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredRecord {
    Job(JobRecord),
    Policy(PolicyRecord),
    State(AppStateRecord),
    Pending(PendingOp),
}

impl StoredRecord {
    /// The table this record belongs to.
    pub fn table(&self) -> StoreTable {
        match self {
            StoredRecord::Job(_) => StoreTable::Jobs,
            StoredRecord::Policy(_) => StoreTable::Policy,
            StoredRecord::State(_) => StoreTable::State,
            StoredRecord::Pending(_) => StoreTable::PendingOps,
        }
    }

    /// Primary key within its table.
    pub fn key(&self) -> String {
        match self {
            StoredRecord::Job(j) => j.key(),
            StoredRecord::Policy(p) => p.key.clone(),
            StoredRecord::State(s) => s.key.clone(),
            StoredRecord::Pending(op) => op.id.to_string(),
        }
    }

    pub fn as_job(&self) -> Option<&JobRecord> {
        match self {
            StoredRecord::Job(j) => Some(j),
            _ => None,
        }
    }

    pub fn as_policy(&self) -> Option<&PolicyRecord> {
        match self {
            StoredRecord::Policy(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_state(&self) -> Option<&AppStateRecord> {
        match self {
            StoredRecord::State(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_pending(&self) -> Option<&PendingOp> {
        match self {
            StoredRecord::Pending(op) => Some(op),
            _ => None,
        }
    }

    pub fn into_job(self) -> Option<JobRecord> {
        match self {
            StoredRecord::Job(j) => Some(j),
            _ => None,
        }
    }

    pub fn into_pending(self) -> Option<PendingOp> {
        match self {
            StoredRecord::Pending(op) => Some(op),
            _ => None,
        }
    }
}

/// In-memory projection handed to the application at startup.
///
/// Never persisted as a unit; always rebuilt from the store (or a
/// caller-supplied fallback).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDataSnapshot {
    pub jobs: Vec<JobRecord>,
    pub policy: PolicyRecord,
    pub active_date: String,
    pub user: Option<User>,
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
