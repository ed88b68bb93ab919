// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable outbox queue and its processor.
//!
//! Enqueue validates and durably records the mutation, nothing more;
//! delivery happens when the processor drains eligible ops against the
//! remote backend. Ops targeting the same record are dispatched strictly
//! in enqueue order, and a failed op blocks the rest of its group until
//! its backoff expires.

use crate::backoff::backoff_delay_ms;
use crate::engine::SyncEngine;
use crate::error::EngineError;
use gl_core::{
    safe_serialize, Clock, OpId, PendingOp, SanitizationReport, SanitizeOptions, StoreTable,
    StoredRecord, SyncMutation,
};
use serde_json::{json, Map, Value};

/// Valid house-tier domain.
pub const HOUSE_TIER_MIN: i64 = 1;
pub const HOUSE_TIER_MAX: i64 = 5;
/// Policy constant: out-of-domain tiers are rewritten to this value, not
/// clamped to the nearest boundary.
pub const HOUSE_TIER_FALLBACK: i64 = 5;

/// Outcome of a durable enqueue.
#[derive(Debug, Clone, PartialEq)]
pub struct EnqueueReceipt {
    pub op_id: OpId,
    /// What enqueue-time sanitization touched, for diagnostics.
    pub report: SanitizationReport,
}

/// Outcome of one processor drain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessReport {
    /// Ops acknowledged by the remote backend and removed.
    pub dispatched: usize,
    /// Ops that failed and were rescheduled with backoff.
    pub failed: usize,
    /// Eligible ops skipped because their key was already in flight, or
    /// because an earlier op in their group failed.
    pub skipped: usize,
    /// Ops still queued after this drain.
    pub remaining: usize,
    /// Merged sanitization paths across every dispatched payload.
    pub sanitization: SanitizationReport,
}

impl<C: Clock> SyncEngine<C> {
    /// Validate and durably record a mutation. Returns once the store
    /// write lands; no network I/O happens on this path.
    pub fn enqueue_sync_op(&self, mutation: SyncMutation) -> Result<EnqueueReceipt, EngineError> {
        mutation.validate()?;
        let store = self.open_store()?;
        let now = self.clock.epoch_ms();

        // Sanitize at enqueue so the durable payload is already valid
        // JSON; empty strings are kept — known schema fields must stay
        // present on the outbound write.
        let (payload, report) =
            safe_serialize(&mutation.payload, &SanitizeOptions { remove_empty_strings: false });

        let op = PendingOp {
            id: OpId::new(),
            queue_id: None,
            op_type: mutation.op_type,
            table: mutation.table,
            key: mutation.key,
            payload: payload.unwrap_or(Value::Null),
            attempt: 0,
            next_at: now,
            created_at: now,
            updated_at: now,
        };
        let op_id = op.id.clone();
        store.put(StoredRecord::Pending(op))?;
        tracing::debug!(op = %op_id, "enqueued sync op");
        Ok(EnqueueReceipt { op_id, report })
    }

    /// Drain every op whose `next_at` has passed (all ops when `force`).
    ///
    /// Safe to invoke concurrently with itself: per-key claims guarantee
    /// at most one in-flight remote write per (table, key), so same-key
    /// ops are never reordered. Remote failures are absorbed into backoff
    /// scheduling and reported, never raised.
    pub async fn process_pending_queue(&self, force: bool) -> Result<ProcessReport, EngineError> {
        let mut report = ProcessReport::default();
        let Some(store) = self.store_handle() else {
            return Ok(report);
        };

        let now = self.clock.epoch_ms();
        let eligible: Vec<PendingOp> = store
            .pending_by_created()
            .into_iter()
            .filter(|op| force || op.next_at <= now)
            .collect();
        if eligible.is_empty() {
            report.remaining = store.count(StoreTable::PendingOps);
            return Ok(report);
        }

        // Group by target identity, preserving created_at order within
        // and across groups.
        let mut groups: Vec<(String, Vec<PendingOp>)> = Vec::new();
        for op in eligible {
            let key = format!("{}/{}", op.table, op.ordering_key());
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, group)) => group.push(op),
                None => groups.push((key, vec![op])),
            }
        }

        // Claim keys; a concurrent drain already working a key wins.
        let mut claimed = Vec::new();
        {
            let mut in_flight = self.in_flight.lock();
            for (key, group) in groups {
                if in_flight.insert(key.clone()) {
                    claimed.push((key, group));
                } else {
                    report.skipped += group.len();
                }
            }
        }

        let session_ok = self
            .session
            .get_or_try_init(|| self.remote.ensure_session())
            .await
            .is_ok();

        for (_, group) in &claimed {
            if !session_ok {
                // Throttle the whole group through its head op's backoff.
                if let Some(head) = group.first() {
                    self.reschedule(&store, head);
                    report.failed += 1;
                    report.skipped += group.len() - 1;
                }
                continue;
            }
            self.drain_group(&store, group, &mut report).await;
        }

        {
            let mut in_flight = self.in_flight.lock();
            for (key, _) in &claimed {
                in_flight.remove(key);
            }
        }

        report.remaining = store.count(StoreTable::PendingOps);
        tracing::debug!(
            dispatched = report.dispatched,
            failed = report.failed,
            skipped = report.skipped,
            remaining = report.remaining,
            "processed pending queue"
        );
        Ok(report)
    }

    /// Dispatch one key's ops strictly in order, stopping at the first
    /// failure so later ops cannot overtake it.
    async fn drain_group(
        &self,
        store: &gl_storage::LocalStore,
        group: &[PendingOp],
        report: &mut ProcessReport,
    ) {
        for (position, op) in group.iter().enumerate() {
            let (payload, op_report) = outbound_payload(op);
            let collection = format!("{}/{}", self.config.remote_root, op.table);
            match self.remote.put(&collection, &op.doc_id(), &payload).await {
                Ok(()) => {
                    match store.delete(StoreTable::PendingOps, op.id.as_str()) {
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(op = %op.id, error = %e, "acknowledged op could not be removed");
                        }
                    }
                    report.dispatched += 1;
                    report.sanitization.merge(op_report);
                }
                Err(e) => {
                    tracing::warn!(op = %op.id, attempt = op.attempt + 1, error = %e, "remote write failed, rescheduling");
                    self.reschedule(store, op);
                    report.failed += 1;
                    report.skipped += group.len() - position - 1;
                    break;
                }
            }
        }
    }

    /// Push an op's next attempt out by its backoff delay.
    fn reschedule(&self, store: &gl_storage::LocalStore, op: &PendingOp) {
        let now = self.clock.epoch_ms();
        let base = self.config.backoff_base_ms;
        let cap = self.config.backoff_cap_ms;
        let result = store.update_pending(&op.id, |op| {
            op.attempt += 1;
            op.next_at = now + backoff_delay_ms(op.attempt, base, cap);
            op.updated_at = now;
        });
        if let Err(e) = result {
            tracing::warn!(op = %op.id, error = %e, "failed to reschedule op");
        }
    }
}

/// Build the outbound document for an op: the stored payload plus the
/// job-schema normalization pass.
fn outbound_payload(op: &PendingOp) -> (Value, SanitizationReport) {
    let mut report = SanitizationReport::default();
    if op.op_type.is_delete() {
        return (json!({ "deleted": true }), report);
    }
    let mut payload = op.payload.clone();
    if op.table == StoreTable::Jobs {
        if let Value::Object(fields) = &mut payload {
            normalize_job_fields(fields, &mut report);
        }
    }
    (payload, report)
}

/// Schema rules for outbound job documents: re-trim top-level strings
/// (idempotent), force `zip`/`neighborhood` to stay present as `""`, and
/// rewrite `houseTier` into its valid domain.
fn normalize_job_fields(fields: &mut Map<String, Value>, report: &mut SanitizationReport) {
    for (key, value) in fields.iter_mut() {
        if let Value::String(s) = value {
            let trimmed = s.trim();
            if trimmed.len() != s.len() {
                report.trimmed.push(key.clone());
                *s = trimmed.to_string();
            }
        }
    }

    for field in ["zip", "neighborhood"] {
        match fields.get(field) {
            None | Some(Value::Null) => {
                fields.insert(field.to_string(), Value::String(String::new()));
            }
            Some(_) => {}
        }
    }

    let tier = fields.get("houseTier").cloned();
    match tier {
        Some(Value::Number(n)) => {
            let rounded = n.as_f64().map(f64::round).and_then(|f| {
                if f.is_finite() {
                    Some(f as i64)
                } else {
                    None
                }
            });
            match rounded {
                Some(t) if (HOUSE_TIER_MIN..=HOUSE_TIER_MAX).contains(&t) => {
                    if Some(t) != n.as_i64() {
                        report.coerced.push("houseTier".to_string());
                        fields.insert("houseTier".to_string(), Value::from(t));
                    }
                }
                _ => {
                    report.coerced.push("houseTier".to_string());
                    fields.insert("houseTier".to_string(), Value::from(HOUSE_TIER_FALLBACK));
                }
            }
        }
        Some(Value::String(s)) => {
            report.coerced.push("houseTier".to_string());
            let replacement = match s.trim().parse::<i64>() {
                Ok(t) if (HOUSE_TIER_MIN..=HOUSE_TIER_MAX).contains(&t) => Value::from(t),
                Ok(_) => Value::from(HOUSE_TIER_FALLBACK),
                Err(_) => Value::Null,
            };
            fields.insert("houseTier".to_string(), replacement);
        }
        _ => {}
    }
}

#[cfg(test)]
#[path = "outbox_tests.rs"]
mod tests;
