// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::records::{AppDataSnapshot, JobRecord, PendingOp, PolicyRecord, User};
use crate::value::PayloadValue;
use crate::{OpId, OpType, StoreTable};
use serde_json::json;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for the loose payload tree.
pub mod strategies {
    use crate::value::PayloadValue;
    use proptest::prelude::*;

    /// Arbitrary payload trees, including undefined members, non-finite
    /// numbers, invalid timestamps, and opaque handles.
    pub fn arb_payload_value() -> impl Strategy<Value = PayloadValue> {
        let leaf = prop_oneof![
            Just(PayloadValue::Undefined),
            Just(PayloadValue::Null),
            any::<bool>().prop_map(PayloadValue::Bool),
            any::<f64>().prop_map(PayloadValue::Number),
            "[ a-zA-Z0-9]{0,8}".prop_map(PayloadValue::Text),
            any::<f64>().prop_map(PayloadValue::Timestamp),
            Just(PayloadValue::opaque("handle")),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(PayloadValue::Array),
                proptest::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                    .prop_map(PayloadValue::Object),
            ]
        })
    }
}

// ── Record factories ────────────────────────────────────────────────────

/// A well-formed job record with the given id, date, and crew.
pub fn job(id: i64, date: &str, crew: &str) -> JobRecord {
    JobRecord {
        id,
        date: date.to_string(),
        crew: crew.to_string(),
        client: format!("Client {id}"),
        scope: "full house".to_string(),
        notes: None,
        address: None,
        neighborhood: None,
        zip: None,
        house_tier: Some(2),
        rehang_price: Some(450.0),
        lifetime_spend: None,
        vip: false,
        both_crews: crew == crate::records::BOTH_CREWS,
        materials: None,
        updated_at: 1_000_000,
    }
}

/// A policy record with the given cutoff date.
pub fn policy(cutoff: &str) -> PolicyRecord {
    PolicyRecord {
        cutoff_date: cutoff.to_string(),
        blocked_clients: vec!["Slow Payer LLC".to_string()],
        max_jobs_per_day: 6,
        updated_at: 1_000_000,
        ..PolicyRecord::default()
    }
}

pub fn user(name: &str) -> User {
    User { name: name.to_string(), role: Some("installer".to_string()) }
}

/// A fallback snapshot with no jobs and default policy.
pub fn fallback_snapshot() -> AppDataSnapshot {
    AppDataSnapshot {
        jobs: Vec::new(),
        policy: PolicyRecord { cutoff_date: "2024-12-20".to_string(), ..PolicyRecord::default() },
        active_date: "2024-11-01".to_string(),
        user: None,
    }
}

/// A pending op targeting the jobs table.
pub fn pending_job_put(job_id: i64, created_at: u64) -> PendingOp {
    PendingOp {
        id: OpId::new(),
        queue_id: None,
        op_type: OpType::JobUpdate,
        table: StoreTable::Jobs,
        key: Some(job_id.to_string()),
        payload: json!({"id": job_id, "crew": "North"}),
        attempt: 0,
        next_at: created_at,
        created_at,
        updated_at: created_at,
    }
}

/// Payload object for a job mutation, as loose values.
pub fn job_payload(id: i64) -> PayloadValue {
    PayloadValue::object([
        ("id", PayloadValue::from(id)),
        ("date", PayloadValue::from("2024-11-12")),
        ("crew", PayloadValue::from("North")),
        ("client", PayloadValue::from("The Hendersons")),
        ("scope", PayloadValue::from("roofline")),
    ])
}
