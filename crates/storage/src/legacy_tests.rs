// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use tempfile::tempdir;

#[test]
fn absent_slots_read_as_none() {
    let dir = tempdir().unwrap();
    let legacy = LegacyStore::new(dir.path());
    assert!(legacy.read_slot(JOBS_SLOT).is_none());
    assert!(!legacy.has_any_data());
}

#[test]
fn slots_decode_independently() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("jobs.json"), b"[{\"id\": 1}]").unwrap();
    std::fs::write(dir.path().join("activeDate.json"), b"\"2024-11-12\"").unwrap();

    let legacy = LegacyStore::new(dir.path());
    assert_eq!(legacy.read_slot(JOBS_SLOT), Some(json!([{"id": 1}])));
    assert_eq!(legacy.read_slot(ACTIVE_DATE_SLOT), Some(json!("2024-11-12")));
    assert!(legacy.read_slot(POLICY_SLOT).is_none());
    assert!(legacy.has_any_data());
}

#[test]
fn undecodable_slot_reads_as_none() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("policy.json"), b"{truncated").unwrap();

    let legacy = LegacyStore::new(dir.path());
    assert!(legacy.read_slot(POLICY_SLOT).is_none());
}
