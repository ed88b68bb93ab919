// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::StoreError;
use crate::migration::MigrationError;
use gl_core::test_support::{job, pending_job_put, policy};
use serde_json::json;
use tempfile::tempdir;

const NOW: u64 = 1_700_000_000_000;

#[test]
fn open_creates_store_files() {
    let dir = tempdir().unwrap();
    let store = LocalStore::open(dir.path(), NOW).unwrap();
    assert!(dir.path().join("store.json").exists());
    assert!(dir.path().join("store.lock").exists());
    assert_eq!(store.count(StoreTable::Jobs), 0);
    assert_eq!(store.count(StoreTable::PendingOps), 0);
}

#[test]
fn second_open_on_locked_store_is_unavailable() {
    let dir = tempdir().unwrap();
    let _store = LocalStore::open(dir.path(), NOW).unwrap();
    let err = LocalStore::open(dir.path(), NOW).unwrap_err();
    assert!(err.is_unavailable(), "expected Unavailable, got {err:?}");
}

#[test]
fn put_get_round_trip() {
    let dir = tempdir().unwrap();
    let store = LocalStore::open(dir.path(), NOW).unwrap();

    let record = job(7, "2024-11-12", "North");
    store.put(StoredRecord::Job(record.clone())).unwrap();

    let loaded = store.get(StoreTable::Jobs, "7").unwrap();
    assert_eq!(loaded.as_job(), Some(&record));
    assert!(store.get(StoreTable::Jobs, "8").is_none());
}

#[test]
fn records_survive_reopen() {
    let dir = tempdir().unwrap();
    {
        let store = LocalStore::open(dir.path(), NOW).unwrap();
        store.put(StoredRecord::Job(job(1, "2024-11-12", "North"))).unwrap();
        store.put(StoredRecord::Policy(policy("2024-12-15"))).unwrap();
        store
            .put(StoredRecord::State(gl_core::AppStateRecord {
                key: gl_core::ACTIVE_DATE_KEY.to_string(),
                value: json!("2024-11-12"),
                updated_at: NOW,
            }))
            .unwrap();
    }

    let store = LocalStore::open(dir.path(), NOW).unwrap();
    assert_eq!(store.count(StoreTable::Jobs), 1);
    assert_eq!(store.policy(gl_core::POLICY_KEY).unwrap().cutoff_date, "2024-12-15");
    assert_eq!(store.state(gl_core::ACTIVE_DATE_KEY).unwrap().value, json!("2024-11-12"));
}

#[test]
fn bulk_upsert_lands_as_one_unit() {
    let dir = tempdir().unwrap();
    {
        let store = LocalStore::open(dir.path(), NOW).unwrap();
        store
            .bulk_upsert(vec![
                StoredRecord::Job(job(1, "2024-11-12", "North")),
                StoredRecord::Job(job(2, "2024-11-13", "South")),
                StoredRecord::Job(job(3, "2024-11-11", "Both Crews")),
            ])
            .unwrap();
    }
    let store = LocalStore::open(dir.path(), NOW).unwrap();
    assert_eq!(store.count(StoreTable::Jobs), 3);
}

#[test]
fn upsert_replaces_by_primary_key() {
    let dir = tempdir().unwrap();
    let store = LocalStore::open(dir.path(), NOW).unwrap();

    store.put(StoredRecord::Job(job(5, "2024-11-12", "North"))).unwrap();
    let mut updated = job(5, "2024-11-20", "South");
    updated.vip = true;
    store.put(StoredRecord::Job(updated.clone())).unwrap();

    assert_eq!(store.count(StoreTable::Jobs), 1);
    assert_eq!(store.get(StoreTable::Jobs, "5").unwrap().as_job(), Some(&updated));
}

#[test]
fn delete_reports_presence() {
    let dir = tempdir().unwrap();
    let store = LocalStore::open(dir.path(), NOW).unwrap();
    store.put(StoredRecord::Job(job(1, "2024-11-12", "North"))).unwrap();

    assert!(store.delete(StoreTable::Jobs, "1").unwrap());
    assert!(!store.delete(StoreTable::Jobs, "1").unwrap());
    assert_eq!(store.count(StoreTable::Jobs), 0);
}

#[test]
fn clear_empties_a_table() {
    let dir = tempdir().unwrap();
    let store = LocalStore::open(dir.path(), NOW).unwrap();
    store
        .bulk_upsert(vec![
            StoredRecord::Job(job(1, "2024-11-12", "North")),
            StoredRecord::Job(job(2, "2024-11-13", "South")),
        ])
        .unwrap();

    store.clear(StoreTable::Jobs).unwrap();
    assert_eq!(store.count(StoreTable::Jobs), 0);
}

#[test]
fn jobs_scan_is_ordered_by_date_then_id() {
    let dir = tempdir().unwrap();
    let store = LocalStore::open(dir.path(), NOW).unwrap();
    store
        .bulk_upsert(vec![
            StoredRecord::Job(job(9, "2024-11-13", "North")),
            StoredRecord::Job(job(2, "2024-11-11", "South")),
            StoredRecord::Job(job(5, "2024-11-13", "Both Crews")),
        ])
        .unwrap();

    let scanned = store.scan_ordered(StoreTable::Jobs, IndexField::Date).unwrap();
    let ids: Vec<i64> = scanned.iter().filter_map(|r| r.as_job()).map(|j| j.id).collect();
    assert_eq!(ids, vec![2, 5, 9]);
}

#[test]
fn pending_scan_is_ordered_by_created_at() {
    let dir = tempdir().unwrap();
    let store = LocalStore::open(dir.path(), NOW).unwrap();
    store
        .bulk_upsert(vec![
            StoredRecord::Pending(pending_job_put(1, 300)),
            StoredRecord::Pending(pending_job_put(2, 100)),
            StoredRecord::Pending(pending_job_put(3, 200)),
        ])
        .unwrap();

    let ops = store.pending_by_created();
    let stamps: Vec<u64> = ops.iter().map(|op| op.created_at).collect();
    assert_eq!(stamps, vec![100, 200, 300]);
}

#[yare::parameterized(
    jobs_by_created  = { StoreTable::Jobs, IndexField::CreatedAt },
    policy_by_date   = { StoreTable::Policy, IndexField::Date },
    pending_by_date  = { StoreTable::PendingOps, IndexField::Date },
)]
fn unindexed_scan_is_an_error(table: StoreTable, index: IndexField) {
    let dir = tempdir().unwrap();
    let store = LocalStore::open(dir.path(), NOW).unwrap();
    assert!(matches!(
        store.scan_ordered(table, index),
        Err(StoreError::InvalidIndex { .. })
    ));
}

#[test]
fn update_pending_rewrites_bookkeeping() {
    let dir = tempdir().unwrap();
    let store = LocalStore::open(dir.path(), NOW).unwrap();
    let op = pending_job_put(1, 100);
    let id = op.id.clone();
    store.put(StoredRecord::Pending(op)).unwrap();

    let found = store
        .update_pending(&id, |op| {
            op.attempt += 1;
            op.next_at = 9_999;
        })
        .unwrap();
    assert!(found);

    let loaded = store.get(StoreTable::PendingOps, id.as_str()).unwrap();
    let loaded = loaded.as_pending().unwrap();
    assert_eq!(loaded.attempt, 1);
    assert_eq!(loaded.next_at, 9_999);

    let missing = store.update_pending(&gl_core::OpId::from_string("op-gone"), |_| {}).unwrap();
    assert!(!missing);
}

#[test]
fn corrupt_snapshot_is_rotated_to_bak() {
    let dir = tempdir().unwrap();
    {
        let store = LocalStore::open(dir.path(), NOW).unwrap();
        store.put(StoredRecord::Job(job(1, "2024-11-12", "North"))).unwrap();
    }
    std::fs::write(dir.path().join("store.json"), b"not-valid-json").unwrap();

    let store = LocalStore::open(dir.path(), NOW).unwrap();
    assert_eq!(store.count(StoreTable::Jobs), 0);
    assert!(dir.path().join("store.bak").exists());
}

#[test]
fn repeated_corruption_rotates_backups() {
    let dir = tempdir().unwrap();
    for round in 1..=4u8 {
        std::fs::write(dir.path().join("store.json"), [round; 8]).unwrap();
        let store = LocalStore::open(dir.path(), NOW).unwrap();
        assert_eq!(store.count(StoreTable::Jobs), 0);
    }

    // Most recent corruption first; the first round was evicted
    assert_eq!(std::fs::read(dir.path().join("store.bak")).unwrap(), vec![4u8; 8]);
    assert_eq!(std::fs::read(dir.path().join("store.bak.2")).unwrap(), vec![3u8; 8]);
    assert_eq!(std::fs::read(dir.path().join("store.bak.3")).unwrap(), vec![2u8; 8]);
    assert!(!dir.path().join("store.bak.4").exists());
}

fn write_v1_store(dir: &std::path::Path) {
    let doc = json!({
        "v": 1,
        "tables": {
            "jobs": {},
            "pendingOps": {
                "q-1": {
                    "queueId": "q-1",
                    "kind": "job.update",
                    "table": "jobs",
                    "key": "12",
                    "payload": {"id": 12, "crew": "North"},
                    "ts": 1_600_000_000_000_u64
                }
            }
        }
    });
    std::fs::write(dir.join("store.json"), serde_json::to_vec(&doc).unwrap()).unwrap();
}

#[test]
fn open_migrates_v1_snapshot() {
    let dir = tempdir().unwrap();
    write_v1_store(dir.path());

    let store = LocalStore::open(dir.path(), NOW).unwrap();
    let ops = store.pending_by_created();
    assert_eq!(ops.len(), 1);
    let op = &ops[0];
    assert_eq!(op.id.as_str(), "q-1");
    assert_eq!(op.queue_id.as_deref(), Some("q-1"));
    assert_eq!(op.op_type, gl_core::OpType::JobUpdate);
    assert_eq!(op.attempt, 0);
    assert!(op.next_at > 0 && op.created_at > 0 && op.updated_at > 0);
    // Archive of the pre-migration snapshot is kept
    assert!(dir.path().join("store.v1.json.zst").exists());
}

#[test]
fn reopening_a_migrated_store_is_stable() {
    let dir = tempdir().unwrap();
    write_v1_store(dir.path());

    let first = {
        let store = LocalStore::open(dir.path(), NOW).unwrap();
        store.pending_by_created()
    };
    let second = {
        let store = LocalStore::open(dir.path(), NOW + 60_000).unwrap();
        store.pending_by_created()
    };
    assert_eq!(first, second);
}

#[test]
fn newer_snapshot_version_is_a_migration_error() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("store.json"),
        serde_json::to_vec(&json!({"v": 99, "tables": {}})).unwrap(),
    )
    .unwrap();

    let err = LocalStore::open(dir.path(), NOW).unwrap_err();
    assert!(matches!(err, StoreError::Migration(MigrationError::TooNew(99, 2))));
}
