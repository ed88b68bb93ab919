// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::engine::SyncEngine;
use crate::remote::RecordingRemote;
use gl_core::test_support::fallback_snapshot;
use gl_core::{FakeClock, SyncConfig};
use serde_json::json;
use std::path::Path;
use tempfile::tempdir;

fn engine_at(dir: &Path) -> SyncEngine<FakeClock> {
    let config = SyncConfig {
        data_dir: dir.join("store"),
        legacy_dir: Some(dir.join("legacy")),
        remote_root: "garland".to_string(),
        backoff_base_ms: 2_000,
        backoff_cap_ms: 300_000,
    };
    SyncEngine::with_clock(config, Arc::new(RecordingRemote::new()), FakeClock::new())
}

fn write_legacy_slots(dir: &Path) {
    let legacy = dir.join("legacy");
    std::fs::create_dir_all(&legacy).unwrap();
    std::fs::write(
        legacy.join("jobs.json"),
        serde_json::to_vec(&json!([
            {
                "id": 99,
                "date": "2024-11-12",
                "crew": "Both Crews",
                "client": "The Hendersons",
                "scope": "roofline",
                "houseTier": "3",
                "zip": "75201"
            },
            {
                "id": 100,
                "date": "2024-11-14",
                "crew": "North",
                "client": "Oakwood HOA",
                "scope": "trees",
                "rehangPrice": 750
            }
        ]))
        .unwrap(),
    )
    .unwrap();
    std::fs::write(
        legacy.join("policy.json"),
        serde_json::to_vec(&json!({"cutoffDate": "2024-12-15", "maxJobsPerDay": 4})).unwrap(),
    )
    .unwrap();
    std::fs::write(legacy.join("activeDate.json"), b"\"2024-11-12\"").unwrap();
    std::fs::write(
        legacy.join("user.json"),
        serde_json::to_vec(&json!({"name": "Dana", "role": "scheduler"})).unwrap(),
    )
    .unwrap();
}

#[test]
fn unusable_store_serves_fallback_and_skips_legacy() {
    let dir = tempdir().unwrap();
    // A plain file where the store directory should be
    std::fs::write(dir.path().join("store"), b"in the way").unwrap();
    write_legacy_slots(dir.path());

    let engine = engine_at(dir.path());
    let result = engine.bootstrap_app_data(fallback_snapshot());

    assert_eq!(result.source, SnapshotSource::Fallback);
    assert!(!result.store_available);
    assert_eq!(result.snapshot, fallback_snapshot());
}

#[test]
fn migration_failure_serves_fallback() {
    let dir = tempdir().unwrap();
    let store_dir = dir.path().join("store");
    std::fs::create_dir_all(&store_dir).unwrap();
    std::fs::write(
        store_dir.join("store.json"),
        serde_json::to_vec(&json!({"v": 99, "tables": {}})).unwrap(),
    )
    .unwrap();

    let engine = engine_at(dir.path());
    let result = engine.bootstrap_app_data(fallback_snapshot());

    assert_eq!(result.source, SnapshotSource::Fallback);
    assert!(!result.store_available);
}

#[test]
fn empty_store_imports_legacy_slots() {
    let dir = tempdir().unwrap();
    write_legacy_slots(dir.path());

    let engine = engine_at(dir.path());
    let result = engine.bootstrap_app_data(fallback_snapshot());

    assert_eq!(result.source, SnapshotSource::LegacyFlat);
    assert!(result.store_available);
    assert_eq!(result.snapshot.jobs.len(), 2);

    let first = &result.snapshot.jobs[0];
    assert_eq!(first.id, 99);
    assert!(first.both_crews);
    // Loose legacy typing is tolerated
    assert_eq!(first.house_tier, Some(3));
    assert_eq!(result.snapshot.policy.cutoff_date, "2024-12-15");
    assert_eq!(result.snapshot.policy.max_jobs_per_day, 4);
    assert_eq!(result.snapshot.active_date, "2024-11-12");
    assert_eq!(result.snapshot.user.as_ref().map(|u| u.name.as_str()), Some("Dana"));

    // The import landed in the store
    let store = engine.store_handle().unwrap();
    assert_eq!(store.count(gl_core::StoreTable::Jobs), 2);
}

#[test]
fn second_bootstrap_reads_the_store_even_with_legacy_present() {
    let dir = tempdir().unwrap();
    write_legacy_slots(dir.path());

    let engine = engine_at(dir.path());
    let first = engine.bootstrap_app_data(fallback_snapshot());
    assert_eq!(first.source, SnapshotSource::LegacyFlat);

    let second = engine.bootstrap_app_data(fallback_snapshot());
    assert_eq!(second.source, SnapshotSource::Store);
    assert_eq!(second.snapshot.jobs, first.snapshot.jobs);
    assert_eq!(second.snapshot.policy.cutoff_date, "2024-12-15");

    // Legacy slots are never deleted by the import
    assert!(dir.path().join("legacy").join("jobs.json").exists());
}

#[test]
fn legacy_import_runs_at_most_once_per_store() {
    let dir = tempdir().unwrap();
    write_legacy_slots(dir.path());

    let engine = engine_at(dir.path());
    engine.bootstrap_app_data(fallback_snapshot());
    engine.persist_jobs(&[gl_core::test_support::job(7, "2024-11-20", "South")]).unwrap();

    // Jobs table is non-empty, so legacy data (still present) is ignored
    let result = engine.bootstrap_app_data(fallback_snapshot());
    assert_eq!(result.source, SnapshotSource::Store);
    assert_eq!(result.snapshot.jobs.len(), 1);
    assert_eq!(result.snapshot.jobs[0].id, 7);
}

#[test]
fn each_slot_falls_back_independently() {
    let dir = tempdir().unwrap();
    let legacy = dir.path().join("legacy");
    std::fs::create_dir_all(&legacy).unwrap();
    // Only jobs present, and the policy slot is garbage
    std::fs::write(
        legacy.join("jobs.json"),
        serde_json::to_vec(&json!([{"id": 1, "date": "2024-11-12", "crew": "North"}])).unwrap(),
    )
    .unwrap();
    std::fs::write(legacy.join("policy.json"), b"{truncated").unwrap();

    let engine = engine_at(dir.path());
    let fallback = fallback_snapshot();
    let result = engine.bootstrap_app_data(fallback.clone());

    assert_eq!(result.source, SnapshotSource::LegacyFlat);
    assert_eq!(result.snapshot.jobs.len(), 1);
    assert_eq!(result.snapshot.policy, fallback.policy);
    assert_eq!(result.snapshot.active_date, fallback.active_date);
}

#[test]
fn null_legacy_user_means_unset() {
    let dir = tempdir().unwrap();
    let legacy = dir.path().join("legacy");
    std::fs::create_dir_all(&legacy).unwrap();
    std::fs::write(legacy.join("user.json"), b"null").unwrap();

    let engine = engine_at(dir.path());
    let result = engine.bootstrap_app_data(fallback_snapshot());
    assert_eq!(result.snapshot.user, None);
}

#[test]
fn missing_legacy_dir_imports_the_fallback() {
    let dir = tempdir().unwrap();
    let engine = engine_at(dir.path());
    let fallback = fallback_snapshot();

    let result = engine.bootstrap_app_data(fallback.clone());
    assert_eq!(result.source, SnapshotSource::LegacyFlat);
    assert_eq!(result.snapshot.policy, fallback.policy);

    // The fallback policy is now durable
    let store = engine.store_handle().unwrap();
    assert_eq!(store.policy(gl_core::POLICY_KEY).unwrap().cutoff_date, fallback.policy.cutoff_date);
}

#[test]
fn undecodable_legacy_job_entries_are_skipped() {
    let dir = tempdir().unwrap();
    let legacy = dir.path().join("legacy");
    std::fs::create_dir_all(&legacy).unwrap();
    std::fs::write(
        legacy.join("jobs.json"),
        serde_json::to_vec(&json!([
            {"id": 1, "date": "2024-11-12", "crew": "North"},
            {"date": "2024-11-13", "crew": "South"},
            {"id": 3, "crew": "South"}
        ]))
        .unwrap(),
    )
    .unwrap();

    let engine = engine_at(dir.path());
    let result = engine.bootstrap_app_data(fallback_snapshot());
    // Entries without an id or date are dropped
    assert_eq!(result.snapshot.jobs.len(), 1);
    assert_eq!(result.snapshot.jobs[0].id, 1);
}

#[test]
fn snapshot_source_labels() {
    assert_eq!(SnapshotSource::Store.to_string(), "store");
    assert_eq!(SnapshotSource::LegacyFlat.to_string(), "legacy-flat");
    assert_eq!(SnapshotSource::Fallback.to_string(), "fallback");
}
