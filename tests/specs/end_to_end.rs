// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Full offline-first flow: legacy import, local persistence, outbox
//! drain, restart.

use gl_core::test_support::{fallback_snapshot, job};
use gl_core::{FakeClock, PayloadValue, SyncConfig, SyncMutation};
use gl_engine::{RecordingRemote, SnapshotSource, SyncEngine};
use serde_json::json;
use similar_asserts::assert_eq;
use std::path::Path;
use std::sync::Arc;

fn config_at(dir: &Path) -> SyncConfig {
    SyncConfig {
        data_dir: dir.join("store"),
        legacy_dir: Some(dir.join("legacy")),
        remote_root: "garland".to_string(),
        backoff_base_ms: 2_000,
        backoff_cap_ms: 300_000,
    }
}

fn seed_legacy(dir: &Path) {
    let legacy = dir.join("legacy");
    std::fs::create_dir_all(&legacy).unwrap();
    std::fs::write(
        legacy.join("jobs.json"),
        serde_json::to_vec(&json!([
            {"id": 1, "date": "2024-11-12", "crew": "Both Crews", "client": "The Hendersons", "scope": "roofline"},
            {"id": 2, "date": "2024-11-10", "crew": "North", "client": "Oakwood HOA", "scope": "trees"}
        ]))
        .unwrap(),
    )
    .unwrap();
    std::fs::write(
        legacy.join("policy.json"),
        serde_json::to_vec(&json!({"cutoffDate": "2024-12-15"})).unwrap(),
    )
    .unwrap();
}

#[tokio::test]
async fn offline_first_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    seed_legacy(dir.path());
    let remote = Arc::new(RecordingRemote::new());
    let clock = FakeClock::new();
    let engine = SyncEngine::with_clock(config_at(dir.path()), remote.clone(), clock.clone());

    // First launch imports the legacy flat format, ordered by date
    let boot = engine.bootstrap_app_data(fallback_snapshot());
    assert_eq!(boot.source, SnapshotSource::LegacyFlat);
    let ids: Vec<i64> = boot.snapshot.jobs.iter().map(|j| j.id).collect();
    assert_eq!(ids, vec![2, 1]);

    // A local edit persists and queues a sync op, all offline
    let mut edited = boot.snapshot.jobs.clone();
    edited[1].crew = "North".to_string();
    engine.persist_jobs(&edited).unwrap();
    engine
        .enqueue_sync_op(SyncMutation::job_update(
            1,
            PayloadValue::object([
                ("id", PayloadValue::from(1_i64)),
                ("crew", PayloadValue::from("North")),
                ("houseTier", PayloadValue::from("7")),
            ]),
        ))
        .unwrap();
    assert!(remote.writes().is_empty());

    // The drain delivers the sanitized payload
    let report = engine.process_pending_queue(false).await.unwrap();
    assert_eq!(report.dispatched, 1);
    let writes = remote.writes();
    assert_eq!(writes[0].collection, "garland/jobs");
    assert_eq!(writes[0].payload["houseTier"], json!(5));
    assert_eq!(engine.pending_count(), 0);

    // Restart: the store, not legacy data, is the source of truth
    drop(engine);
    let engine = SyncEngine::with_clock(config_at(dir.path()), remote, clock);
    let boot = engine.bootstrap_app_data(fallback_snapshot());
    assert_eq!(boot.source, SnapshotSource::Store);
    assert_eq!(boot.snapshot.jobs[1].crew, "North");
    assert_eq!(boot.snapshot.policy.cutoff_date, "2024-12-15");
}

#[tokio::test]
async fn snapshot_round_trip_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let remote = Arc::new(RecordingRemote::new());
    let engine =
        SyncEngine::with_clock(config_at(dir.path()), remote, FakeClock::new());
    engine.bootstrap_app_data(fallback_snapshot());

    let mut record = job(99, "2024-11-12", "North");
    record.materials = Some(json!({"bulbs": {"c9": 120}, "clips": ["shingle", "gutter"]}));
    engine.persist_jobs(std::slice::from_ref(&record)).unwrap();

    let boot = engine.bootstrap_app_data(fallback_snapshot());
    assert_eq!(boot.snapshot.jobs[0].id, 99);
    assert_eq!(boot.snapshot.jobs[0].materials, record.materials);
}
