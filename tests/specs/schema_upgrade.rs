// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opening a v1 store through the engine upgrades it and replays the
//! carried-over pending op.

use gl_core::test_support::fallback_snapshot;
use gl_core::{FakeClock, SyncConfig};
use gl_engine::{RecordingRemote, SyncEngine};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

fn seed_v1_store(dir: &Path) {
    let store_dir = dir.join("store");
    std::fs::create_dir_all(&store_dir).unwrap();
    let doc = json!({
        "v": 1,
        "tables": {
            "jobs": {
                "12": {
                    "id": 12, "date": "2024-11-12", "crew": "North",
                    "client": "The Hendersons", "scope": "roofline", "updatedAt": 1
                }
            },
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
    std::fs::write(store_dir.join("store.json"), serde_json::to_vec(&doc).unwrap()).unwrap();
}

#[tokio::test]
async fn v1_store_upgrades_and_replays() {
    let dir = tempfile::tempdir().unwrap();
    seed_v1_store(dir.path());
    let remote = Arc::new(RecordingRemote::new());
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_700_000_000_000);
    let config = SyncConfig {
        data_dir: dir.path().join("store"),
        legacy_dir: None,
        remote_root: "garland".to_string(),
        backoff_base_ms: 2_000,
        backoff_cap_ms: 300_000,
    };
    let engine = SyncEngine::with_clock(config, remote.clone(), clock);

    let boot = engine.bootstrap_app_data(fallback_snapshot());
    assert!(boot.store_available);
    assert_eq!(boot.snapshot.jobs.len(), 1);
    assert_eq!(engine.pending_count(), 1);

    // The migrated op is immediately eligible and drains cleanly
    let report = engine.process_pending_queue(false).await.unwrap();
    assert_eq!(report.dispatched, 1);
    let writes = remote.writes();
    assert_eq!(writes[0].doc_id, "12");
    assert_eq!(writes[0].payload["crew"], json!("North"));
    assert_eq!(engine.pending_count(), 0);
}
