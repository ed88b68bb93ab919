// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gl-engine: the offline-first synchronization engine.
//!
//! [`SyncEngine`] owns the durable store handle, the remote backend, and
//! the outbox queue. Local writes are the source of truth and never wait
//! on the network; queued mutations drain to the remote backend with
//! bounded exponential backoff.

pub mod backoff;
pub mod bootstrap;
pub mod engine;
pub mod error;
pub mod outbox;
pub mod remote;

pub use bootstrap::{BootstrapResult, SnapshotSource};
pub use engine::{CleanupReport, SyncEngine};
pub use error::EngineError;
pub use outbox::{
    EnqueueReceipt, ProcessReport, HOUSE_TIER_FALLBACK, HOUSE_TIER_MAX, HOUSE_TIER_MIN,
};
pub use remote::{RemoteError, RemoteStore};

#[cfg(any(test, feature = "test-support"))]
pub use remote::{RecordedWrite, RecordingRemote};
