// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote backend seam.
//!
//! The backend is a document store reachable through put/merge by
//! collection and document id. Failures are opaque to the engine beyond
//! success/failure and retryability; the outbox turns them into backoff
//! scheduling.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    /// A timed-out call is a plain failure, not a special case.
    #[error("remote call timed out")]
    Timeout,
}

impl RemoteError {
    pub fn retryable(&self) -> bool {
        match self {
            RemoteError::Transport(_) | RemoteError::Timeout => true,
            // Anonymous credentials are reacquired on the next drain.
            RemoteError::Auth(_) => true,
        }
    }
}

/// Document-store-like remote backend.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Acquire session credentials. Called once per engine lifetime
    /// before the first write.
    async fn ensure_session(&self) -> Result<(), RemoteError>;

    /// Create or merge a document.
    async fn put(&self, collection: &str, doc_id: &str, payload: &Value) -> Result<(), RemoteError>;
}

#[cfg(any(test, feature = "test-support"))]
pub use recording::{RecordedWrite, RecordingRemote};

#[cfg(any(test, feature = "test-support"))]
mod recording {
    use super::{RemoteError, RemoteStore};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedWrite {
        pub collection: String,
        pub doc_id: String,
        pub payload: Value,
    }

    /// In-memory backend for tests: records writes, scripts failures,
    /// and can slow each put to widen concurrency windows.
    #[derive(Default)]
    pub struct RecordingRemote {
        writes: Mutex<Vec<RecordedWrite>>,
        failures: Mutex<VecDeque<RemoteError>>,
        sessions: AtomicU32,
        session_failures: AtomicU32,
        put_delay_ms: AtomicU64,
    }

    impl RecordingRemote {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue an error for the next put call(s), first in first out.
        pub fn push_failure(&self, error: RemoteError) {
            self.failures.lock().push_back(error);
        }

        /// Fail the next `n` session acquisitions.
        pub fn fail_sessions(&self, n: u32) {
            self.session_failures.store(n, Ordering::SeqCst);
        }

        pub fn set_put_delay_ms(&self, ms: u64) {
            self.put_delay_ms.store(ms, Ordering::SeqCst);
        }

        pub fn writes(&self) -> Vec<RecordedWrite> {
            self.writes.lock().clone()
        }

        pub fn session_count(&self) -> u32 {
            self.sessions.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemoteStore for RecordingRemote {
        async fn ensure_session(&self) -> Result<(), RemoteError> {
            let remaining = self.session_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.session_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(RemoteError::Auth("scripted session failure".into()));
            }
            self.sessions.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn put(
            &self,
            collection: &str,
            doc_id: &str,
            payload: &Value,
        ) -> Result<(), RemoteError> {
            let delay = self.put_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }
            if let Some(error) = self.failures.lock().pop_front() {
                return Err(error);
            }
            self.writes.lock().push(RecordedWrite {
                collection: collection.to_string(),
                doc_id: doc_id.to_string(),
                payload: payload.clone(),
            });
            Ok(())
        }
    }
}
