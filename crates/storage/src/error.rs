// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the local store.

use crate::migration::MigrationError;
use crate::store::IndexField;
use gl_core::StoreTable;
use thiserror::Error;

/// Failures raised by [`crate::store::LocalStore`].
///
/// `Unavailable` means the durable medium could not be acquired at all;
/// callers degrade to in-memory operation. `Migration` means the store
/// opened but the upgrade transform errored — the same degradation, but
/// logged as a harder failure since data may be stuck at an old version.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("local store unavailable: {0}")]
    Unavailable(String),

    #[error("schema migration failed: {0}")]
    Migration(#[from] MigrationError),

    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("table '{table}' has no ordered index on {index:?}")]
    InvalidIndex { table: StoreTable, index: IndexField },
}

impl StoreError {
    /// True when the store never became usable (vs a failed single write).
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}
