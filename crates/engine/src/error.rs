// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error taxonomy.
//!
//! Remote-write failures never appear here: the outbox absorbs them into
//! retry scheduling and reports them through [`crate::ProcessReport`].

use gl_core::ValidationError;
use gl_storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A mutation outside the supported type/shape set; rejected
    /// synchronously, nothing was queued.
    #[error("validation rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
