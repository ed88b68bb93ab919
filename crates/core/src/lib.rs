// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! gl-core: Pure types for the Garland offline-first sync engine.
//!
//! Everything in this crate is I/O-free: record shapes shared between the
//! local store and the outbox, the loose payload tree the sanitizer
//! operates on, mutation validation, clock and ID abstractions, and
//! engine configuration.

pub mod clock;
pub mod config;
pub mod id;
pub mod mutation;
pub mod records;
pub mod sanitize;
pub mod value;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, SyncConfig};
pub use id::OpId;
pub use mutation::{SyncMutation, ValidationError};
pub use records::{
    AppDataSnapshot, AppStateRecord, JobRecord, OpType, PendingOp, PolicyRecord, StoreTable,
    StoredRecord, User, ACTIVE_DATE_KEY, BOTH_CREWS, CURRENT_USER_KEY, POLICY_KEY,
};
pub use sanitize::{safe_serialize, strip_undefined, SanitizationReport, SanitizeOptions};
pub use value::PayloadValue;
