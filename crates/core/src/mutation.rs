// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mutation envelope accepted by the outbox.
//!
//! Validation is synchronous and happens before anything is queued: a
//! mutation outside the supported type/shape set is rejected and never
//! becomes a pending op.

use crate::records::{OpType, StoreTable};
use crate::value::PayloadValue;
use thiserror::Error;

/// A local mutation to be made durable and replayed remotely.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncMutation {
    pub op_type: OpType,
    pub table: StoreTable,
    /// Target record key; optional for creates that carry an `id` in the
    /// payload.
    pub key: Option<String>,
    pub payload: PayloadValue,
}

/// Rejection reasons for [`SyncMutation::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("mutation '{op}' cannot target table '{table}'")]
    TableMismatch { op: OpType, table: StoreTable },

    #[error("mutation '{op}' requires a target key")]
    MissingKey { op: OpType },

    #[error("mutation '{op}' requires an object payload")]
    PayloadNotObject { op: OpType },

    #[error("job payload is missing a numeric 'id'")]
    MissingJobId,

    #[error("the pending-ops table is not a valid mutation target")]
    ReservedTable,
}

impl SyncMutation {
    pub fn job_add(payload: PayloadValue) -> Self {
        Self { op_type: OpType::JobAdd, table: StoreTable::Jobs, key: None, payload }
    }

    pub fn job_update(id: i64, payload: PayloadValue) -> Self {
        Self {
            op_type: OpType::JobUpdate,
            table: StoreTable::Jobs,
            key: Some(id.to_string()),
            payload,
        }
    }

    pub fn job_delete(id: i64) -> Self {
        Self {
            op_type: OpType::JobDelete,
            table: StoreTable::Jobs,
            key: Some(id.to_string()),
            payload: PayloadValue::Null,
        }
    }

    pub fn put(table: StoreTable, key: impl Into<String>, payload: PayloadValue) -> Self {
        Self { op_type: OpType::Put, table, key: Some(key.into()), payload }
    }

    pub fn delete(table: StoreTable, key: impl Into<String>) -> Self {
        Self { op_type: OpType::Delete, table, key: Some(key.into()), payload: PayloadValue::Null }
    }

    /// Check this mutation against the closed supported set.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.table == StoreTable::PendingOps {
            return Err(ValidationError::ReservedTable);
        }

        match self.op_type {
            OpType::JobAdd | OpType::JobUpdate | OpType::JobDelete
                if self.table != StoreTable::Jobs =>
            {
                return Err(ValidationError::TableMismatch { op: self.op_type, table: self.table });
            }
            _ => {}
        }

        match self.op_type {
            OpType::JobAdd => {
                let body = self
                    .payload
                    .as_object()
                    .ok_or(ValidationError::PayloadNotObject { op: self.op_type })?;
                // Creates carry their key in the payload.
                if self.key.is_none() && !matches!(body.get("id"), Some(PayloadValue::Number(_))) {
                    return Err(ValidationError::MissingJobId);
                }
            }
            OpType::JobUpdate | OpType::Put => {
                if self.payload.as_object().is_none() {
                    return Err(ValidationError::PayloadNotObject { op: self.op_type });
                }
                if self.key.is_none() {
                    return Err(ValidationError::MissingKey { op: self.op_type });
                }
            }
            OpType::JobDelete | OpType::Delete => {
                if self.key.is_none() {
                    return Err(ValidationError::MissingKey { op: self.op_type });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "mutation_tests.rs"]
mod tests;
