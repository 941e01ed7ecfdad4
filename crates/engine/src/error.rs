// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error taxonomy.
//!
//! Every user-visible failure maps onto one of these kinds; the daemon
//! translates them to wire error kinds and the CLI to exit codes. Retries
//! happen only at I/O boundaries (see [`retry`]), never in higher layers.

use ens_core::{QueueError, SessionError};
use ens_provider::ProviderError;
use ens_storage::StoreError;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or unauthorized input.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The operation conflicts with current state (lock held, already
    /// exists, wrong status).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A queue, pool, or session cap was hit.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// Write admission failed because git sync reached `error`.
    #[error("git sync error: {0}")]
    GitSync(String),

    /// I/O failure worth retrying at the boundary.
    #[error("transient error: {0}")]
    Transient(String),

    /// Invariant violation detected during apply. The operation is aborted
    /// without mutating state.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl EngineError {
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Transient(_))
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Closed => EngineError::Fatal("store is closed".to_string()),
            StoreError::Io(e) => EngineError::Transient(format!("store io: {e}")),
            StoreError::Serde(e) => EngineError::Fatal(format!("store serialization: {e}")),
        }
    }
}

impl From<ProviderError> for EngineError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::NotFound(id) => EngineError::NotFound(format!("sandbox {id}")),
            ProviderError::SnapshotNotFound(id) => EngineError::NotFound(format!("snapshot {id}")),
            ProviderError::NotRunning(id) => EngineError::Conflict(format!("sandbox {id} is not running")),
            ProviderError::Timeout => EngineError::Timeout("provider operation".to_string()),
            ProviderError::Spawn(m) => EngineError::Transient(format!("spawn: {m}")),
            ProviderError::Io(e) => EngineError::Transient(format!("provider io: {e}")),
            ProviderError::Unavailable(m) => EngineError::Transient(m),
        }
    }
}

impl From<QueueError> for EngineError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::Full => EngineError::ResourceExhausted("prompt queue is full".to_string()),
            QueueError::NotFound(id) => EngineError::NotFound(format!("prompt {id}")),
            QueueError::NotAuthorized(id) => {
                EngineError::Validation(format!("prompt {id} belongs to another user"))
            }
            QueueError::NotQueued(id) => {
                EngineError::Conflict(format!("prompt {id} is executing"))
            }
            QueueError::ReorderDisabled => {
                EngineError::Validation("reordering is disabled".to_string())
            }
        }
    }
}

impl From<SessionError> for EngineError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Full => EngineError::ResourceExhausted("session is full".to_string()),
            SessionError::UnknownUser(id) => EngineError::NotFound(format!("user {id}")),
            SessionError::LockHeld(id) => EngineError::Conflict(format!("edit lock held by {id}")),
        }
    }
}

/// Default attempt bound for [`retry`].
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

const INITIAL_BACKOFF: Duration = Duration::from_millis(50);

/// Retry a transient-failing async operation with exponential backoff.
///
/// Only [`EngineError::Transient`] is retried; every other kind returns
/// immediately. Used at provider/store boundaries only.
pub async fn retry<T, F, Fut>(op: &str, attempts: u32, mut f: F) -> Result<T, EngineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 1;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < attempts => {
                tracing::warn!(op, attempt, error = %e, "transient failure, retrying");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
