// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ens-storage: persistence for the session aggregate.
//!
//! One abstraction: a mapping `SessionId → Session` with atomic whole-
//! aggregate replace. Concurrency safety is the per-session actor's job;
//! the store only guarantees that each operation reads or writes a
//! consistent snapshot of one aggregate, nested collections included.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use ens_core::{Session, SessionId};
use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store has been closed; the handle is no longer usable.
    #[error("store is closed")]
    Closed,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Persistence for the session aggregate.
///
/// Writes replace the whole aggregate atomically. `set` normalizes nested
/// collections (users by join time, clients by connect time, prompts by
/// priority rank then age) so `set` then `get` round-trips to an equal value.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read one session, or `None` when absent.
    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;

    /// Atomically replace (or insert) one session.
    async fn set(&self, session: Session) -> Result<(), StoreError>;

    /// Remove a session. Returns true iff it existed.
    async fn delete(&self, id: &SessionId) -> Result<bool, StoreError>;

    async fn has(&self, id: &SessionId) -> Result<bool, StoreError>;

    /// All sessions; iteration order is unspecified.
    async fn all(&self) -> Result<Vec<Session>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    /// Remove everything. Used by tests.
    async fn clear(&self) -> Result<(), StoreError>;

    /// Release backend handles. Every later operation fails with
    /// [`StoreError::Closed`].
    async fn close(&self) -> Result<(), StoreError>;
}
