// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory session store.

use crate::{SessionStore, StoreError};
use async_trait::async_trait;
use ens_core::{Session, SessionId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// HashMap-backed store. The default for tests and single-node dev runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<HashMap<SessionId, Session>>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        self.guard()?;
        Ok(self.inner.read().get(id).cloned())
    }

    async fn set(&self, mut session: Session) -> Result<(), StoreError> {
        self.guard()?;
        session.normalize();
        self.inner.write().insert(session.id.clone(), session);
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<bool, StoreError> {
        self.guard()?;
        Ok(self.inner.write().remove(id).is_some())
    }

    async fn has(&self, id: &SessionId) -> Result<bool, StoreError> {
        self.guard()?;
        Ok(self.inner.read().contains_key(id))
    }

    async fn all(&self) -> Result<Vec<Session>, StoreError> {
        self.guard()?;
        Ok(self.inner.read().values().cloned().collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        self.guard()?;
        Ok(self.inner.read().len())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.guard()?;
        self.inner.write().clear();
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
