// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot manager: a TTL-indexed catalog over provider snapshots.
//!
//! Indices: by id, current-by-session, and a time-ordered expiry index for
//! the sweep. At most one snapshot per session is current; creating a new
//! one supersedes the prior, which is deleted immediately (nothing reads a
//! superseded snapshot, and I8 only requires deletion by its expiry).

use crate::bus::EventBus;
use crate::error::{retry, EngineError, DEFAULT_RETRY_ATTEMPTS};
use ens_core::{Clock, Event, Sandbox, SandboxId, SessionId, Snapshot, SnapshotId};
use ens_provider::SandboxProvider;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Snapshot catalog tunables.
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    pub default_ttl: Duration,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self { default_ttl: Duration::from_secs(24 * 60 * 60) }
    }
}

#[derive(Default)]
struct Catalog {
    by_id: HashMap<SnapshotId, Snapshot>,
    current_by_session: HashMap<SessionId, SnapshotId>,
    by_expiry: BTreeMap<(u64, SnapshotId), SessionId>,
}

impl Catalog {
    fn insert(&mut self, snapshot: Snapshot) {
        self.by_expiry
            .insert((snapshot.expires_at_ms, snapshot.id.clone()), snapshot.session_id.clone());
        self.current_by_session.insert(snapshot.session_id.clone(), snapshot.id.clone());
        self.by_id.insert(snapshot.id.clone(), snapshot);
    }

    fn remove(&mut self, id: &SnapshotId) -> Option<Snapshot> {
        let snapshot = self.by_id.remove(id)?;
        self.by_expiry.remove(&(snapshot.expires_at_ms, snapshot.id.clone()));
        if self.current_by_session.get(&snapshot.session_id) == Some(&snapshot.id) {
            self.current_by_session.remove(&snapshot.session_id);
        }
        Some(snapshot)
    }
}

/// Catalog of session snapshots.
pub struct SnapshotManager<C: Clock> {
    provider: Arc<dyn SandboxProvider>,
    bus: EventBus<C>,
    clock: C,
    config: SnapshotConfig,
    catalog: Mutex<Catalog>,
}

impl<C: Clock> SnapshotManager<C> {
    pub fn new(
        provider: Arc<dyn SandboxProvider>,
        bus: EventBus<C>,
        clock: C,
        config: SnapshotConfig,
    ) -> Arc<Self> {
        Arc::new(Self { provider, bus, clock, config, catalog: Mutex::new(Catalog::default()) })
    }

    /// Capture a sandbox image and make it the session's current snapshot.
    /// Any prior current snapshot is superseded and deleted.
    pub async fn create(
        &self,
        sandbox_id: &SandboxId,
        session_id: &SessionId,
        git_commit: impl Into<String>,
        has_uncommitted_changes: bool,
        ttl: Option<Duration>,
    ) -> Result<Snapshot, EngineError> {
        let now_ms = self.clock.epoch_ms();
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let snapshot = Snapshot {
            id: SnapshotId::generate(),
            sandbox_id: sandbox_id.clone(),
            session_id: session_id.clone(),
            git_commit: git_commit.into(),
            has_uncommitted_changes,
            created_at_ms: now_ms,
            expires_at_ms: now_ms + ttl.as_millis() as u64,
        };

        let provider = &self.provider;
        let snapshot_id = &snapshot.id;
        retry("provider.snapshot", DEFAULT_RETRY_ATTEMPTS, || async move {
            provider.snapshot(sandbox_id, snapshot_id).await.map_err(EngineError::from)
        })
        .await?;

        let superseded = {
            let mut catalog = self.catalog.lock();
            let prior = catalog
                .current_by_session
                .get(session_id)
                .cloned()
                .and_then(|id| catalog.remove(&id));
            catalog.insert(snapshot.clone());
            prior
        };

        info!(snapshot = %snapshot.id, session = %session_id, "snapshot created");
        self.bus.publish(Event::SnapshotCreated {
            snapshot_id: snapshot.id.clone(),
            session_id: session_id.clone(),
            superseded: superseded.as_ref().map(|s| s.id.clone()),
        });
        if let Some(prior) = superseded {
            self.drop_image(prior).await;
        }
        Ok(snapshot)
    }

    /// Restore the session's current snapshot into a fresh sandbox.
    ///
    /// Returns `None` when the session has no valid snapshot. A restored
    /// snapshot leaves the catalog: the session is live again.
    pub async fn restore(&self, session_id: &SessionId) -> Result<Option<Sandbox>, EngineError> {
        let snapshot = {
            let catalog = self.catalog.lock();
            catalog
                .current_by_session
                .get(session_id)
                .and_then(|id| catalog.by_id.get(id))
                .cloned()
        };
        let Some(snapshot) = snapshot else {
            return Ok(None);
        };
        if snapshot.is_expired(self.clock.epoch_ms()) {
            return Ok(None);
        }

        let provider = &self.provider;
        let snapshot_id = &snapshot.id;
        let sandbox = retry("provider.restore", DEFAULT_RETRY_ATTEMPTS, || async move {
            provider.restore(snapshot_id).await.map_err(EngineError::from)
        })
        .await?;
        self.catalog.lock().remove(&snapshot.id);
        self.bus.publish(Event::SnapshotRestored {
            snapshot_id: snapshot.id.clone(),
            session_id: session_id.clone(),
            sandbox_id: sandbox.id.clone(),
        });
        self.drop_image(snapshot).await;
        Ok(Some(sandbox))
    }

    /// Whether the session has a current, unexpired snapshot.
    pub fn has_valid(&self, session_id: &SessionId) -> bool {
        let now_ms = self.clock.epoch_ms();
        let catalog = self.catalog.lock();
        catalog
            .current_by_session
            .get(session_id)
            .and_then(|id| catalog.by_id.get(id))
            .is_some_and(|s| !s.is_expired(now_ms))
    }

    pub fn get(&self, id: &SnapshotId) -> Option<Snapshot> {
        self.catalog.lock().by_id.get(id).cloned()
    }

    pub fn list(&self) -> Vec<Snapshot> {
        self.catalog.lock().by_id.values().cloned().collect()
    }

    /// Delete one snapshot. Returns false when unknown.
    pub async fn delete(&self, id: &SnapshotId) -> Result<bool, EngineError> {
        let Some(snapshot) = self.catalog.lock().remove(id) else {
            return Ok(false);
        };
        self.drop_image(snapshot).await;
        Ok(true)
    }

    /// Sweep the expiry index, deleting every snapshot past its deadline.
    /// Returns how many were removed.
    pub async fn delete_expired(&self) -> usize {
        let now_ms = self.clock.epoch_ms();
        let expired: Vec<Snapshot> = {
            let mut catalog = self.catalog.lock();
            let ids: Vec<SnapshotId> = catalog
                .by_expiry
                .iter()
                .take_while(|((expires_at_ms, _), _)| *expires_at_ms <= now_ms)
                .map(|((_, id), _)| id.clone())
                .collect();
            ids.iter().filter_map(|id| catalog.remove(id)).collect()
        };
        let count = expired.len();
        for snapshot in expired {
            debug!(snapshot = %snapshot.id, "expired");
            self.drop_image(snapshot).await;
        }
        count
    }

    /// Remove the provider-side image (best-effort) and announce deletion.
    async fn drop_image(&self, snapshot: Snapshot) {
        if let Err(e) = self.provider.delete_snapshot(&snapshot.id).await {
            debug!(snapshot = %snapshot.id, error = %e, "failed to delete snapshot image");
        }
        self.bus.publish(Event::SnapshotDeleted { snapshot_id: snapshot.id });
    }
}

#[cfg(test)]
#[path = "snapshots_tests.rs"]
mod tests;
