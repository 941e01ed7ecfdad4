// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot lifecycle orchestrator.
//!
//! Bridges idle/busy signals into sandbox decisions: a session that did
//! real work (long enough, with changes) gets snapshotted and its sandbox
//! terminated when it goes idle; a follow-up prompt resumes it from the
//! snapshot, a warm-pool claim, or a fresh create, in that order.

use crate::bus::EventBus;
use crate::error::{retry, EngineError, DEFAULT_RETRY_ATTEMPTS};
use crate::multiplayer::SessionManager;
use crate::pool::WarmPool;
use crate::snapshots::SnapshotManager;
use ens_core::{Clock, CreateSandboxInput, Event, PoolKey, SandboxId, SessionId};
use ens_provider::SandboxProvider;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Lifecycle tunables.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Terminate the sandbox once its snapshot is taken.
    pub auto_terminate: bool,
    /// Work periods shorter than this never snapshot.
    pub min_work_duration: Duration,
    /// Best-effort `sync_git` on every snapshot restore.
    pub sync_on_restore: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            auto_terminate: true,
            min_work_duration: Duration::from_secs(5),
            sync_on_restore: true,
        }
    }
}

/// One busy period being tracked for a session.
struct WorkPeriod {
    started_at: Instant,
    has_changes: bool,
}

/// Pause-on-idle / resume-on-follow-up orchestrator.
pub struct SnapshotLifecycle<C: Clock> {
    snapshots: Arc<SnapshotManager<C>>,
    pool: Arc<WarmPool<C>>,
    provider: Arc<dyn SandboxProvider>,
    sessions: Arc<SessionManager<C>>,
    bus: EventBus<C>,
    clock: C,
    config: LifecycleConfig,
    work: Mutex<HashMap<SessionId, WorkPeriod>>,
}

impl<C: Clock> SnapshotLifecycle<C> {
    pub fn new(
        snapshots: Arc<SnapshotManager<C>>,
        pool: Arc<WarmPool<C>>,
        provider: Arc<dyn SandboxProvider>,
        sessions: Arc<SessionManager<C>>,
        bus: EventBus<C>,
        clock: C,
        config: LifecycleConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            snapshots,
            pool,
            provider,
            sessions,
            bus,
            clock,
            config,
            work: Mutex::new(HashMap::new()),
        })
    }

    /// Feed a bus event through the lifecycle.
    pub async fn handle_event(&self, event: &Event) {
        match event {
            Event::StateChanged { session_id, agent_activity, .. } => {
                if agent_activity.is_busy() {
                    self.work.lock().entry(session_id.clone()).or_insert(WorkPeriod {
                        started_at: self.clock.now(),
                        has_changes: false,
                    });
                } else {
                    // Take the period out before awaiting; the scrutinee of
                    // an `if let` would pin the guard across the await.
                    let period = self.work.lock().remove(session_id);
                    if let Some(period) = period {
                        self.on_idle(session_id, period).await;
                    }
                }
            }
            // Taking the edit lock implies intent to modify the tree.
            Event::LockAcquired { session_id, .. }
            | Event::SessionHasChanges { session_id } => {
                if let Some(period) = self.work.lock().get_mut(session_id) {
                    period.has_changes = true;
                }
            }
            _ => {}
        }
    }

    /// Busy→idle: snapshot-and-park when the work period qualifies.
    async fn on_idle(&self, session_id: &SessionId, period: WorkPeriod) {
        let duration = self.clock.now().duration_since(period.started_at);
        if duration < self.config.min_work_duration || !period.has_changes {
            debug!(
                session = %session_id,
                duration_ms = duration.as_millis() as u64,
                has_changes = period.has_changes,
                "skipping snapshot",
            );
            return;
        }

        let session = match self.sessions.get(session_id).await {
            Ok(session) => session,
            Err(e) => {
                warn!(session = %session_id, error = %e, "lifecycle lost session");
                return;
            }
        };
        let Some(sandbox_id) = session.sandbox_id else {
            return;
        };

        let provider = &self.provider;
        let sandbox_ref = &sandbox_id;
        let git = match retry("provider.git_status", DEFAULT_RETRY_ATTEMPTS, || async move {
            provider.git_status(sandbox_ref).await.map_err(EngineError::from)
        })
        .await
        {
            Ok(git) => git,
            Err(e) => {
                warn!(session = %session_id, error = %e, "git status failed, not snapshotting");
                return;
            }
        };

        match self
            .snapshots
            .create(&sandbox_id, session_id, git.commit, git.dirty, None)
            .await
        {
            Ok(snapshot) => {
                info!(session = %session_id, snapshot = %snapshot.id, "session hibernated");
                if self.config.auto_terminate {
                    if let Err(e) = self.provider.terminate(&sandbox_id).await {
                        warn!(sandbox = %sandbox_id, error = %e, "terminate after snapshot failed");
                    } else {
                        self.bus.publish(Event::SandboxTerminated {
                            sandbox_id: sandbox_id.clone(),
                        });
                    }
                    if let Err(e) = self.sessions.bind_sandbox(session_id, None).await {
                        warn!(session = %session_id, error = %e, "failed to unbind sandbox");
                    }
                }
            }
            Err(e) => warn!(session = %session_id, error = %e, "snapshot failed"),
        }
    }

    /// Resolve a sandbox for a follow-up prompt on a (possibly hibernated)
    /// session: snapshot restore → warm-pool claim → fresh create.
    pub async fn on_follow_up_prompt(
        self: &Arc<Self>,
        session_id: &SessionId,
        repository: &str,
        branch: Option<&str>,
        project_id: &str,
    ) -> Result<SandboxId, EngineError> {
        if self.snapshots.has_valid(session_id) {
            if let Some(sandbox) = self.snapshots.restore(session_id).await? {
                if self.config.sync_on_restore {
                    if let Err(e) = self.provider.sync_git(&sandbox.id).await {
                        warn!(sandbox = %sandbox.id, error = %e, "sync on restore failed");
                    }
                }
                self.sessions.bind_sandbox(session_id, Some(sandbox.id.clone())).await?;
                return Ok(sandbox.id);
            }
        }

        let key = PoolKey {
            repository: repository.to_string(),
            branch: branch.map(str::to_string),
            image_tag: None,
        };
        if let Some(sandbox) = self.pool.claim(&key, project_id).sandbox {
            self.sessions.bind_sandbox(session_id, Some(sandbox.id.clone())).await?;
            return Ok(sandbox.id);
        }

        let mut input = CreateSandboxInput::new(project_id, repository);
        input.branch = branch.map(str::to_string);
        let provider = &self.provider;
        let sandbox = retry("provider.create", DEFAULT_RETRY_ATTEMPTS, || {
            let input = input.clone();
            async move { provider.create(input).await.map_err(EngineError::from) }
        })
        .await?;
        self.bus.publish(Event::SandboxCreated {
            sandbox_id: sandbox.id.clone(),
            project_id: project_id.to_string(),
        });
        self.sessions.bind_sandbox(session_id, Some(sandbox.id.clone())).await?;
        Ok(sandbox.id)
    }

    /// Periodic expiry sweep: drop snapshots past their deadline.
    pub async fn sweep(&self) -> usize {
        self.snapshots.delete_expired().await
    }

    /// Sessions with a tracked busy period (observability, tests).
    pub fn tracked_sessions(&self) -> usize {
        self.work.lock().len()
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
