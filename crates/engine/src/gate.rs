// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git-sync gate.
//!
//! Admission check for tool calls: read-class tools pass, write-class
//! tools are blocked until the session's git sync reaches `synced`.
//! Blocked requests park on a oneshot waiter; a `state:changed` event that
//! flips the status to `synced` drains waiters in FIFO order, `error`
//! fails them. The safety property: no write tool call is admitted while
//! `git_sync ≠ synced` at the admission instant.

use crate::actor::SessionActors;
use crate::bus::EventBus;
use crate::error::EngineError;
use ens_core::{classify_tool, Clock, Event, GitSyncStatus, SessionId, ToolClass};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

struct Waiter {
    tool: String,
    tx: oneshot::Sender<Result<(), EngineError>>,
}

/// Outcome of an admission request.
#[derive(Debug)]
pub enum Admission {
    /// Admitted at the admission instant.
    Ready,
    /// Parked until sync completes or fails.
    Pending(oneshot::Receiver<Result<(), EngineError>>),
}

/// Classifier + admission check blocking writes on an un-synced sandbox.
pub struct GitSyncGate<C: Clock> {
    actors: Arc<SessionActors<C>>,
    bus: EventBus<C>,
    pending: Mutex<HashMap<SessionId, Vec<Waiter>>>,
}

impl<C: Clock> GitSyncGate<C> {
    pub fn new(actors: Arc<SessionActors<C>>, bus: EventBus<C>) -> Arc<Self> {
        Arc::new(Self { actors, bus, pending: Mutex::new(HashMap::new()) })
    }

    /// Request admission for `tool` against a session.
    ///
    /// Unknown tool names are rejected. Writes submitted while the status
    /// is already `error` fail fast; queueing behind a known-bad sync
    /// would just delay the same failure.
    pub async fn request(
        &self,
        session_id: &SessionId,
        tool: &str,
    ) -> Result<Admission, EngineError> {
        let class = classify_tool(tool)
            .ok_or_else(|| EngineError::Validation(format!("unknown tool: {tool}")))?;
        if class == ToolClass::Read {
            return Ok(Admission::Ready);
        }

        let session = self.actors.read(session_id).await?;
        match session.state.git_sync {
            GitSyncStatus::Synced => Ok(Admission::Ready),
            GitSyncStatus::Error => Err(EngineError::GitSync(format!(
                "session {session_id} sync is in error"
            ))),
            GitSyncStatus::Pending | GitSyncStatus::Syncing => {
                let (tx, rx) = oneshot::channel();
                self.pending
                    .lock()
                    .entry(session_id.clone())
                    .or_default()
                    .push(Waiter { tool: tool.to_string(), tx });
                debug!(session = %session_id, tool, "write blocked on git sync");
                self.bus.publish(Event::GitSyncBlocked {
                    session_id: session_id.clone(),
                    tool: tool.to_string(),
                });
                Ok(Admission::Pending(rx))
            }
        }
    }

    /// Request admission and wait for it.
    pub async fn admit(&self, session_id: &SessionId, tool: &str) -> Result<(), EngineError> {
        match self.request(session_id, tool).await? {
            Admission::Ready => Ok(()),
            Admission::Pending(rx) => rx
                .await
                .map_err(|_| EngineError::GitSync("gate dropped while waiting".to_string()))?,
        }
    }

    /// Feed a bus event through the gate. Only `state:changed` matters.
    pub fn handle_event(&self, event: &Event) {
        let Event::StateChanged { session_id, git_sync, .. } = event else {
            return;
        };
        match git_sync {
            GitSyncStatus::Synced => {
                let waiters = self.pending.lock().remove(session_id).unwrap_or_default();
                for waiter in waiters {
                    let _ = waiter.tx.send(Ok(()));
                }
            }
            GitSyncStatus::Error => {
                let waiters = self.pending.lock().remove(session_id).unwrap_or_default();
                for waiter in waiters {
                    self.bus.publish(Event::GitSyncFailed {
                        session_id: session_id.clone(),
                        tool: waiter.tool.clone(),
                        error: "git sync reached error".to_string(),
                    });
                    let _ = waiter
                        .tx
                        .send(Err(EngineError::GitSync("git sync reached error".to_string())));
                }
            }
            GitSyncStatus::Pending | GitSyncStatus::Syncing => {}
        }
    }

    /// Parked writes for a session (observability, tests).
    pub fn pending_count(&self, session_id: &SessionId) -> usize {
        self.pending.lock().get(session_id).map_or(0, Vec::len)
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
