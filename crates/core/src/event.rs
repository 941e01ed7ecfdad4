// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed events published on the engine bus.
//!
//! Every side-effecting operation emits exactly one event. Serializes with
//! `{"type": "domain:name", ...fields}` format; unknown type tags
//! deserialize to `Custom` so old consumers survive new producers.

use crate::agent::{AgentId, AgentStatus};
use crate::prompt::{PromptId, Priority};
use crate::sandbox::{PoolKey, SandboxId};
use crate::session::{AgentActivity, GitSyncStatus, SessionId};
use crate::snapshot::SnapshotId;
use crate::user::{ClientId, ClientKind, UserId};
use serde::{Deserialize, Serialize};

/// Events emitted by the orchestration core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- session --
    #[serde(rename = "session:created")]
    SessionCreated { session_id: SessionId },

    #[serde(rename = "session:deleted")]
    SessionDeleted { session_id: SessionId },

    /// The tool layer observed working-tree changes in this session.
    #[serde(rename = "session:has_changes")]
    SessionHasChanges { session_id: SessionId },

    /// The session was bound to (or unbound from) an execution sandbox.
    #[serde(rename = "session:sandbox_bound")]
    SandboxBound {
        session_id: SessionId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sandbox_id: Option<SandboxId>,
    },

    // -- user --
    #[serde(rename = "user:joined")]
    UserJoined { session_id: SessionId, user_id: UserId },

    #[serde(rename = "user:left")]
    UserLeft { session_id: SessionId, user_id: UserId },

    // -- client --
    #[serde(rename = "client:connected")]
    ClientConnected {
        session_id: SessionId,
        client_id: ClientId,
        user_id: UserId,
        kind: ClientKind,
    },

    #[serde(rename = "client:disconnected")]
    ClientDisconnected { session_id: SessionId, client_id: ClientId },

    // -- cursor / lock --
    #[serde(rename = "cursor:moved")]
    CursorMoved { session_id: SessionId, user_id: UserId },

    #[serde(rename = "lock:acquired")]
    LockAcquired { session_id: SessionId, user_id: UserId },

    #[serde(rename = "lock:released")]
    LockReleased { session_id: SessionId, user_id: UserId },

    // -- state --
    /// Shared state changed. Carries the post-change values so consumers
    /// (gate, lifecycle) need no extra read.
    #[serde(rename = "state:changed")]
    StateChanged {
        session_id: SessionId,
        git_sync: GitSyncStatus,
        agent_activity: AgentActivity,
        version: u64,
    },

    // -- prompt --
    #[serde(rename = "prompt:added")]
    PromptAdded {
        session_id: SessionId,
        prompt_id: PromptId,
        user_id: UserId,
        priority: Priority,
    },

    #[serde(rename = "prompt:started")]
    PromptStarted { session_id: SessionId, prompt_id: PromptId },

    #[serde(rename = "prompt:completed")]
    PromptCompleted { session_id: SessionId, prompt_id: PromptId },

    #[serde(rename = "prompt:cancelled")]
    PromptCancelled { session_id: SessionId, prompt_id: PromptId },

    #[serde(rename = "prompt:reordered")]
    PromptReordered { session_id: SessionId, prompt_id: PromptId, index: usize },

    #[serde(rename = "prompt:cleared")]
    PromptQueueCleared { session_id: SessionId, count: usize },

    // -- agent --
    #[serde(rename = "agent:spawned")]
    AgentSpawned { agent_id: AgentId, session_id: SessionId },

    /// One per successful status transition.
    #[serde(rename = "agent:status")]
    AgentStatusChanged {
        agent_id: AgentId,
        session_id: SessionId,
        status: AgentStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    // -- sandbox --
    #[serde(rename = "sandbox:created")]
    SandboxCreated { sandbox_id: SandboxId, project_id: String },

    #[serde(rename = "sandbox:terminated")]
    SandboxTerminated { sandbox_id: SandboxId },

    // -- warm pool --
    #[serde(rename = "warmpool:claimed")]
    PoolClaimed { key: PoolKey, sandbox_id: SandboxId },

    #[serde(rename = "warmpool:miss")]
    PoolMiss { key: PoolKey },

    #[serde(rename = "warmpool:replenished")]
    PoolReplenished { key: PoolKey, sandbox_id: SandboxId },

    #[serde(rename = "warmpool:released")]
    PoolReleased { key: PoolKey, sandbox_id: SandboxId },

    // -- snapshot --
    #[serde(rename = "snapshot:created")]
    SnapshotCreated {
        snapshot_id: SnapshotId,
        session_id: SessionId,
        /// The previous current snapshot this one supersedes.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        superseded: Option<SnapshotId>,
    },

    #[serde(rename = "snapshot:restored")]
    SnapshotRestored {
        snapshot_id: SnapshotId,
        session_id: SessionId,
        sandbox_id: SandboxId,
    },

    #[serde(rename = "snapshot:deleted")]
    SnapshotDeleted { snapshot_id: SnapshotId },

    // -- git-sync gate --
    #[serde(rename = "gitsync:blocked")]
    GitSyncBlocked { session_id: SessionId, tool: String },

    #[serde(rename = "gitsync:failed")]
    GitSyncFailed { session_id: SessionId, tool: String, error: String },

    // -- system --
    #[serde(rename = "system:shutdown")]
    Shutdown,

    /// Catch-all for unknown event types (extensibility).
    #[serde(other, skip_serializing)]
    Custom,
}

impl Event {
    /// The session this event concerns, when it concerns one.
    pub fn session_id(&self) -> Option<&SessionId> {
        use Event::*;
        match self {
            SessionCreated { session_id }
            | SessionDeleted { session_id }
            | SessionHasChanges { session_id }
            | SandboxBound { session_id, .. }
            | UserJoined { session_id, .. }
            | UserLeft { session_id, .. }
            | ClientConnected { session_id, .. }
            | ClientDisconnected { session_id, .. }
            | CursorMoved { session_id, .. }
            | LockAcquired { session_id, .. }
            | LockReleased { session_id, .. }
            | StateChanged { session_id, .. }
            | PromptAdded { session_id, .. }
            | PromptStarted { session_id, .. }
            | PromptCompleted { session_id, .. }
            | PromptCancelled { session_id, .. }
            | PromptReordered { session_id, .. }
            | PromptQueueCleared { session_id, .. }
            | AgentSpawned { session_id, .. }
            | AgentStatusChanged { session_id, .. }
            | SnapshotCreated { session_id, .. }
            | SnapshotRestored { session_id, .. }
            | GitSyncBlocked { session_id, .. }
            | GitSyncFailed { session_id, .. } => Some(session_id),
            _ => None,
        }
    }

    /// Compact single-line form for log output.
    pub fn log_summary(&self) -> String {
        use Event::*;
        match self {
            SessionCreated { session_id } => format!("session:created {session_id}"),
            SessionDeleted { session_id } => format!("session:deleted {session_id}"),
            SessionHasChanges { session_id } => format!("session:has_changes {session_id}"),
            SandboxBound { session_id, sandbox_id } => match sandbox_id {
                Some(sandbox_id) => format!("session:sandbox_bound {session_id} {sandbox_id}"),
                None => format!("session:sandbox_bound {session_id} unbound"),
            },
            UserJoined { session_id, user_id } => format!("user:joined {session_id} {user_id}"),
            UserLeft { session_id, user_id } => format!("user:left {session_id} {user_id}"),
            ClientConnected { session_id, client_id, .. } => {
                format!("client:connected {session_id} {client_id}")
            }
            ClientDisconnected { session_id, client_id } => {
                format!("client:disconnected {session_id} {client_id}")
            }
            CursorMoved { session_id, user_id } => format!("cursor:moved {session_id} {user_id}"),
            LockAcquired { session_id, user_id } => {
                format!("lock:acquired {session_id} {user_id}")
            }
            LockReleased { session_id, user_id } => {
                format!("lock:released {session_id} {user_id}")
            }
            StateChanged { session_id, git_sync, agent_activity, version } => format!(
                "state:changed {session_id} git_sync={git_sync} activity={agent_activity} v{version}"
            ),
            PromptAdded { session_id, prompt_id, priority, .. } => {
                format!("prompt:added {session_id} {prompt_id} {priority}")
            }
            PromptStarted { session_id, prompt_id } => {
                format!("prompt:started {session_id} {prompt_id}")
            }
            PromptCompleted { session_id, prompt_id } => {
                format!("prompt:completed {session_id} {prompt_id}")
            }
            PromptCancelled { session_id, prompt_id } => {
                format!("prompt:cancelled {session_id} {prompt_id}")
            }
            PromptReordered { session_id, prompt_id, index } => {
                format!("prompt:reordered {session_id} {prompt_id} -> {index}")
            }
            PromptQueueCleared { session_id, count } => {
                format!("prompt:cleared {session_id} count={count}")
            }
            AgentSpawned { agent_id, session_id } => {
                format!("agent:spawned {agent_id} parent={session_id}")
            }
            AgentStatusChanged { agent_id, status, .. } => {
                format!("agent:status {agent_id} {status}")
            }
            SandboxCreated { sandbox_id, project_id } => {
                format!("sandbox:created {sandbox_id} project={project_id}")
            }
            SandboxTerminated { sandbox_id } => format!("sandbox:terminated {sandbox_id}"),
            PoolClaimed { key, sandbox_id } => format!("warmpool:claimed {key} {sandbox_id}"),
            PoolMiss { key } => format!("warmpool:miss {key}"),
            PoolReplenished { key, sandbox_id } => {
                format!("warmpool:replenished {key} {sandbox_id}")
            }
            PoolReleased { key, sandbox_id } => format!("warmpool:released {key} {sandbox_id}"),
            SnapshotCreated { snapshot_id, session_id, .. } => {
                format!("snapshot:created {snapshot_id} {session_id}")
            }
            SnapshotRestored { snapshot_id, sandbox_id, .. } => {
                format!("snapshot:restored {snapshot_id} -> {sandbox_id}")
            }
            SnapshotDeleted { snapshot_id } => format!("snapshot:deleted {snapshot_id}"),
            GitSyncBlocked { session_id, tool } => {
                format!("gitsync:blocked {session_id} tool={tool}")
            }
            GitSyncFailed { session_id, tool, .. } => {
                format!("gitsync:failed {session_id} tool={tool}")
            }
            Shutdown => "system:shutdown".to_string(),
            Custom => "custom".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
