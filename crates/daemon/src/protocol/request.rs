// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ens_core::{
    ClientId, ClientKind, CreateSandboxInput, Cursor, ExecRequest, PoolKey, Priority, PromptId,
    SandboxId, SessionId, SnapshotId, SpawnAgentInput, StatePatch, UserId,
};
use serde::{Deserialize, Serialize};

/// Request from a client to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Get daemon status
    Status,

    /// Request daemon shutdown
    Shutdown,

    // -- sandboxes --
    SandboxCreate { input: CreateSandboxInput },
    SandboxList {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        project_id: Option<String>,
    },
    SandboxGet { id: SandboxId },
    SandboxStart { id: SandboxId },
    SandboxStop { id: SandboxId },
    SandboxTerminate { id: SandboxId },
    SandboxExec { id: SandboxId, request: ExecRequest },
    /// Streaming: one `log` frame per line, then `stream:end`.
    SandboxLogs { id: SandboxId, service: String },
    SandboxGit { id: SandboxId },
    SandboxGitSync { id: SandboxId },
    SandboxSnapshot {
        id: SandboxId,
        session_id: SessionId,
        git_commit: String,
        #[serde(default)]
        has_uncommitted_changes: bool,
    },
    SandboxRestore { session_id: SessionId },
    SnapshotList,
    SnapshotDelete { id: SnapshotId },

    // -- warm pool --
    PoolClaim { key: PoolKey, project_id: String },
    PoolTyping { key: PoolKey, project_id: String },
    PoolStats {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<PoolKey>,
    },

    // -- background agents --
    AgentSpawn { input: SpawnAgentInput },
    AgentGet { id: ens_core::AgentId },
    AgentOutput { id: ens_core::AgentId },
    AgentCancel { id: ens_core::AgentId },
    AgentList,
    /// Streaming: initial status, one frame per change, terminal
    /// `stream:end` once the agent lands in a terminal state.
    AgentEvents { id: ens_core::AgentId },

    // -- multiplayer sessions --
    SessionCreate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<SessionId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        work_session_id: Option<String>,
    },
    SessionGet { session_id: SessionId },
    SessionList,
    SessionDelete { session_id: SessionId },
    Join {
        session_id: SessionId,
        user_id: UserId,
        display_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        email: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        avatar: Option<String>,
    },
    Leave { session_id: SessionId, user_id: UserId },
    Connect { session_id: SessionId, user_id: UserId, kind: ClientKind },
    Disconnect { session_id: SessionId, client_id: ClientId },
    UpdateCursor {
        session_id: SessionId,
        user_id: UserId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cursor: Option<Cursor>,
    },
    AcquireLock { session_id: SessionId, user_id: UserId },
    ReleaseLock { session_id: SessionId, user_id: UserId },
    CanEdit { session_id: SessionId, user_id: UserId },
    UpdateState { session_id: SessionId, patch: StatePatch },
    /// Tool-layer signal that the working tree changed.
    HasChanges { session_id: SessionId },

    // -- prompt queue --
    PromptAdd {
        session_id: SessionId,
        user_id: UserId,
        content: String,
        #[serde(default)]
        priority: Priority,
    },
    PromptStartNext { session_id: SessionId },
    PromptComplete { session_id: SessionId },
    PromptCancel { session_id: SessionId, prompt_id: PromptId, user_id: UserId },
    PromptReorder {
        session_id: SessionId,
        prompt_id: PromptId,
        user_id: UserId,
        new_index: usize,
    },
    PromptList { session_id: SessionId },

    // -- git-sync gate --
    /// Blocks until the tool is admitted (or sync fails).
    ToolAdmit { session_id: SessionId, tool: String },

    // -- snapshot lifecycle --
    FollowUp {
        session_id: SessionId,
        repository: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch: Option<String>,
        project_id: String,
    },
}
