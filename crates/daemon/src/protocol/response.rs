// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ens_core::{
    Agent, AgentStatus, Client, ExecOutput, GitStatus, Prompt, Sandbox, Session, SessionState,
    Snapshot, User,
};
use ens_engine::{EngineError, PoolStats};
use serde::{Deserialize, Serialize};

/// Error taxonomy carried on the wire. The CLI maps these to exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    ResourceExhausted,
    Timeout,
    GitSync,
    Transient,
    Fatal,
}

impl From<&EngineError> for ErrorKind {
    fn from(e: &EngineError) -> Self {
        match e {
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::Conflict(_) => ErrorKind::Conflict,
            EngineError::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
            EngineError::Timeout(_) => ErrorKind::Timeout,
            EngineError::GitSync(_) => ErrorKind::GitSync,
            EngineError::Transient(_) => ErrorKind::Transient,
            EngineError::Fatal(_) => ErrorKind::Fatal,
        }
    }
}

/// Response from the daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    Pong,
    Ok,
    Error { kind: ErrorKind, message: String },
    Status {
        version: String,
        sessions: usize,
        uptime_ms: u64,
    },

    // -- sandboxes --
    Sandbox { sandbox: Sandbox },
    Sandboxes { sandboxes: Vec<Sandbox> },
    Exec { output: ExecOutput },
    Git { status: GitStatus },
    Snapshot { snapshot: Snapshot },
    Snapshots { snapshots: Vec<Snapshot> },
    /// Restore outcome; `None` when the session has no valid snapshot.
    Restored {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sandbox: Option<Sandbox>,
    },

    // -- warm pool --
    Claim {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sandbox: Option<Sandbox>,
        reason: String,
    },
    PoolStats { stats: PoolStats },

    // -- background agents --
    Agent { agent: Agent },
    Agents { agents: Vec<Agent> },
    AgentOutput {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        output: Option<String>,
    },
    Cancelled { cancelled: bool },

    // -- multiplayer sessions --
    Session { session: Session },
    Sessions { sessions: Vec<Session> },
    User { user: User },
    Client { client: Client },
    CanEdit { can_edit: bool },
    State { state: SessionState },

    // -- prompt queue --
    Prompt { prompt: Prompt },
    /// `None` when a prompt is already executing or the queue is empty.
    Started {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<Prompt>,
    },
    Completed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<Prompt>,
    },
    Reordered { index: usize },
    Prompts {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        active: Option<Prompt>,
        queue: Vec<Prompt>,
    },

    // -- gate / lifecycle --
    Admitted,
    SandboxResolved { sandbox_id: ens_core::SandboxId },

    // -- stream frames --
    #[serde(rename = "log")]
    LogLine { line: String },
    AgentStatusFrame {
        status: AgentStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    #[serde(rename = "stream:end")]
    StreamEnd,
}

impl Response {
    pub fn error(e: &EngineError) -> Self {
        Response::Error { kind: ErrorKind::from(e), message: e.to_string() }
    }
}
