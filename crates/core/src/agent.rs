// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background agents and their status machine.
//!
//! An agent is a sub-task spawned from a parent session into its own work
//! session and (eventually) its own sandbox. The status machine here is
//! pure; admission control and dispatch live in the engine's scheduler.

use crate::sandbox::SandboxId;
use crate::session::SessionId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a background agent.
    pub struct AgentId("agt_");
}

/// Lifecycle status of a background agent. Terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Queued,
    Initializing,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl AgentStatus {
    /// The allowed transition table:
    /// queued → {initializing, cancelled},
    /// initializing → {running, failed, cancelled},
    /// running → {completed, failed, cancelled}.
    pub fn can_transition(self, to: AgentStatus) -> bool {
        use AgentStatus::*;
        match self {
            Queued => matches!(to, Initializing | Cancelled),
            Initializing => matches!(to, Running | Failed | Cancelled),
            Running => matches!(to, Completed | Failed | Cancelled),
            Completed | Failed | Cancelled => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AgentStatus::Completed | AgentStatus::Failed | AgentStatus::Cancelled)
    }
}

crate::simple_display! {
    AgentStatus {
        Queued => "queued",
        Initializing => "initializing",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// Input for spawning a background agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnAgentInput {
    pub parent_session_id: SessionId,
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl SpawnAgentInput {
    pub fn new(parent_session_id: SessionId, task: impl Into<String>) -> Self {
        Self { parent_session_id, task: task.into(), repository: None, branch: None }
    }

    crate::optional_setters! {
        repository: String,
        branch: String,
    }
}

/// Extra data carried by a status transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionCtx {
    pub sandbox_id: Option<SandboxId>,
    pub error: Option<String>,
    pub output: Option<String>,
}

impl TransitionCtx {
    pub fn with_sandbox(sandbox_id: SandboxId) -> Self {
        Self { sandbox_id: Some(sandbox_id), ..Self::default() }
    }

    pub fn with_error(error: impl Into<String>) -> Self {
        Self { error: Some(error.into()), ..Self::default() }
    }

    pub fn with_output(output: impl Into<String>) -> Self {
        Self { output: Some(output.into()), ..Self::default() }
    }
}

/// A background agent instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub parent_session_id: SessionId,
    /// Opaque downstream work session id, minted at spawn time.
    pub work_session_id: String,
    /// Weak reference to the sandbox the agent runs in, once initialized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox_id: Option<SandboxId>,
    pub status: AgentStatus,
    pub task: String,
    /// Repository the agent should work against, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl Agent {
    pub fn new(input: SpawnAgentInput, work_session_id: impl Into<String>, now_ms: u64) -> Self {
        Self {
            id: AgentId::generate(),
            parent_session_id: input.parent_session_id,
            work_session_id: work_session_id.into(),
            sandbox_id: None,
            status: AgentStatus::Queued,
            task: input.task,
            repository: input.repository,
            branch: input.branch,
            created_at_ms: now_ms,
            started_at_ms: None,
            completed_at_ms: None,
            error: None,
            output: None,
        }
    }

    /// Apply a status transition, recording context and timestamps.
    /// Returns false (and changes nothing) when the transition is invalid.
    pub fn transition(&mut self, to: AgentStatus, ctx: TransitionCtx, now_ms: u64) -> bool {
        if !self.status.can_transition(to) {
            return false;
        }
        if let Some(sandbox_id) = ctx.sandbox_id {
            self.sandbox_id = Some(sandbox_id);
        }
        if let Some(error) = ctx.error {
            self.error = Some(error);
        }
        if let Some(output) = ctx.output {
            self.output = Some(output);
        }
        match to {
            AgentStatus::Running => self.started_at_ms = Some(now_ms),
            s if s.is_terminal() => self.completed_at_ms = Some(now_ms),
            _ => {}
        }
        self.status = to;
        true
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
