// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prompts and their status machine.

use crate::session::SessionId;
use crate::user::UserId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a queued prompt.
    pub struct PromptId("prm_");
}

/// Execution priority. Variant order is rank order: urgent runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    Normal,
}

impl Priority {
    /// Numeric rank: urgent(0) < high(1) < normal(2).
    pub fn rank(self) -> u8 {
        match self {
            Priority::Urgent => 0,
            Priority::High => 1,
            Priority::Normal => 2,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

crate::simple_display! {
    Priority {
        Urgent => "urgent",
        High => "high",
        Normal => "normal",
    }
}

/// Lifecycle status of a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStatus {
    Queued,
    Executing,
    Completed,
    Cancelled,
}

impl PromptStatus {
    /// Allowed transitions: queued→executing, executing→completed,
    /// queued→cancelled. Everything else is rejected.
    pub fn can_transition(self, to: PromptStatus) -> bool {
        matches!(
            (self, to),
            (PromptStatus::Queued, PromptStatus::Executing)
                | (PromptStatus::Executing, PromptStatus::Completed)
                | (PromptStatus::Queued, PromptStatus::Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PromptStatus::Completed | PromptStatus::Cancelled)
    }
}

crate::simple_display! {
    PromptStatus {
        Queued => "queued",
        Executing => "executing",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

/// A user utterance scheduled for the session agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: PromptId,
    pub session_id: SessionId,
    pub user_id: UserId,
    pub content: String,
    pub status: PromptStatus,
    pub priority: Priority,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at_ms: Option<u64>,
}

impl Prompt {
    pub fn new(
        session_id: SessionId,
        user_id: impl Into<UserId>,
        content: impl Into<String>,
        priority: Priority,
        now_ms: u64,
    ) -> Self {
        Self {
            id: PromptId::generate(),
            session_id,
            user_id: user_id.into(),
            content: content.into(),
            status: PromptStatus::Queued,
            priority,
            created_at_ms: now_ms,
            started_at_ms: None,
            completed_at_ms: None,
        }
    }

    /// Apply a status transition, stamping timestamps. Returns false (and
    /// leaves the prompt untouched) when the transition is not allowed.
    pub fn transition(&mut self, to: PromptStatus, now_ms: u64) -> bool {
        if !self.status.can_transition(to) {
            return false;
        }
        match to {
            PromptStatus::Executing => self.started_at_ms = Some(now_ms),
            PromptStatus::Completed | PromptStatus::Cancelled => {
                self.completed_at_ms = Some(now_ms)
            }
            PromptStatus::Queued => {}
        }
        self.status = to;
        true
    }
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
