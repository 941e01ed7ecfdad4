// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::agent::{Agent, SpawnAgentInput};
use crate::prompt::{Priority, Prompt};
use crate::session::{Session, SessionId};
use crate::user::User;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core state machine types.
pub mod strategies {
    use crate::agent::AgentStatus;
    use crate::prompt::{Priority, PromptStatus};
    use crate::session::{AgentActivity, GitSyncStatus};
    use proptest::prelude::*;

    pub fn arb_priority() -> impl Strategy<Value = Priority> {
        prop_oneof![Just(Priority::Urgent), Just(Priority::High), Just(Priority::Normal)]
    }

    pub fn arb_prompt_status() -> impl Strategy<Value = PromptStatus> {
        prop_oneof![
            Just(PromptStatus::Queued),
            Just(PromptStatus::Executing),
            Just(PromptStatus::Completed),
            Just(PromptStatus::Cancelled),
        ]
    }

    pub fn arb_agent_status() -> impl Strategy<Value = AgentStatus> {
        prop_oneof![
            Just(AgentStatus::Queued),
            Just(AgentStatus::Initializing),
            Just(AgentStatus::Running),
            Just(AgentStatus::Completed),
            Just(AgentStatus::Failed),
            Just(AgentStatus::Cancelled),
        ]
    }

    pub fn arb_git_sync() -> impl Strategy<Value = GitSyncStatus> {
        prop_oneof![
            Just(GitSyncStatus::Pending),
            Just(GitSyncStatus::Syncing),
            Just(GitSyncStatus::Synced),
            Just(GitSyncStatus::Error),
        ]
    }

    pub fn arb_agent_activity() -> impl Strategy<Value = AgentActivity> {
        prop_oneof![
            Just(AgentActivity::Idle),
            Just(AgentActivity::Thinking),
            Just(AgentActivity::Executing),
        ]
    }
}

// ── Aggregate factories ─────────────────────────────────────────────────

/// A freshly queued prompt for transition tests. Fields are public;
/// tests that need another starting state mutate it directly.
pub fn queued_prompt() -> Prompt {
    Prompt::new(SessionId::from_string("ses_test"), "user-1", "do the thing", Priority::Normal, 0)
}

/// A freshly queued agent for transition tests.
pub fn queued_agent() -> Agent {
    let input = SpawnAgentInput::new(SessionId::from_string("ses_test"), "investigate flaky test");
    Agent::new(input, "ws-test", 0)
}

/// A session with one joined user, ready for queue and lock tests.
pub fn session_with_user(user_id: &str) -> Session {
    let mut session = Session::new(SessionId::generate(), "ws-test", 1_000);
    let user = User::new(user_id, user_id, 1_000).color("#7aa2f7");
    // A fresh session always has capacity for the first user.
    let _ = session.join_user(user, 8);
    session
}

/// A session with `n` joined users named `user-0..n`.
pub fn session_with_users(n: usize) -> Session {
    let mut session = Session::new(SessionId::generate(), "ws-test", 1_000);
    for i in 0..n {
        let name = format!("user-{i}");
        let _ = session.join_user(User::new(name.as_str(), name.as_str(), 1_000 + i as u64), n);
    }
    session
}
