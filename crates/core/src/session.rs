// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Session aggregate.
//!
//! A Session is the unit of ownership and the only aggregate that gets
//! persisted: it owns its users, clients, prompts, and the currently bound
//! sandbox id. Everything here is pure state manipulation; persistence,
//! versioning, and event emission happen in the engine's per-session actor.

use crate::prompt::Prompt;
use crate::sandbox::SandboxId;
use crate::user::{Client, ClientId, Cursor, User, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

crate::define_id! {
    /// Unique identifier for a multiplayer session.
    pub struct SessionId("ses_");
}

/// Whether the bound sandbox's checkout matches the upstream branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GitSyncStatus {
    Pending,
    Syncing,
    Synced,
    Error,
}

crate::simple_display! {
    GitSyncStatus {
        Pending => "pending",
        Syncing => "syncing",
        Synced => "synced",
        Error => "error",
    }
}

/// What the session's agent is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentActivity {
    Idle,
    Thinking,
    Executing,
}

impl AgentActivity {
    /// Thinking and executing both count as busy for lifecycle purposes.
    pub fn is_busy(self) -> bool {
        !matches!(self, AgentActivity::Idle)
    }
}

crate::simple_display! {
    AgentActivity {
        Idle => "idle",
        Thinking => "thinking",
        Executing => "executing",
    }
}

/// Versioned shared state of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub git_sync: GitSyncStatus,
    pub agent_activity: AgentActivity,
    /// Exclusive writer over the working tree, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_lock: Option<UserId>,
    /// Lock deadline; a lock past its deadline is treated as absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_expires_at_ms: Option<u64>,
    /// Bumped by exactly 1 for every state-changing operation.
    pub version: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            git_sync: GitSyncStatus::Pending,
            agent_activity: AgentActivity::Idle,
            edit_lock: None,
            lock_expires_at_ms: None,
            version: 0,
        }
    }
}

/// Partial update to [`SessionState`].
///
/// `edit_lock` is doubly optional: `None` leaves the lock alone,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_sync: Option<GitSyncStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_activity: Option<AgentActivity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit_lock: Option<Option<UserId>>,
}

impl StatePatch {
    pub fn git_sync(status: GitSyncStatus) -> Self {
        Self { git_sync: Some(status), ..Self::default() }
    }

    pub fn agent_activity(activity: AgentActivity) -> Self {
        Self { agent_activity: Some(activity), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.git_sync.is_none() && self.agent_activity.is_none() && self.edit_lock.is_none()
    }
}

/// Errors from session membership and lock operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session is full")]
    Full,
    #[error("unknown user: {0}")]
    UnknownUser(UserId),
    #[error("edit lock held by {0}")]
    LockHeld(UserId),
}

/// The multiplayer session aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    /// Opaque id linking to the downstream work session.
    pub work_session_id: String,
    /// Bound execution sandbox; `None` while hibernated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox_id: Option<SandboxId>,
    /// Insertion-ordered collaborators.
    pub users: Vec<User>,
    pub clients: Vec<Client>,
    /// The single in-flight prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_prompt: Option<Prompt>,
    /// Queued prompts, held in execution order (priority rank, then age).
    pub prompt_queue: Vec<Prompt>,
    pub state: SessionState,
    pub created_at_ms: u64,
}

impl Session {
    pub fn new(id: SessionId, work_session_id: impl Into<String>, now_ms: u64) -> Self {
        Self {
            id,
            work_session_id: work_session_id.into(),
            sandbox_id: None,
            users: Vec::new(),
            clients: Vec::new(),
            active_prompt: None,
            prompt_queue: Vec::new(),
            state: SessionState::default(),
            created_at_ms: now_ms,
        }
    }

    pub fn user(&self, id: &UserId) -> Option<&User> {
        self.users.iter().find(|u| &u.id == id)
    }

    fn user_mut(&mut self, id: &UserId) -> Option<&mut User> {
        self.users.iter_mut().find(|u| &u.id == id)
    }

    pub fn client(&self, id: &ClientId) -> Option<&Client> {
        self.clients.iter().find(|c| &c.id == id)
    }

    /// Add a collaborator. Idempotent for the same user id: re-joining
    /// returns `Ok(false)` and leaves the existing record alone.
    pub fn join_user(&mut self, user: User, max_users: usize) -> Result<bool, SessionError> {
        if self.user(&user.id).is_some() {
            return Ok(false);
        }
        if self.users.len() >= max_users {
            return Err(SessionError::Full);
        }
        self.users.push(user);
        Ok(true)
    }

    /// Remove a collaborator, their clients, and any lock they hold.
    pub fn leave_user(&mut self, user_id: &UserId) -> bool {
        let before = self.users.len();
        self.users.retain(|u| &u.id != user_id);
        if self.users.len() == before {
            return false;
        }
        self.clients.retain(|c| &c.user_id != user_id);
        if self.state.edit_lock.as_ref() == Some(user_id) {
            self.state.edit_lock = None;
            self.state.lock_expires_at_ms = None;
        }
        true
    }

    /// Bind a client connection to a present user.
    pub fn connect_client(
        &mut self,
        client: Client,
        max_clients_per_user: usize,
    ) -> Result<(), SessionError> {
        if self.user(&client.user_id).is_none() {
            return Err(SessionError::UnknownUser(client.user_id));
        }
        let held = self.clients.iter().filter(|c| c.user_id == client.user_id).count();
        if held >= max_clients_per_user {
            return Err(SessionError::Full);
        }
        self.clients.push(client);
        Ok(())
    }

    /// Remove a client; the owning user's activity timestamp is refreshed.
    pub fn disconnect_client(&mut self, client_id: &ClientId, now_ms: u64) -> bool {
        let Some(pos) = self.clients.iter().position(|c| &c.id == client_id) else {
            return false;
        };
        let client = self.clients.remove(pos);
        if let Some(user) = self.user_mut(&client.user_id) {
            user.last_active_ms = now_ms;
        }
        true
    }

    pub fn update_cursor(
        &mut self,
        user_id: &UserId,
        cursor: Option<Cursor>,
        now_ms: u64,
    ) -> Result<(), SessionError> {
        match self.user_mut(user_id) {
            Some(user) => {
                user.cursor = cursor;
                user.last_active_ms = now_ms;
                Ok(())
            }
            None => Err(SessionError::UnknownUser(user_id.clone())),
        }
    }

    /// The current lock holder, if the lock has not expired.
    pub fn lock_holder(&self, now_ms: u64) -> Option<&UserId> {
        let holder = self.state.edit_lock.as_ref()?;
        match self.state.lock_expires_at_ms {
            Some(deadline) if deadline <= now_ms => None,
            _ => Some(holder),
        }
    }

    /// Acquire or refresh the edit lock.
    ///
    /// Succeeds when the lock is absent, expired, or already held by
    /// `user_id` (keepalive). The deadline is pushed out either way.
    pub fn acquire_lock(
        &mut self,
        user_id: &UserId,
        now_ms: u64,
        timeout_ms: u64,
    ) -> Result<(), SessionError> {
        if self.user(user_id).is_none() {
            return Err(SessionError::UnknownUser(user_id.clone()));
        }
        if let Some(holder) = self.lock_holder(now_ms) {
            if holder != user_id {
                return Err(SessionError::LockHeld(holder.clone()));
            }
        }
        self.state.edit_lock = Some(user_id.clone());
        self.state.lock_expires_at_ms = Some(now_ms + timeout_ms);
        Ok(())
    }

    /// Release the lock. No-op unless held by `user_id`.
    pub fn release_lock(&mut self, user_id: &UserId) -> bool {
        if self.state.edit_lock.as_ref() != Some(user_id) {
            return false;
        }
        self.state.edit_lock = None;
        self.state.lock_expires_at_ms = None;
        true
    }

    /// Whether `user_id` may mutate the working tree right now.
    pub fn can_edit(&self, user_id: &UserId, now_ms: u64) -> bool {
        match self.lock_holder(now_ms) {
            None => true,
            Some(holder) => holder == user_id,
        }
    }

    /// Apply a partial state update. Returns true when anything changed.
    pub fn apply_patch(&mut self, patch: StatePatch) -> bool {
        let mut changed = false;
        if let Some(git_sync) = patch.git_sync {
            changed |= self.state.git_sync != git_sync;
            self.state.git_sync = git_sync;
        }
        if let Some(activity) = patch.agent_activity {
            changed |= self.state.agent_activity != activity;
            self.state.agent_activity = activity;
        }
        if let Some(lock) = patch.edit_lock {
            changed |= self.state.edit_lock != lock;
            if lock.is_none() {
                self.state.lock_expires_at_ms = None;
            }
            self.state.edit_lock = lock;
        }
        changed
    }

    /// Number of prompts currently marked executing. At most 1 by invariant.
    pub fn executing_count(&self) -> usize {
        let active = usize::from(self.active_prompt.is_some());
        let stray = self
            .prompt_queue
            .iter()
            .filter(|p| p.status == crate::prompt::PromptStatus::Executing)
            .count();
        active + stray
    }

    /// Order nested collections deterministically: users by join time,
    /// clients by connect time, prompts by priority rank then age.
    /// Stores normalize on write so round-trips compare equal.
    pub fn normalize(&mut self) {
        self.users.sort_by_key(|u| u.joined_at_ms);
        self.clients.sort_by_key(|c| c.connected_at_ms);
        self.prompt_queue.sort_by_key(|p| (p.priority, p.created_at_ms));
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
