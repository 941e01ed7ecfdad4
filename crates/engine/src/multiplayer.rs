// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multiplayer session manager.
//!
//! Holds the session aggregate through the store; every mutation goes
//! through the per-session actor so versioning is a simple +1 after each
//! state-changing operation. Each operation emits exactly one event.

use crate::actor::SessionActors;
use crate::bus::EventBus;
use crate::error::{retry, EngineError, DEFAULT_RETRY_ATTEMPTS};
use ens_core::{
    Client, ClientId, ClientKind, Clock, Cursor, Event, SandboxId, Session, SessionId,
    SessionState, StatePatch, User, UserId,
};
use ens_storage::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Presence colors assigned to users round-robin at join time.
const USER_COLORS: &[&str] =
    &["#7aa2f7", "#9ece6a", "#f7768e", "#e0af68", "#bb9af7", "#7dcfff", "#ff9e64", "#73daca"];

/// Session manager tunables.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub max_users_per_session: usize,
    pub max_clients_per_user: usize,
    /// Edit lock auto-expires this long after the last keepalive.
    pub lock_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_users_per_session: 8,
            max_clients_per_user: 4,
            lock_timeout: Duration::from_secs(60),
        }
    }
}

/// Input for creating a session.
#[derive(Debug, Clone, Default)]
pub struct CreateSessionInput {
    /// Explicit id; generated when absent.
    pub id: Option<SessionId>,
    /// Downstream work session id; generated when absent.
    pub work_session_id: Option<String>,
}

/// Input for joining a user to a session.
#[derive(Debug, Clone)]
pub struct JoinInput {
    pub user_id: UserId,
    pub display_name: String,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

impl JoinInput {
    pub fn new(user_id: impl Into<UserId>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            email: None,
            avatar: None,
        }
    }

    ens_core::optional_setters! {
        email: String,
        avatar: String,
    }
}

/// The session aggregate's public operations (§multiplayer).
pub struct SessionManager<C: Clock> {
    store: Arc<dyn SessionStore>,
    actors: Arc<SessionActors<C>>,
    bus: EventBus<C>,
    clock: C,
    config: SessionConfig,
    /// Serializes creation; actors only exist for already-created sessions.
    create_lock: tokio::sync::Mutex<()>,
}

impl<C: Clock> SessionManager<C> {
    pub fn new(
        store: Arc<dyn SessionStore>,
        actors: Arc<SessionActors<C>>,
        bus: EventBus<C>,
        clock: C,
        config: SessionConfig,
    ) -> Arc<Self> {
        Arc::new(Self { store, actors, bus, clock, config, create_lock: tokio::sync::Mutex::new(()) })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Materialize a new session with empty collections, `git_sync =
    /// pending`, `agent_activity = idle`, `version = 0`.
    pub async fn create(&self, input: CreateSessionInput) -> Result<Session, EngineError> {
        let _guard = self.create_lock.lock().await;
        let id = input.id.unwrap_or_else(SessionId::generate);
        if self.store.has(&id).await? {
            return Err(EngineError::Conflict(format!("session {id} already exists")));
        }
        let work_session_id =
            input.work_session_id.unwrap_or_else(|| format!("ws_{}", nanoid::nanoid!(16)));
        let session = Session::new(id.clone(), work_session_id, self.clock.epoch_ms());
        let store = &self.store;
        retry("store.set", DEFAULT_RETRY_ATTEMPTS, || {
            let session = session.clone();
            async move { store.set(session).await.map_err(EngineError::from) }
        })
        .await?;
        info!(session = %id, "session created");
        self.bus.publish(Event::SessionCreated { session_id: id });
        Ok(session)
    }

    /// Read a consistent snapshot.
    pub async fn get(&self, id: &SessionId) -> Result<Session, EngineError> {
        self.actors.read(id).await
    }

    pub async fn list(&self) -> Result<Vec<Session>, EngineError> {
        Ok(self.store.all().await?)
    }

    /// Destroy a session: cancel the queued prompts, stop the actor,
    /// delete the aggregate.
    pub async fn delete(&self, id: &SessionId) -> Result<(), EngineError> {
        let now_ms = self.clock.epoch_ms();
        let cleared: usize = self
            .actors
            .update(id, move |session| {
                let cleared = session.clear_prompt_queue(now_ms);
                if cleared.is_empty() {
                    return Ok((0, vec![]));
                }
                let event = Event::PromptQueueCleared {
                    session_id: session.id.clone(),
                    count: cleared.len(),
                };
                Ok((cleared.len(), vec![event]))
            })
            .await?;
        self.actors.stop(id);
        self.store.delete(id).await?;
        info!(session = %id, cleared, "session deleted");
        self.bus.publish(Event::SessionDeleted { session_id: id.clone() });
        Ok(())
    }

    /// Add a user. Idempotent for an already-joined user id.
    pub async fn join(&self, id: &SessionId, input: JoinInput) -> Result<User, EngineError> {
        let now_ms = self.clock.epoch_ms();
        let max_users = self.config.max_users_per_session;
        self.actors
            .update(id, move |session| {
                let color = USER_COLORS[session.users.len() % USER_COLORS.len()];
                let mut user = User::new(input.user_id, input.display_name, now_ms).color(color);
                user.email = input.email;
                user.avatar = input.avatar;

                let user_id = user.id.clone();
                let added = session.join_user(user, max_users)?;
                // Fetch the authoritative record (the original on re-join).
                let joined = session
                    .user(&user_id)
                    .cloned()
                    .ok_or_else(|| EngineError::Fatal("joined user missing".to_string()))?;
                let events = if added {
                    vec![Event::UserJoined { session_id: session.id.clone(), user_id }]
                } else {
                    vec![]
                };
                Ok((joined, events))
            })
            .await
    }

    /// Remove a user, their clients, and any lock they hold.
    pub async fn leave(&self, id: &SessionId, user_id: &UserId) -> Result<(), EngineError> {
        let user_id = user_id.clone();
        self.actors
            .update(id, move |session| {
                let removed = session.leave_user(&user_id);
                let events = if removed {
                    vec![Event::UserLeft { session_id: session.id.clone(), user_id }]
                } else {
                    vec![]
                };
                Ok(((), events))
            })
            .await
    }

    /// Bind a new client connection to a present user.
    pub async fn connect(
        &self,
        id: &SessionId,
        user_id: &UserId,
        kind: ClientKind,
    ) -> Result<Client, EngineError> {
        let now_ms = self.clock.epoch_ms();
        let max_clients = self.config.max_clients_per_user;
        let user_id = user_id.clone();
        self.actors
            .update(id, move |session| {
                let client = Client::new(user_id.clone(), kind, now_ms);
                session.connect_client(client.clone(), max_clients)?;
                let event = Event::ClientConnected {
                    session_id: session.id.clone(),
                    client_id: client.id.clone(),
                    user_id,
                    kind,
                };
                Ok((client, vec![event]))
            })
            .await
    }

    pub async fn disconnect(&self, id: &SessionId, client_id: &ClientId) -> Result<(), EngineError> {
        let now_ms = self.clock.epoch_ms();
        let client_id = client_id.clone();
        self.actors
            .update(id, move |session| {
                let removed = session.disconnect_client(&client_id, now_ms);
                let events = if removed {
                    vec![Event::ClientDisconnected { session_id: session.id.clone(), client_id }]
                } else {
                    vec![]
                };
                Ok(((), events))
            })
            .await
    }

    pub async fn update_cursor(
        &self,
        id: &SessionId,
        user_id: &UserId,
        cursor: Option<Cursor>,
    ) -> Result<(), EngineError> {
        let now_ms = self.clock.epoch_ms();
        let user_id = user_id.clone();
        self.actors
            .update(id, move |session| {
                session.update_cursor(&user_id, cursor, now_ms)?;
                let event = Event::CursorMoved { session_id: session.id.clone(), user_id };
                Ok(((), vec![event]))
            })
            .await
    }

    /// Acquire (or keepalive) the exclusive edit lock.
    pub async fn acquire_lock(&self, id: &SessionId, user_id: &UserId) -> Result<(), EngineError> {
        let now_ms = self.clock.epoch_ms();
        let timeout_ms = self.config.lock_timeout.as_millis() as u64;
        let user_id = user_id.clone();
        self.actors
            .update(id, move |session| {
                session.acquire_lock(&user_id, now_ms, timeout_ms)?;
                let event = Event::LockAcquired { session_id: session.id.clone(), user_id };
                Ok(((), vec![event]))
            })
            .await
    }

    /// Release the lock. No-op unless held by `user_id`.
    pub async fn release_lock(&self, id: &SessionId, user_id: &UserId) -> Result<(), EngineError> {
        let user_id = user_id.clone();
        self.actors
            .update(id, move |session| {
                let released = session.release_lock(&user_id);
                let events = if released {
                    vec![Event::LockReleased { session_id: session.id.clone(), user_id }]
                } else {
                    vec![]
                };
                Ok(((), events))
            })
            .await
    }

    /// Whether `user_id` may mutate the working tree right now.
    pub async fn can_edit(&self, id: &SessionId, user_id: &UserId) -> Result<bool, EngineError> {
        let session = self.actors.read(id).await?;
        Ok(session.can_edit(user_id, self.clock.epoch_ms()))
    }

    /// Patch shared state. Emits `state:changed` carrying the post-write
    /// values; the version bump is exactly 1.
    pub async fn update_state(
        &self,
        id: &SessionId,
        patch: StatePatch,
    ) -> Result<SessionState, EngineError> {
        self.actors
            .update(id, move |session| {
                // A lock may only name a present user.
                if let Some(Some(holder)) = &patch.edit_lock {
                    if session.user(holder).is_none() {
                        return Err(EngineError::Fatal(format!(
                            "edit lock names absent user {holder}"
                        )));
                    }
                }
                let changed = session.apply_patch(patch);
                if !changed {
                    return Ok((session.state.clone(), vec![]));
                }
                // The actor applies the +1 after this closure; the event
                // must carry the persisted version.
                let event = Event::StateChanged {
                    session_id: session.id.clone(),
                    git_sync: session.state.git_sync,
                    agent_activity: session.state.agent_activity,
                    version: session.state.version + 1,
                };
                let mut state = session.state.clone();
                state.version += 1;
                Ok((state, vec![event]))
            })
            .await
    }

    /// Bind (or unbind) the session's execution sandbox.
    pub async fn bind_sandbox(
        &self,
        id: &SessionId,
        sandbox_id: Option<SandboxId>,
    ) -> Result<(), EngineError> {
        self.actors
            .update(id, move |session| {
                if session.sandbox_id == sandbox_id {
                    return Ok(((), vec![]));
                }
                session.sandbox_id = sandbox_id.clone();
                let event =
                    Event::SandboxBound { session_id: session.id.clone(), sandbox_id };
                Ok(((), vec![event]))
            })
            .await
    }

    /// Relay a working-tree-changes signal from the tool layer onto the
    /// bus. The aggregate itself is untouched.
    pub fn notify_has_changes(&self, id: &SessionId) {
        self.bus.publish(Event::SessionHasChanges { session_id: id.clone() });
    }
}

#[cfg(test)]
#[path = "multiplayer_tests.rs"]
mod tests;
