// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::actor::SessionActors;
use crate::bus::EventBus;
use crate::multiplayer::{CreateSessionInput, JoinInput, SessionConfig, SessionManager};
use crate::queue::{PromptQueues, QueueConfig};
use crate::scheduler::{AgentRunner, RunnerError};
use async_trait::async_trait;
use ens_core::{Agent, FakeClock, SandboxId, SessionId};
use ens_provider::{FakeProvider, SandboxProvider};
use ens_storage::MemoryStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Store + actors + manager + queues against fakes.
pub(crate) struct TestBed {
    pub clock: FakeClock,
    pub bus: EventBus<FakeClock>,
    pub store: Arc<MemoryStore>,
    pub actors: Arc<SessionActors<FakeClock>>,
    pub sessions: Arc<SessionManager<FakeClock>>,
    pub queues: Arc<PromptQueues<FakeClock>>,
    pub provider: Arc<FakeProvider>,
}

impl TestBed {
    pub fn new() -> Self {
        Self::with_configs(SessionConfig::default(), QueueConfig::default())
    }

    pub fn with_configs(session: SessionConfig, queue: QueueConfig) -> Self {
        let clock = FakeClock::new();
        let bus = EventBus::new(clock.clone());
        let store = Arc::new(MemoryStore::new());
        let actors =
            SessionActors::new(store.clone() as Arc<dyn ens_storage::SessionStore>, bus.clone());
        let sessions = SessionManager::new(
            store.clone() as Arc<dyn ens_storage::SessionStore>,
            Arc::clone(&actors),
            bus.clone(),
            clock.clone(),
            session,
        );
        let queues = PromptQueues::new(Arc::clone(&actors), clock.clone(), queue);
        let provider = Arc::new(FakeProvider::new());
        Self { clock, bus, store, actors, sessions, queues, provider }
    }

    /// A created session with one joined user.
    pub async fn session_with_user(&self, user: &str) -> SessionId {
        let session = self.sessions.create(CreateSessionInput::default()).await.unwrap();
        self.sessions.join(&session.id, JoinInput::new(user, user)).await.unwrap();
        session.id
    }
}

/// Configurable [`AgentRunner`] tracking observed run concurrency.
pub(crate) struct ScriptedRunner {
    pub init_delay: Duration,
    pub run_delay: Duration,
    pub init_error: Option<String>,
    pub run_error: Option<String>,
    /// Keep initializing even after the token fires (cancel-wins path).
    pub ignore_cancel_in_init: bool,
    /// Create real sandboxes on this provider during init.
    pub provider: Option<Arc<FakeProvider>>,
    pub(crate) current: AtomicUsize,
    pub(crate) max_seen: AtomicUsize,
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self {
            init_delay: Duration::ZERO,
            run_delay: Duration::from_millis(50),
            init_error: None,
            run_error: None,
            ignore_cancel_in_init: false,
            provider: None,
            current: AtomicUsize::new(0),
            max_seen: AtomicUsize::new(0),
        }
    }
}

impl ScriptedRunner {
    /// Highest number of concurrently running agents observed.
    pub fn max_concurrent_seen(&self) -> usize {
        self.max_seen.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentRunner for ScriptedRunner {
    async fn initialize(
        &self,
        agent: &Agent,
        cancel: CancellationToken,
    ) -> Result<SandboxId, RunnerError> {
        if self.ignore_cancel_in_init {
            tokio::time::sleep(self.init_delay).await;
        } else {
            tokio::select! {
                _ = tokio::time::sleep(self.init_delay) => {}
                _ = cancel.cancelled() => return Err("init cancelled".into()),
            }
        }
        if let Some(error) = &self.init_error {
            return Err(error.clone().into());
        }
        match &self.provider {
            Some(provider) => {
                let input = ens_core::CreateSandboxInput::new(
                    "agent-project",
                    agent.parent_session_id.as_str(),
                );
                let sandbox =
                    provider.create(input).await.map_err(|e| RunnerError(e.to_string()))?;
                Ok(sandbox.id)
            }
            None => Ok(SandboxId::generate()),
        }
    }

    async fn run(&self, _agent: &Agent, cancel: CancellationToken) -> Result<String, RunnerError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
        let result = tokio::select! {
            _ = tokio::time::sleep(self.run_delay) => match &self.run_error {
                Some(error) => Err(RunnerError(error.clone())),
                None => Ok("done".to_string()),
            },
            _ = cancel.cancelled() => Err("run cancelled".into()),
        };
        self.current.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Poll until `check` passes or the deadline expires.
pub(crate) async fn wait_for(mut check: impl FnMut() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
