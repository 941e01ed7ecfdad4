// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent scheduler: admission control plus a work-conserving dispatcher.
//!
//! Wraps a spawner with bounded execution. The dispatcher is a single
//! cooperative loop guarded by a try-lock, so it is never reentrant;
//! agent completions re-enter it to keep the pipeline full. Callbacks run
//! in their own tasks so a panic converts to `Fail` instead of taking the
//! dispatcher down, and are raced against the configured timeouts with a
//! cancellation token the callee is expected to honor.

use crate::error::EngineError;
use crate::spawner::AgentSpawner;
use async_trait::async_trait;
use ens_core::{Agent, AgentId, Clock, SandboxId, SpawnAgentInput};
use ens_provider::SandboxProvider;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Failure reported by a runner callback.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct RunnerError(pub String);

impl From<String> for RunnerError {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RunnerError {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// User-supplied agent execution callbacks.
///
/// Both callbacks receive a cancellation token and must return promptly
/// once it fires; the scheduler's timeouts are the backstop when they
/// don't.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Provision the agent's execution environment; returns its sandbox.
    async fn initialize(
        &self,
        agent: &Agent,
        cancel: CancellationToken,
    ) -> Result<SandboxId, RunnerError>;

    /// Run the agent's task to completion; returns its output.
    async fn run(&self, agent: &Agent, cancel: CancellationToken) -> Result<String, RunnerError>;
}

/// Scheduler tunables.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_concurrent: usize,
    pub max_queued: usize,
    pub max_per_session: usize,
    pub init_timeout: Duration,
    pub run_timeout: Duration,
    /// When set, spawning schedules the dispatcher automatically.
    pub auto_process: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            max_queued: 32,
            max_per_session: 3,
            init_timeout: Duration::from_secs(30),
            run_timeout: Duration::from_secs(600),
            auto_process: true,
        }
    }
}

/// Point-in-time population counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub queued: usize,
    pub initializing: usize,
    pub running: usize,
}

/// Resource-bounded dispatcher over an [`AgentSpawner`].
pub struct AgentScheduler<C: Clock> {
    spawner: Arc<AgentSpawner<C>>,
    runner: Arc<dyn AgentRunner>,
    provider: Arc<dyn SandboxProvider>,
    config: SchedulerConfig,
    /// Dispatcher serialization: held for the whole pass, try-locked so a
    /// concurrent schedule request is a no-op instead of a second loop.
    dispatch_gate: tokio::sync::Mutex<()>,
    tokens: Mutex<HashMap<AgentId, CancellationToken>>,
}

impl<C: Clock> AgentScheduler<C> {
    pub fn new(
        spawner: Arc<AgentSpawner<C>>,
        runner: Arc<dyn AgentRunner>,
        provider: Arc<dyn SandboxProvider>,
        config: SchedulerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            spawner,
            runner,
            provider,
            config,
            dispatch_gate: tokio::sync::Mutex::new(()),
            tokens: Mutex::new(HashMap::new()),
        })
    }

    pub fn spawner(&self) -> &Arc<AgentSpawner<C>> {
        &self.spawner
    }

    /// Admit and create an agent.
    ///
    /// Rejects with `ResourceExhausted` when the queue is full or the
    /// parent session already has `max_per_session` non-terminal agents.
    pub fn spawn(self: &Arc<Self>, input: SpawnAgentInput) -> Result<Agent, EngineError> {
        let counts = self.spawner.counts();
        if counts.queued >= self.config.max_queued {
            return Err(EngineError::ResourceExhausted(format!(
                "agent queue is full ({} queued)",
                counts.queued
            )));
        }
        let active = self.spawner.active_for_session(&input.parent_session_id);
        if active >= self.config.max_per_session {
            return Err(EngineError::ResourceExhausted(format!(
                "session {} has {active} active agents",
                input.parent_session_id
            )));
        }

        let agent = self.spawner.spawn(input);
        if self.config.auto_process {
            self.schedule();
        }
        Ok(agent)
    }

    /// Schedule a dispatcher pass. Cheap to call from anywhere; collapses
    /// into a no-op when a pass is already running.
    pub fn schedule(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.dispatch().await;
        });
    }

    /// One dispatcher pass: admit queued agents FIFO while capacity lasts.
    pub async fn dispatch(self: &Arc<Self>) {
        let Ok(_guard) = self.dispatch_gate.try_lock() else {
            return;
        };
        loop {
            let counts = self.spawner.counts();
            if counts.initializing + counts.running >= self.config.max_concurrent {
                return;
            }
            let Some(agent) = self.spawner.next_queued() else {
                return;
            };
            if !self.spawner.start_initializing(&agent.id) {
                // Cancelled while queued; skip it.
                continue;
            }
            let token = CancellationToken::new();
            self.tokens.lock().insert(agent.id.clone(), token.clone());

            let this = Arc::clone(self);
            tokio::spawn(async move {
                this.drive_agent(agent, token).await;
            });
        }
    }

    /// Cancel an agent from any non-terminal state. Signals the callback's
    /// token; an in-flight callback gets a bounded grace period via the
    /// init/run timeouts. Returns false when already terminal (or unknown).
    pub fn cancel(&self, id: &AgentId) -> bool {
        if let Some(token) = self.tokens.lock().get(id) {
            token.cancel();
        }
        self.spawner.cancel(id)
    }

    pub fn get(&self, id: &AgentId) -> Option<Agent> {
        self.spawner.get(id)
    }

    pub fn stats(&self) -> SchedulerStats {
        let counts = self.spawner.counts();
        SchedulerStats {
            queued: counts.queued,
            initializing: counts.initializing,
            running: counts.running,
        }
    }

    /// Run one agent through initialize and run, then re-enter dispatch.
    async fn drive_agent(self: &Arc<Self>, agent: Agent, token: CancellationToken) {
        let id = agent.id.clone();
        if let Some(sandbox_id) = self.initialize_agent(&agent, &token).await {
            // Cancel wins: a sandbox produced by a cancelled init is
            // terminated, never bound.
            if self.spawner.start_running(&id, sandbox_id.clone()) {
                if let Some(current) = self.spawner.get(&id) {
                    self.run_agent(&current, &token).await;
                }
            } else {
                debug!(agent = %id, sandbox = %sandbox_id, "agent cancelled during init, dropping sandbox");
                if let Err(e) = self.provider.terminate(&sandbox_id).await {
                    warn!(agent = %id, error = %e, "failed to drop orphaned sandbox");
                }
            }
        }
        self.tokens.lock().remove(&id);
        self.schedule();
    }

    /// Initialize phase. Returns the sandbox on success; failures and
    /// timeouts transition the agent to `failed` and return `None`.
    async fn initialize_agent(
        &self,
        agent: &Agent,
        token: &CancellationToken,
    ) -> Option<SandboxId> {
        let callback = {
            let runner = Arc::clone(&self.runner);
            let agent = agent.clone();
            let token = token.clone();
            tokio::spawn(async move { runner.initialize(&agent, token).await })
        };
        let abort = callback.abort_handle();
        match tokio::time::timeout(self.config.init_timeout, callback).await {
            Err(_) => {
                token.cancel();
                abort.abort();
                self.spawner.fail(&agent.id, "initialization timed out");
                None
            }
            Ok(Err(join_error)) => {
                self.spawner.fail(&agent.id, format!("initialize panicked: {join_error}"));
                None
            }
            Ok(Ok(Err(e))) => {
                self.spawner.fail(&agent.id, e.0);
                None
            }
            Ok(Ok(Ok(sandbox_id))) => Some(sandbox_id),
        }
    }

    /// Run phase: race the run callback against `run_timeout`.
    async fn run_agent(&self, agent: &Agent, token: &CancellationToken) {
        let callback = {
            let runner = Arc::clone(&self.runner);
            let agent = agent.clone();
            let token = token.clone();
            tokio::spawn(async move { runner.run(&agent, token).await })
        };
        let abort = callback.abort_handle();
        match tokio::time::timeout(self.config.run_timeout, callback).await {
            Err(_) => {
                token.cancel();
                abort.abort();
                self.spawner.fail(&agent.id, "run timed out");
            }
            Ok(Err(join_error)) => {
                self.spawner.fail(&agent.id, format!("run panicked: {join_error}"));
            }
            Ok(Ok(Err(e))) => {
                self.spawner.fail(&agent.id, e.0);
            }
            Ok(Ok(Ok(output))) => {
                // A cancelled agent never completes; the transition simply
                // fails against the terminal state.
                self.spawner.complete(&agent.id, output);
            }
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
