// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine wiring.
//!
//! Builds every subsystem against one store, one provider, and one bus,
//! then runs the background tasks: the event pump feeding the gate and
//! the lifecycle, and the periodic snapshot expiry sweep. Everything
//! winds down through one cancellation token.

use crate::actor::SessionActors;
use crate::bus::EventBus;
use crate::gate::GitSyncGate;
use crate::lifecycle::{LifecycleConfig, SnapshotLifecycle};
use crate::multiplayer::{SessionConfig, SessionManager};
use crate::pool::{PoolConfig, WarmPool};
use crate::queue::{PromptQueues, QueueConfig};
use crate::scheduler::{AgentRunner, AgentScheduler, SchedulerConfig};
use crate::snapshots::{SnapshotConfig, SnapshotManager};
use crate::spawner::AgentSpawner;
use ens_core::Clock;
use ens_provider::SandboxProvider;
use ens_storage::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Top-level engine tunables.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub session: SessionConfig,
    pub queue: QueueConfig,
    pub scheduler: SchedulerConfig,
    pub pool: PoolConfig,
    pub snapshot: SnapshotConfig,
    pub lifecycle: LifecycleConfig,
}

/// Interval between snapshot expiry sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// The orchestration core: every stateful subsystem, wired.
pub struct Engine<C: Clock> {
    pub bus: EventBus<C>,
    pub actors: Arc<SessionActors<C>>,
    pub sessions: Arc<SessionManager<C>>,
    pub queues: Arc<PromptQueues<C>>,
    pub gate: Arc<GitSyncGate<C>>,
    pub pool: Arc<WarmPool<C>>,
    pub snapshots: Arc<SnapshotManager<C>>,
    pub scheduler: Arc<AgentScheduler<C>>,
    pub lifecycle: Arc<SnapshotLifecycle<C>>,
    provider: Arc<dyn SandboxProvider>,
    shutdown: CancellationToken,
}

impl<C: Clock> Engine<C> {
    /// Wire the engine and start its background tasks.
    pub fn start(
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn SandboxProvider>,
        runner: Arc<dyn AgentRunner>,
        clock: C,
        config: EngineConfig,
    ) -> Arc<Self> {
        let bus = EventBus::new(clock.clone());
        let actors = SessionActors::new(Arc::clone(&store), bus.clone());
        let sessions = SessionManager::new(
            store,
            Arc::clone(&actors),
            bus.clone(),
            clock.clone(),
            config.session,
        );
        let queues = PromptQueues::new(Arc::clone(&actors), clock.clone(), config.queue);
        let gate = GitSyncGate::new(Arc::clone(&actors), bus.clone());
        let pool =
            WarmPool::new(Arc::clone(&provider), bus.clone(), clock.clone(), config.pool);
        let snapshots = SnapshotManager::new(
            Arc::clone(&provider),
            bus.clone(),
            clock.clone(),
            config.snapshot,
        );
        let spawner = AgentSpawner::new(clock.clone(), bus.clone());
        let scheduler =
            AgentScheduler::new(spawner, runner, Arc::clone(&provider), config.scheduler);
        let lifecycle = SnapshotLifecycle::new(
            Arc::clone(&snapshots),
            Arc::clone(&pool),
            Arc::clone(&provider),
            Arc::clone(&sessions),
            bus.clone(),
            clock.clone(),
            config.lifecycle,
        );

        let engine = Arc::new(Self {
            bus,
            actors,
            sessions,
            queues,
            gate,
            pool,
            snapshots,
            scheduler,
            lifecycle,
            provider,
            shutdown: CancellationToken::new(),
        });
        engine.spawn_pump();
        engine.spawn_sweeper();
        engine
    }

    /// The event pump: every bus envelope flows through the gate (sync
    /// wakeups) and the lifecycle (snapshot decisions).
    fn spawn_pump(self: &Arc<Self>) {
        let mut subscription = self.bus.subscribe();
        let gate = Arc::clone(&self.gate);
        let lifecycle = Arc::clone(&self.lifecycle);
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    envelope = subscription.next() => {
                        let Some(envelope) = envelope else { break };
                        gate.handle_event(&envelope.event);
                        lifecycle.handle_event(&envelope.event).await;
                    }
                }
            }
            info!("event pump stopped");
        });
    }

    fn spawn_sweeper(self: &Arc<Self>) {
        let lifecycle = Arc::clone(&self.lifecycle);
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(SWEEP_INTERVAL);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tick.tick() => {
                        let swept = lifecycle.sweep().await;
                        if swept > 0 {
                            info!(swept, "expired snapshots removed");
                        }
                    }
                }
            }
        });
    }

    /// The sandbox provider everything is wired against.
    pub fn provider(&self) -> &Arc<dyn SandboxProvider> {
        &self.provider
    }

    /// Stop background tasks and drain the actors.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.actors.shutdown();
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
