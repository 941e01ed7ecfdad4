// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent spawner: creation plus transition enforcement.
//!
//! A pure state machine over the agent map. It enforces the transition
//! table (core's `AgentStatus::can_transition`) and emits one typed event
//! per successful transition. Admission control (concurrency and
//! per-session caps) is the scheduler's concern, not the spawner's.

use crate::bus::EventBus;
use ens_core::{Agent, AgentId, AgentStatus, Clock, Event, SandboxId, SpawnAgentInput, TransitionCtx};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Non-terminal population counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpawnerCounts {
    pub queued: usize,
    pub initializing: usize,
    pub running: usize,
}

struct SpawnerInner {
    agents: HashMap<AgentId, Agent>,
    /// Spawn-order queue. Entries whose agent has left `queued` are
    /// skipped lazily at pop time.
    fifo: VecDeque<AgentId>,
}

/// Background-agent factory and status machine.
pub struct AgentSpawner<C: Clock> {
    clock: C,
    bus: EventBus<C>,
    inner: Mutex<SpawnerInner>,
}

impl<C: Clock> AgentSpawner<C> {
    pub fn new(clock: C, bus: EventBus<C>) -> Arc<Self> {
        Arc::new(Self {
            clock,
            bus,
            inner: Mutex::new(SpawnerInner { agents: HashMap::new(), fifo: VecDeque::new() }),
        })
    }

    /// Create an agent in `queued` and announce it.
    pub fn spawn(&self, input: SpawnAgentInput) -> Agent {
        let work_session_id = format!("ws_{}", nanoid::nanoid!(16));
        let agent = Agent::new(input, work_session_id, self.clock.epoch_ms());
        {
            let mut inner = self.inner.lock();
            inner.fifo.push_back(agent.id.clone());
            inner.agents.insert(agent.id.clone(), agent.clone());
        }
        self.bus.publish(Event::AgentSpawned {
            agent_id: agent.id.clone(),
            session_id: agent.parent_session_id.clone(),
        });
        agent
    }

    /// Attempt a status transition. Emits one `agent:status` event when it
    /// applies; returns false for unknown agents and invalid transitions.
    pub fn transition(&self, id: &AgentId, to: AgentStatus, ctx: TransitionCtx) -> bool {
        let event = {
            let mut inner = self.inner.lock();
            let Some(agent) = inner.agents.get_mut(id) else {
                return false;
            };
            if !agent.transition(to, ctx, self.clock.epoch_ms()) {
                return false;
            }
            Event::AgentStatusChanged {
                agent_id: agent.id.clone(),
                session_id: agent.parent_session_id.clone(),
                status: agent.status,
                error: agent.error.clone().filter(|_| to == AgentStatus::Failed),
            }
        };
        self.bus.publish(event);
        true
    }

    pub fn start_initializing(&self, id: &AgentId) -> bool {
        self.transition(id, AgentStatus::Initializing, TransitionCtx::default())
    }

    pub fn start_running(&self, id: &AgentId, sandbox_id: SandboxId) -> bool {
        self.transition(id, AgentStatus::Running, TransitionCtx::with_sandbox(sandbox_id))
    }

    pub fn complete(&self, id: &AgentId, output: impl Into<String>) -> bool {
        self.transition(id, AgentStatus::Completed, TransitionCtx::with_output(output))
    }

    pub fn fail(&self, id: &AgentId, error: impl Into<String>) -> bool {
        self.transition(id, AgentStatus::Failed, TransitionCtx::with_error(error))
    }

    /// Cancel from any non-terminal state.
    pub fn cancel(&self, id: &AgentId) -> bool {
        self.transition(id, AgentStatus::Cancelled, TransitionCtx::default())
    }

    pub fn get(&self, id: &AgentId) -> Option<Agent> {
        self.inner.lock().agents.get(id).cloned()
    }

    /// Defensive copy of every tracked agent.
    pub fn agents(&self) -> Vec<Agent> {
        self.inner.lock().agents.values().cloned().collect()
    }

    /// Oldest agent still in `queued`, in spawn order.
    pub fn next_queued(&self) -> Option<Agent> {
        let mut inner = self.inner.lock();
        while let Some(id) = inner.fifo.pop_front() {
            if let Some(agent) = inner.agents.get(&id) {
                if agent.status == AgentStatus::Queued {
                    return Some(agent.clone());
                }
            }
        }
        None
    }

    pub fn counts(&self) -> SpawnerCounts {
        let inner = self.inner.lock();
        let mut counts = SpawnerCounts::default();
        for agent in inner.agents.values() {
            match agent.status {
                AgentStatus::Queued => counts.queued += 1,
                AgentStatus::Initializing => counts.initializing += 1,
                AgentStatus::Running => counts.running += 1,
                _ => {}
            }
        }
        counts
    }

    /// Non-terminal agents belonging to one parent session.
    pub fn active_for_session(&self, session_id: &ens_core::SessionId) -> usize {
        self.inner
            .lock()
            .agents
            .values()
            .filter(|a| &a.parent_session_id == session_id && !a.status.is_terminal())
            .count()
    }

    /// Drop agents in terminal states. Returns how many were reclaimed.
    pub fn clear_terminated(&self) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.agents.len();
        inner.agents.retain(|_, a| !a.status.is_terminal());
        let reclaimed = before - inner.agents.len();
        let live: std::collections::HashSet<_> = inner.agents.keys().cloned().collect();
        inner.fifo.retain(|id| live.contains(id));
        reclaimed
    }
}

#[cfg(test)]
#[path = "spawner_tests.rs"]
mod tests;
