// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Warm pool of pre-warmed sandboxes.
//!
//! Keyed by `(repository, branch?, image_tag?)`. Claims lift one sandbox
//! out atomically; misses trigger asynchronous replenishment. Warm-start
//! jobs count against the per-key cap while in flight, so
//! `available + warming ≤ max_per_key` holds at all times.

use crate::bus::EventBus;
use crate::error::{retry, EngineError, DEFAULT_RETRY_ATTEMPTS};
use ens_core::{Clock, CreateSandboxInput, Event, PoolKey, Sandbox};
use ens_provider::SandboxProvider;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Warm pool tunables.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Cap on `available + warming` per key.
    pub max_per_key: usize,
    /// Replenish target for typing-triggered and miss-triggered warming.
    pub high_water: usize,
    /// Warm sandboxes older than this are discarded at claim time.
    pub ttl: Duration,
    /// Warm-start jobs exceeding this are abandoned.
    pub warm_timeout: Duration,
    /// Minimum spacing between typing-triggered replenishments per key.
    pub typing_debounce: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_per_key: 5,
            high_water: 2,
            ttl: Duration::from_secs(30 * 60),
            warm_timeout: Duration::from_secs(120),
            typing_debounce: Duration::from_secs(10),
        }
    }
}

/// Pool population for one key (or aggregated).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PoolStats {
    pub available: usize,
    pub warming: usize,
    pub total: usize,
}

/// Outcome of a claim attempt.
#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    pub sandbox: Option<Sandbox>,
    /// "hit" or "miss".
    pub reason: &'static str,
}

struct WarmEntry {
    sandbox: Sandbox,
    warmed_at: Instant,
}

#[derive(Default)]
struct Slot {
    available: VecDeque<WarmEntry>,
    warming: usize,
    last_typing: Option<Instant>,
}

/// Keyed pool of pre-warmed sandboxes.
pub struct WarmPool<C: Clock> {
    provider: Arc<dyn SandboxProvider>,
    bus: EventBus<C>,
    clock: C,
    config: PoolConfig,
    slots: Mutex<HashMap<PoolKey, Slot>>,
}

impl<C: Clock> WarmPool<C> {
    pub fn new(
        provider: Arc<dyn SandboxProvider>,
        bus: EventBus<C>,
        clock: C,
        config: PoolConfig,
    ) -> Arc<Self> {
        Arc::new(Self { provider, bus, clock, config, slots: Mutex::new(HashMap::new()) })
    }

    /// Atomically lift one warm sandbox out of the pool.
    ///
    /// On a miss the pool replenishes asynchronously toward the high-water
    /// mark and the caller falls back to a cold create.
    pub fn claim(self: &Arc<Self>, key: &PoolKey, project_id: &str) -> ClaimOutcome {
        let now = self.clock.now();
        let claimed = {
            let mut slots = self.slots.lock();
            let slot = slots.entry(key.clone()).or_default();
            let mut claimed = None;
            while let Some(entry) = slot.available.pop_front() {
                if now.duration_since(entry.warmed_at) >= self.config.ttl {
                    let provider = Arc::clone(&self.provider);
                    let stale = entry.sandbox;
                    tokio::spawn(async move {
                        if let Err(e) = provider.terminate(&stale.id).await {
                            debug!(sandbox = %stale.id, error = %e, "failed to drop stale warm sandbox");
                        }
                    });
                    continue;
                }
                claimed = Some(entry.sandbox);
                break;
            }
            claimed
        };

        match claimed {
            Some(sandbox) => {
                self.bus.publish(Event::PoolClaimed {
                    key: key.clone(),
                    sandbox_id: sandbox.id.clone(),
                });
                ClaimOutcome { sandbox: Some(sandbox), reason: "hit" }
            }
            None => {
                self.bus.publish(Event::PoolMiss { key: key.clone() });
                self.replenish(key, project_id, self.config.high_water);
                ClaimOutcome { sandbox: None, reason: "miss" }
            }
        }
    }

    /// Return a still-healthy sandbox to the pool, subject to the cap.
    /// The pool key is derived from the sandbox's own configuration.
    pub fn release(self: &Arc<Self>, sandbox: Sandbox) {
        if !sandbox.status.is_running() {
            return;
        }
        let key = PoolKey {
            repository: sandbox.repository.clone(),
            branch: sandbox.branch.clone(),
            image_tag: sandbox.image_tag.clone(),
        };
        let accepted = {
            let mut slots = self.slots.lock();
            let slot = slots.entry(key.clone()).or_default();
            if slot.available.len() + slot.warming >= self.config.max_per_key {
                false
            } else {
                slot.available
                    .push_back(WarmEntry { sandbox: sandbox.clone(), warmed_at: self.clock.now() });
                true
            }
        };
        if accepted {
            self.bus.publish(Event::PoolReleased { key, sandbox_id: sandbox.id });
        } else {
            let provider = Arc::clone(&self.provider);
            tokio::spawn(async move {
                let _ = provider.terminate(&sandbox.id).await;
            });
        }
    }

    /// A user started typing against `key`: eagerly warm toward the
    /// high-water mark. Rate-limited per key to avoid thrash.
    pub fn on_typing(self: &Arc<Self>, key: &PoolKey, project_id: &str) {
        let now = self.clock.now();
        {
            let mut slots = self.slots.lock();
            let slot = slots.entry(key.clone()).or_default();
            if let Some(last) = slot.last_typing {
                if now.duration_since(last) < self.config.typing_debounce {
                    return;
                }
            }
            slot.last_typing = Some(now);
        }
        self.replenish(key, project_id, self.config.high_water);
    }

    /// Launch warm-start jobs until `available + warming` reaches the
    /// target (bounded by the per-key cap).
    fn replenish(self: &Arc<Self>, key: &PoolKey, project_id: &str, target: usize) {
        let jobs = {
            let mut slots = self.slots.lock();
            let slot = slots.entry(key.clone()).or_default();
            let target = target.min(self.config.max_per_key);
            let mut jobs = 0;
            while slot.available.len() + slot.warming < target {
                slot.warming += 1;
                jobs += 1;
            }
            jobs
        };
        for _ in 0..jobs {
            let this = Arc::clone(self);
            let key = key.clone();
            let project_id = project_id.to_string();
            tokio::spawn(async move {
                this.warm_one(key, project_id).await;
            });
        }
    }

    async fn warm_one(self: &Arc<Self>, key: PoolKey, project_id: String) {
        let mut input = CreateSandboxInput::new(project_id, key.repository.clone());
        input.branch = key.branch.clone();
        input.image_tag = key.image_tag.clone();

        let provider = &self.provider;
        let create = retry("provider.create", DEFAULT_RETRY_ATTEMPTS, || {
            let input = input.clone();
            async move { provider.create(input).await.map_err(EngineError::from) }
        });
        let result = tokio::time::timeout(self.config.warm_timeout, create).await;

        let mut slots = self.slots.lock();
        let slot = slots.entry(key.clone()).or_default();
        slot.warming = slot.warming.saturating_sub(1);
        match result {
            Ok(Ok(sandbox)) => {
                slot.available
                    .push_back(WarmEntry { sandbox: sandbox.clone(), warmed_at: self.clock.now() });
                drop(slots);
                self.bus.publish(Event::PoolReplenished { key, sandbox_id: sandbox.id });
            }
            Ok(Err(e)) => {
                warn!(key = %key, error = %e, "warm start failed");
            }
            Err(_) => {
                warn!(key = %key, timeout_s = self.config.warm_timeout.as_secs(), "warm start abandoned");
            }
        }
    }

    /// Population for one key.
    pub fn stats(&self, key: &PoolKey) -> PoolStats {
        let slots = self.slots.lock();
        match slots.get(key) {
            Some(slot) => PoolStats {
                available: slot.available.len(),
                warming: slot.warming,
                total: slot.available.len() + slot.warming,
            },
            None => PoolStats::default(),
        }
    }

    /// Population across every key.
    pub fn total_stats(&self) -> PoolStats {
        let slots = self.slots.lock();
        let mut stats = PoolStats::default();
        for slot in slots.values() {
            stats.available += slot.available.len();
            stats.warming += slot.warming;
        }
        stats.total = stats.available + stats.warming;
        stats
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
