// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace-level integration specs.
//!
//! Drives the wired engine end to end against the in-memory store and the
//! fake provider: priority ordering, single-flight, authorization, the
//! git-sync gate, scheduler limits, and the hibernate/resume cycle.

use ens_core::{
    AgentActivity, AgentStatus, FakeClock, GitSyncStatus, Priority, SpawnAgentInput, StatePatch,
};
use ens_engine::{
    AgentRunner, CreateSessionInput, Engine, EngineConfig, JoinInput, RunnerError,
    SchedulerConfig,
};
use ens_provider::FakeProvider;
use ens_storage::MemoryStore;
use std::sync::Arc;
use std::time::Duration;

struct InstantRunner {
    run_delay: Duration,
}

#[async_trait::async_trait]
impl AgentRunner for InstantRunner {
    async fn initialize(
        &self,
        _agent: &ens_core::Agent,
        _cancel: tokio_util::sync::CancellationToken,
    ) -> Result<ens_core::SandboxId, RunnerError> {
        Ok(ens_core::SandboxId::generate())
    }

    async fn run(
        &self,
        _agent: &ens_core::Agent,
        _cancel: tokio_util::sync::CancellationToken,
    ) -> Result<String, RunnerError> {
        tokio::time::sleep(self.run_delay).await;
        Ok("done".to_string())
    }
}

fn engine_with(config: EngineConfig) -> (Arc<Engine<FakeClock>>, Arc<FakeProvider>, FakeClock) {
    let clock = FakeClock::new();
    let provider = Arc::new(FakeProvider::new());
    let engine = Engine::start(
        Arc::new(MemoryStore::new()),
        provider.clone(),
        Arc::new(InstantRunner { run_delay: Duration::from_millis(50) }),
        clock.clone(),
        config,
    );
    (engine, provider, clock)
}

async fn session_with_users(
    engine: &Arc<Engine<FakeClock>>,
    users: &[&str],
) -> ens_core::SessionId {
    let session = engine.sessions.create(CreateSessionInput::default()).await.unwrap();
    for user in users {
        engine.sessions.join(&session.id, JoinInput::new(*user, *user)).await.unwrap();
    }
    session.id
}

async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

// Scenario 1: priority interleaving.
#[tokio::test]
async fn priority_interleaving() {
    let (engine, _provider, clock) = engine_with(EngineConfig::default());
    let id = session_with_users(&engine, &["u1"]).await;
    let u = "u1".into();

    for (content, priority) in [
        ("A", Priority::Normal),
        ("B", Priority::High),
        ("C", Priority::Urgent),
        ("D", Priority::Normal),
    ] {
        engine.queues.add(&id, &u, content, priority).await.unwrap();
        clock.advance_ms(1);
    }

    let mut order = Vec::new();
    while let Some(prompt) = engine.queues.start_next(&id).await.unwrap() {
        order.push(prompt.content.clone());
        engine.queues.complete(&id).await.unwrap();
    }
    assert_eq!(order, ["C", "B", "A", "D"]);
}

// Scenario 2: single-flight execution.
#[tokio::test]
async fn single_flight() {
    let (engine, _provider, _clock) = engine_with(EngineConfig::default());
    let id = session_with_users(&engine, &["u1"]).await;
    let u = "u1".into();

    engine.queues.add(&id, &u, "first", Priority::Normal).await.unwrap();
    engine.queues.add(&id, &u, "second", Priority::Normal).await.unwrap();

    assert!(engine.queues.start_next(&id).await.unwrap().is_some());
    assert!(engine.queues.start_next(&id).await.unwrap().is_none());

    engine.queues.complete(&id).await.unwrap();
    let second = engine.queues.start_next(&id).await.unwrap().unwrap();
    assert_eq!(second.content, "second");
}

// Scenario 3: only the author may cancel.
#[tokio::test]
async fn cancel_authorization() {
    let (engine, _provider, _clock) = engine_with(EngineConfig::default());
    let id = session_with_users(&engine, &["u1", "u2"]).await;

    let prompt =
        engine.queues.add(&id, &"u1".into(), "p1", Priority::Normal).await.unwrap();

    assert!(!engine.queues.cancel(&id, &prompt.id, &"u2".into()).await.unwrap());
    assert!(engine.queues.cancel(&id, &prompt.id, &"u1".into()).await.unwrap());
    // Idempotence: cancelling again reports false.
    assert!(!engine.queues.cancel(&id, &prompt.id, &"u1".into()).await.unwrap());
}

// Scenario 4: the git-sync gate.
#[tokio::test]
async fn sync_gate_blocks_writes_until_synced() {
    let (engine, _provider, _clock) = engine_with(EngineConfig::default());
    let id = session_with_users(&engine, &["u1"]).await;

    // Reads are always admitted.
    engine.gate.admit(&id, "read").await.unwrap();

    // A write parks while sync is pending.
    let gate = Arc::clone(&engine.gate);
    let session_id = id.clone();
    let blocked = tokio::spawn(async move { gate.admit(&session_id, "edit").await });
    eventually(|| engine.gate.pending_count(&id) == 1).await;

    engine
        .sessions
        .update_state(&id, StatePatch::git_sync(GitSyncStatus::Synced))
        .await
        .unwrap();

    blocked.await.unwrap().unwrap();
    // At the admission instant the session was synced.
    let session = engine.sessions.get(&id).await.unwrap();
    assert_eq!(session.state.git_sync, GitSyncStatus::Synced);
}

// Scenario 5: scheduler limits.
#[tokio::test]
async fn scheduler_respects_concurrency_cap() {
    let config = EngineConfig {
        scheduler: SchedulerConfig { max_concurrent: 2, ..SchedulerConfig::default() },
        ..EngineConfig::default()
    };
    let (engine, _provider, _clock) = engine_with(config);
    let id = session_with_users(&engine, &["u1"]).await;

    let agents: Vec<_> = (0..3)
        .map(|i| {
            engine
                .scheduler
                .spawn(SpawnAgentInput::new(id.clone(), format!("task {i}")))
                .unwrap()
        })
        .collect();

    // While draining, running + initializing never exceeds 2.
    loop {
        let stats = engine.scheduler.stats();
        assert!(stats.initializing + stats.running <= 2, "{stats:?}");
        let done = agents.iter().all(|a| {
            engine.scheduler.get(&a.id).is_some_and(|a| a.status.is_terminal())
        });
        if done {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    for agent in agents {
        assert_eq!(engine.scheduler.get(&agent.id).unwrap().status, AgentStatus::Completed);
    }
}

// Scenario 6: snapshot on idle, resume on follow-up.
#[tokio::test]
async fn snapshot_and_resume_cycle() {
    let (engine, provider, clock) = engine_with(EngineConfig::default());
    let id = session_with_users(&engine, &["u1"]).await;

    // First prompt: a fresh sandbox is created and bound.
    let first = engine
        .lifecycle
        .on_follow_up_prompt(&id, "org/repo", Some("main"), "proj-1")
        .await
        .unwrap();
    assert_eq!(engine.sessions.get(&id).await.unwrap().sandbox_id, Some(first.clone()));

    // An edit task runs: busy, with changes, for at least 5 seconds.
    engine
        .sessions
        .update_state(&id, StatePatch::agent_activity(AgentActivity::Executing))
        .await
        .unwrap();
    eventually(|| engine.lifecycle.tracked_sessions() == 1).await;
    engine.sessions.notify_has_changes(&id);
    tokio::time::sleep(Duration::from_millis(20)).await;
    clock.advance(Duration::from_secs(6));

    engine
        .sessions
        .update_state(&id, StatePatch::agent_activity(AgentActivity::Idle))
        .await
        .unwrap();

    // The lifecycle snapshots the sandbox and hibernates the session.
    eventually(|| engine.snapshots.has_valid(&id)).await;
    eventually(|| provider.terminated().contains(&first)).await;
    assert!(engine.sessions.get(&id).await.unwrap().sandbox_id.is_none());

    // A follow-up prompt resumes from the snapshot into a new sandbox.
    let second = engine
        .lifecycle
        .on_follow_up_prompt(&id, "org/repo", Some("main"), "proj-1")
        .await
        .unwrap();
    assert_ne!(second, first);
    assert_eq!(engine.sessions.get(&id).await.unwrap().sandbox_id, Some(second));
}

// P2: every state write bumps the version by exactly one.
#[tokio::test]
async fn versions_increase_by_one_per_operation() {
    let (engine, _provider, _clock) = engine_with(EngineConfig::default());
    let id = session_with_users(&engine, &["u1"]).await;
    let u = "u1".into();

    let v0 = engine.sessions.get(&id).await.unwrap().state.version;
    engine.queues.add(&id, &u, "p", Priority::Normal).await.unwrap();
    assert_eq!(engine.sessions.get(&id).await.unwrap().state.version, v0 + 1);

    engine.sessions.acquire_lock(&id, &u).await.unwrap();
    assert_eq!(engine.sessions.get(&id).await.unwrap().state.version, v0 + 2);
}

// P9: store round-trip with deterministic ordering.
#[tokio::test]
async fn store_round_trip_is_deterministic() {
    let (engine, _provider, clock) = engine_with(EngineConfig::default());
    let id = session_with_users(&engine, &["u1", "u2"]).await;

    engine.queues.add(&id, &"u2".into(), "later", Priority::Normal).await.unwrap();
    clock.advance_ms(1);
    engine.queues.add(&id, &"u1".into(), "urgent", Priority::Urgent).await.unwrap();

    let session = engine.sessions.get(&id).await.unwrap();
    // Prompts come back priority-major, then age; users in join order.
    assert_eq!(session.prompt_queue[0].content, "urgent");
    assert_eq!(session.users[0].id, "u1");

    let reread = engine.sessions.get(&id).await.unwrap();
    assert_eq!(reread, session);
}
