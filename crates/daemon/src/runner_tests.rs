// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ens_core::{AgentStatus, ExecOutput, SessionId, SpawnAgentInput, TransitionCtx};
use ens_provider::FakeProvider;

fn agent() -> Agent {
    let input = SpawnAgentInput::new(SessionId::from_string("ses_parent"), "make check")
        .repository("org/repo");
    Agent::new(input, "ws-1", 1_000)
}

#[tokio::test]
async fn initialize_creates_a_sandbox_for_the_agent() {
    let provider = Arc::new(FakeProvider::new());
    let runner = SandboxAgentRunner::new(provider.clone());

    let sandbox_id =
        runner.initialize(&agent(), CancellationToken::new()).await.unwrap();

    let sandbox = provider.get(&sandbox_id).await.unwrap();
    assert_eq!(sandbox.repository, "org/repo");
    assert_eq!(sandbox.project_id, "ses_parent");
}

#[tokio::test]
async fn initialize_honors_cancellation() {
    let provider = Arc::new(FakeProvider::new());
    provider.set_create_delay(std::time::Duration::from_secs(3_600));
    let runner = SandboxAgentRunner::new(provider);

    let token = CancellationToken::new();
    token.cancel();
    let err = runner.initialize(&agent(), token).await.unwrap_err();
    assert!(err.to_string().contains("cancelled"));
}

#[tokio::test]
async fn run_executes_the_task_in_the_sandbox() {
    let provider = Arc::new(FakeProvider::new());
    let runner = SandboxAgentRunner::new(provider.clone());

    let mut agent = agent();
    let sandbox_id = runner.initialize(&agent, CancellationToken::new()).await.unwrap();
    agent.transition(
        AgentStatus::Initializing,
        TransitionCtx::default(),
        2_000,
    );
    agent.transition(
        AgentStatus::Running,
        TransitionCtx::with_sandbox(sandbox_id),
        3_000,
    );

    let output = runner.run(&agent, CancellationToken::new()).await.unwrap();
    assert_eq!(output, "sh -c make check");
}

#[tokio::test]
async fn run_maps_nonzero_exit_to_failure() {
    let provider = Arc::new(FakeProvider::new());
    let runner = SandboxAgentRunner::new(provider.clone());

    let mut agent = agent();
    let sandbox_id = runner.initialize(&agent, CancellationToken::new()).await.unwrap();
    agent.transition(AgentStatus::Initializing, TransitionCtx::default(), 2_000);
    agent.transition(AgentStatus::Running, TransitionCtx::with_sandbox(sandbox_id), 3_000);

    provider.push_exec_result(ExecOutput {
        stdout: String::new(),
        stderr: "make: *** [check] Error 2".to_string(),
        exit_code: 2,
    });

    let err = runner.run(&agent, CancellationToken::new()).await.unwrap_err();
    assert!(err.to_string().contains("code 2"));
}

#[tokio::test]
async fn run_without_sandbox_fails() {
    let provider = Arc::new(FakeProvider::new());
    let runner = SandboxAgentRunner::new(provider);
    let err = runner.run(&agent(), CancellationToken::new()).await.unwrap_err();
    assert!(err.to_string().contains("no sandbox"));
}
