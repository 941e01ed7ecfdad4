// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::handlers::dispatch;
use super::ListenCtx;
use crate::protocol::{ErrorKind, Request, Response};
use crate::runner::SandboxAgentRunner;
use ens_core::{ClientKind, CreateSandboxInput, ExecRequest, Priority, SystemClock};
use ens_engine::{Engine, EngineConfig};
use ens_provider::{FakeProvider, SandboxProvider};
use ens_storage::MemoryStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

fn ctx() -> (ListenCtx, Arc<FakeProvider>) {
    let store = Arc::new(MemoryStore::new());
    let provider = Arc::new(FakeProvider::new());
    let runner = SandboxAgentRunner::new(provider.clone() as Arc<dyn SandboxProvider>);
    let engine = Engine::start(
        store,
        provider.clone(),
        runner,
        SystemClock,
        EngineConfig::default(),
    );
    (
        ListenCtx { engine, start_time: Instant::now(), shutdown: Arc::new(Notify::new()) },
        provider,
    )
}

async fn create_session(ctx: &ListenCtx) -> ens_core::SessionId {
    let response = dispatch(
        ctx,
        Request::SessionCreate { id: None, work_session_id: None },
    )
    .await;
    let Response::Session { session } = response else {
        panic!("unexpected response: {response:?}");
    };
    let join = Request::Join {
        session_id: session.id.clone(),
        user_id: "u1".into(),
        display_name: "U One".to_string(),
        email: None,
        avatar: None,
    };
    assert!(matches!(dispatch(ctx, join).await, Response::User { .. }));
    session.id
}

#[tokio::test]
async fn ping_pongs() {
    let (ctx, _provider) = ctx();
    assert_eq!(dispatch(&ctx, Request::Ping).await, Response::Pong);
}

#[tokio::test]
async fn sandbox_create_exec_terminate_flow() {
    let (ctx, _provider) = ctx();

    let response = dispatch(
        &ctx,
        Request::SandboxCreate { input: CreateSandboxInput::new("proj-1", "org/repo") },
    )
    .await;
    let Response::Sandbox { sandbox } = response else {
        panic!("unexpected response: {response:?}");
    };

    let response = dispatch(
        &ctx,
        Request::SandboxExec {
            id: sandbox.id.clone(),
            request: ExecRequest::new(["echo", "hello"]),
        },
    )
    .await;
    let Response::Exec { output } = response else {
        panic!("unexpected response: {response:?}");
    };
    assert_eq!(output.exit_code, 0);

    assert_eq!(
        dispatch(&ctx, Request::SandboxTerminate { id: sandbox.id.clone() }).await,
        Response::Ok
    );
    let response = dispatch(&ctx, Request::SandboxGet { id: sandbox.id }).await;
    let Response::Sandbox { sandbox } = response else {
        panic!("unexpected response: {response:?}");
    };
    assert_eq!(sandbox.status, ens_core::SandboxStatus::Terminated);
}

#[tokio::test]
async fn missing_resources_map_to_not_found() {
    let (ctx, _provider) = ctx();
    let response =
        dispatch(&ctx, Request::SessionGet { session_id: "ses_missing".into() }).await;
    assert!(matches!(response, Response::Error { kind: ErrorKind::NotFound, .. }));

    let response = dispatch(&ctx, Request::SandboxGet { id: "sbx_missing".into() }).await;
    assert!(matches!(response, Response::Error { kind: ErrorKind::NotFound, .. }));
}

#[tokio::test]
async fn prompt_flow_drives_agent_activity() {
    let (ctx, _provider) = ctx();
    let session_id = create_session(&ctx).await;

    let add = Request::PromptAdd {
        session_id: session_id.clone(),
        user_id: "u1".into(),
        content: "build the thing".to_string(),
        priority: Priority::Normal,
    };
    assert!(matches!(dispatch(&ctx, add).await, Response::Prompt { .. }));

    let response =
        dispatch(&ctx, Request::PromptStartNext { session_id: session_id.clone() }).await;
    let Response::Started { prompt: Some(_) } = response else {
        panic!("unexpected response: {response:?}");
    };

    // The session shows executing while the prompt is in flight.
    let response = dispatch(&ctx, Request::SessionGet { session_id: session_id.clone() }).await;
    let Response::Session { session } = response else {
        panic!("unexpected response: {response:?}");
    };
    assert_eq!(session.state.agent_activity, ens_core::AgentActivity::Executing);

    let response =
        dispatch(&ctx, Request::PromptComplete { session_id: session_id.clone() }).await;
    assert!(matches!(response, Response::Completed { prompt: Some(_) }));

    let response = dispatch(&ctx, Request::SessionGet { session_id }).await;
    let Response::Session { session } = response else {
        panic!("unexpected response: {response:?}");
    };
    assert_eq!(session.state.agent_activity, ens_core::AgentActivity::Idle);
}

#[tokio::test]
async fn full_queue_reports_resource_exhausted() {
    let (ctx, _provider) = ctx();
    let session_id = create_session(&ctx).await;

    for i in 0..50 {
        let response = dispatch(
            &ctx,
            Request::PromptAdd {
                session_id: session_id.clone(),
                user_id: "u1".into(),
                content: format!("p{i}"),
                priority: Priority::Normal,
            },
        )
        .await;
        assert!(matches!(response, Response::Prompt { .. }));
    }
    let response = dispatch(
        &ctx,
        Request::PromptAdd {
            session_id,
            user_id: "u1".into(),
            content: "overflow".to_string(),
            priority: Priority::Normal,
        },
    )
    .await;
    assert!(matches!(response, Response::Error { kind: ErrorKind::ResourceExhausted, .. }));
}

#[tokio::test]
async fn connect_and_lock_flow() {
    let (ctx, _provider) = ctx();
    let session_id = create_session(&ctx).await;

    let response = dispatch(
        &ctx,
        Request::Connect {
            session_id: session_id.clone(),
            user_id: "u1".into(),
            kind: ClientKind::Web,
        },
    )
    .await;
    assert!(matches!(response, Response::Client { .. }));

    assert_eq!(
        dispatch(
            &ctx,
            Request::AcquireLock { session_id: session_id.clone(), user_id: "u1".into() }
        )
        .await,
        Response::Ok
    );
    let response = dispatch(
        &ctx,
        Request::CanEdit { session_id, user_id: "u2".into() },
    )
    .await;
    assert_eq!(response, Response::CanEdit { can_edit: false });
}

#[tokio::test]
async fn agent_spawn_runs_to_completion() {
    let (ctx, _provider) = ctx();
    let session_id = create_session(&ctx).await;

    let response = dispatch(
        &ctx,
        Request::AgentSpawn {
            input: ens_core::SpawnAgentInput::new(session_id, "true")
                .repository("org/repo"),
        },
    )
    .await;
    let Response::Agent { agent } = response else {
        panic!("unexpected response: {response:?}");
    };

    // Poll through the protocol until the agent lands terminal.
    for _ in 0..500 {
        let response = dispatch(&ctx, Request::AgentGet { id: agent.id.clone() }).await;
        let Response::Agent { agent } = response else {
            panic!("unexpected response: {response:?}");
        };
        if agent.status.is_terminal() {
            assert_eq!(agent.status, ens_core::AgentStatus::Completed);
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("agent never finished");
}

#[tokio::test]
async fn tool_admission_blocks_writes_until_synced() {
    let (ctx, _provider) = ctx();
    let session_id = create_session(&ctx).await;

    // Reads pass immediately.
    assert_eq!(
        dispatch(
            &ctx,
            Request::ToolAdmit { session_id: session_id.clone(), tool: "read".to_string() }
        )
        .await,
        Response::Admitted
    );

    // Flip to synced, then writes pass too.
    let response = dispatch(
        &ctx,
        Request::UpdateState {
            session_id: session_id.clone(),
            patch: ens_core::StatePatch::git_sync(ens_core::GitSyncStatus::Synced),
        },
    )
    .await;
    assert!(matches!(response, Response::State { .. }));
    assert_eq!(
        dispatch(&ctx, Request::ToolAdmit { session_id, tool: "edit".to_string() }).await,
        Response::Admitted
    );
}

#[tokio::test]
async fn follow_up_resolves_a_sandbox() {
    let (ctx, provider) = ctx();
    let session_id = create_session(&ctx).await;

    let response = dispatch(
        &ctx,
        Request::FollowUp {
            session_id,
            repository: "org/repo".to_string(),
            branch: Some("main".to_string()),
            project_id: "proj-1".to_string(),
        },
    )
    .await;
    assert!(matches!(response, Response::SandboxResolved { .. }));
    assert!(provider.created_count() >= 1);
}
