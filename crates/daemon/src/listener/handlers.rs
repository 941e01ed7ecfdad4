// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request dispatch for the non-streaming protocol surface.

use super::ListenCtx;
use crate::protocol::{Request, Response};
use ens_core::{AgentActivity, Event, StatePatch};
use ens_engine::{CreateSessionInput, EngineError, JoinInput};

/// Handle one request, translating engine failures into error responses.
/// Invariant violations are logged here before they leave the process.
pub(crate) async fn dispatch(ctx: &ListenCtx, request: Request) -> Response {
    match handle(ctx, request).await {
        Ok(response) => response,
        Err(e) => {
            if matches!(e, EngineError::Fatal(_)) {
                tracing::error!(error = %e, "fatal error handling request");
            }
            Response::error(&e)
        }
    }
}

async fn handle(ctx: &ListenCtx, request: Request) -> Result<Response, EngineError> {
    let engine = &ctx.engine;
    match request {
        Request::Ping => Ok(Response::Pong),

        // Status, Shutdown, and the streaming requests are handled by the
        // connection layer before dispatch.
        Request::Status
        | Request::Shutdown
        | Request::SandboxLogs { .. }
        | Request::AgentEvents { .. } => {
            Err(EngineError::Fatal("request routed past the connection layer".to_string()))
        }

        // -- sandboxes --
        Request::SandboxCreate { input } => {
            let project_id = input.project_id.clone();
            let sandbox = engine.provider().create(input).await?;
            engine.bus.publish(Event::SandboxCreated {
                sandbox_id: sandbox.id.clone(),
                project_id,
            });
            Ok(Response::Sandbox { sandbox })
        }
        Request::SandboxList { project_id } => {
            let sandboxes = engine.provider().list(project_id.as_deref()).await?;
            Ok(Response::Sandboxes { sandboxes })
        }
        Request::SandboxGet { id } => {
            Ok(Response::Sandbox { sandbox: engine.provider().get(&id).await? })
        }
        Request::SandboxStart { id } => {
            engine.provider().start(&id).await?;
            Ok(Response::Ok)
        }
        Request::SandboxStop { id } => {
            engine.provider().stop(&id).await?;
            Ok(Response::Ok)
        }
        Request::SandboxTerminate { id } => {
            engine.provider().terminate(&id).await?;
            engine.bus.publish(Event::SandboxTerminated { sandbox_id: id });
            Ok(Response::Ok)
        }
        Request::SandboxExec { id, request } => {
            Ok(Response::Exec { output: engine.provider().execute(&id, request).await? })
        }
        Request::SandboxGit { id } => {
            Ok(Response::Git { status: engine.provider().git_status(&id).await? })
        }
        Request::SandboxGitSync { id } => {
            Ok(Response::Git { status: engine.provider().sync_git(&id).await? })
        }
        Request::SandboxSnapshot { id, session_id, git_commit, has_uncommitted_changes } => {
            let snapshot = engine
                .snapshots
                .create(&id, &session_id, git_commit, has_uncommitted_changes, None)
                .await?;
            Ok(Response::Snapshot { snapshot })
        }
        Request::SandboxRestore { session_id } => {
            let sandbox = engine.snapshots.restore(&session_id).await?;
            Ok(Response::Restored { sandbox })
        }
        Request::SnapshotList => Ok(Response::Snapshots { snapshots: engine.snapshots.list() }),
        Request::SnapshotDelete { id } => {
            if engine.snapshots.delete(&id).await? {
                Ok(Response::Ok)
            } else {
                Err(EngineError::NotFound(format!("snapshot {id}")))
            }
        }

        // -- warm pool --
        Request::PoolClaim { key, project_id } => {
            let outcome = engine.pool.claim(&key, &project_id);
            Ok(Response::Claim {
                sandbox: outcome.sandbox,
                reason: outcome.reason.to_string(),
            })
        }
        Request::PoolTyping { key, project_id } => {
            engine.pool.on_typing(&key, &project_id);
            Ok(Response::Ok)
        }
        Request::PoolStats { key } => {
            let stats = match key {
                Some(key) => engine.pool.stats(&key),
                None => engine.pool.total_stats(),
            };
            Ok(Response::PoolStats { stats })
        }

        // -- background agents --
        Request::AgentSpawn { input } => {
            Ok(Response::Agent { agent: engine.scheduler.spawn(input)? })
        }
        Request::AgentGet { id } => match engine.scheduler.get(&id) {
            Some(agent) => Ok(Response::Agent { agent }),
            None => Err(EngineError::NotFound(format!("agent {id}"))),
        },
        Request::AgentOutput { id } => match engine.scheduler.get(&id) {
            Some(agent) => Ok(Response::AgentOutput { output: agent.output }),
            None => Err(EngineError::NotFound(format!("agent {id}"))),
        },
        Request::AgentCancel { id } => {
            Ok(Response::Cancelled { cancelled: engine.scheduler.cancel(&id) })
        }
        Request::AgentList => {
            Ok(Response::Agents { agents: engine.scheduler.spawner().agents() })
        }

        // -- multiplayer sessions --
        Request::SessionCreate { id, work_session_id } => {
            let session =
                engine.sessions.create(CreateSessionInput { id, work_session_id }).await?;
            Ok(Response::Session { session })
        }
        Request::SessionGet { session_id } => {
            Ok(Response::Session { session: engine.sessions.get(&session_id).await? })
        }
        Request::SessionList => {
            Ok(Response::Sessions { sessions: engine.sessions.list().await? })
        }
        Request::SessionDelete { session_id } => {
            engine.sessions.delete(&session_id).await?;
            Ok(Response::Ok)
        }
        Request::Join { session_id, user_id, display_name, email, avatar } => {
            let mut input = JoinInput::new(user_id, display_name);
            input.email = email;
            input.avatar = avatar;
            Ok(Response::User { user: engine.sessions.join(&session_id, input).await? })
        }
        Request::Leave { session_id, user_id } => {
            engine.sessions.leave(&session_id, &user_id).await?;
            Ok(Response::Ok)
        }
        Request::Connect { session_id, user_id, kind } => {
            let client = engine.sessions.connect(&session_id, &user_id, kind).await?;
            Ok(Response::Client { client })
        }
        Request::Disconnect { session_id, client_id } => {
            engine.sessions.disconnect(&session_id, &client_id).await?;
            Ok(Response::Ok)
        }
        Request::UpdateCursor { session_id, user_id, cursor } => {
            engine.sessions.update_cursor(&session_id, &user_id, cursor).await?;
            Ok(Response::Ok)
        }
        Request::AcquireLock { session_id, user_id } => {
            engine.sessions.acquire_lock(&session_id, &user_id).await?;
            Ok(Response::Ok)
        }
        Request::ReleaseLock { session_id, user_id } => {
            engine.sessions.release_lock(&session_id, &user_id).await?;
            Ok(Response::Ok)
        }
        Request::CanEdit { session_id, user_id } => {
            let can_edit = engine.sessions.can_edit(&session_id, &user_id).await?;
            Ok(Response::CanEdit { can_edit })
        }
        Request::UpdateState { session_id, patch } => {
            let state = engine.sessions.update_state(&session_id, patch).await?;
            Ok(Response::State { state })
        }
        Request::HasChanges { session_id } => {
            engine.sessions.notify_has_changes(&session_id);
            Ok(Response::Ok)
        }

        // -- prompt queue --
        Request::PromptAdd { session_id, user_id, content, priority } => {
            let prompt = engine.queues.add(&session_id, &user_id, content, priority).await?;
            Ok(Response::Prompt { prompt })
        }
        Request::PromptStartNext { session_id } => {
            let prompt = engine.queues.start_next(&session_id).await?;
            if prompt.is_some() {
                engine
                    .sessions
                    .update_state(&session_id, StatePatch::agent_activity(AgentActivity::Executing))
                    .await?;
            }
            Ok(Response::Started { prompt })
        }
        Request::PromptComplete { session_id } => {
            let prompt = engine.queues.complete(&session_id).await?;
            if prompt.is_some() {
                engine
                    .sessions
                    .update_state(&session_id, StatePatch::agent_activity(AgentActivity::Idle))
                    .await?;
            }
            Ok(Response::Completed { prompt })
        }
        Request::PromptCancel { session_id, prompt_id, user_id } => {
            let cancelled = engine.queues.cancel(&session_id, &prompt_id, &user_id).await?;
            Ok(Response::Cancelled { cancelled })
        }
        Request::PromptReorder { session_id, prompt_id, user_id, new_index } => {
            let index =
                engine.queues.reorder(&session_id, &prompt_id, &user_id, new_index).await?;
            Ok(Response::Reordered { index })
        }
        Request::PromptList { session_id } => {
            let (active, queue) = engine.queues.list(&session_id).await?;
            Ok(Response::Prompts { active, queue })
        }

        // -- gate / lifecycle --
        Request::ToolAdmit { session_id, tool } => {
            engine.gate.admit(&session_id, &tool).await?;
            Ok(Response::Admitted)
        }
        Request::FollowUp { session_id, repository, branch, project_id } => {
            let sandbox_id = engine
                .lifecycle
                .on_follow_up_prompt(&session_id, &repository, branch.as_deref(), &project_id)
                .await?;
            Ok(Response::SandboxResolved { sandbox_id })
        }
    }
}
