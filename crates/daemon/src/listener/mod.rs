// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! Accepts connections on the Unix socket and handles each in its own
//! task without blocking the engine. One request per connection; the
//! streaming requests keep the connection open and write a frame per item
//! until a terminal `stream:end` frame (or the client goes away).

mod handlers;
mod stream;

use crate::env::{ipc_timeout, PROTOCOL_VERSION};
use crate::protocol::{self, ProtocolError, Request, Response};
use ens_core::SystemClock;
use ens_engine::Engine;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Shared daemon context for all request handlers.
pub struct ListenCtx {
    pub engine: Arc<Engine<SystemClock>>,
    pub start_time: Instant,
    pub shutdown: Arc<Notify>,
}

/// Accept loop over the daemon socket.
pub struct Listener {
    unix: UnixListener,
    ctx: Arc<ListenCtx>,
    cancel: CancellationToken,
}

impl Listener {
    pub fn new(unix: UnixListener, ctx: Arc<ListenCtx>, cancel: CancellationToken) -> Self {
        Self { unix, ctx, cancel }
    }

    /// Run until cancelled, spawning a task per connection.
    pub async fn run(self) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                result = self.unix.accept() => match result {
                    Ok((stream, _)) => {
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            if let Err(e) = handle_connection(reader, writer, &ctx).await {
                                log_connection_error(e);
                            }
                        });
                    }
                    Err(e) => error!("accept error: {e}"),
                },
            }
        }
        debug!("listener stopped");
    }
}

fn log_connection_error(e: ProtocolError) {
    match e {
        ProtocolError::ConnectionClosed => debug!("client disconnected"),
        ProtocolError::Timeout => warn!("connection timed out"),
        other => error!("connection error: {other}"),
    }
}

/// Handle a single client connection: one request, one (or a stream of)
/// response frame(s).
async fn handle_connection<R, W>(
    mut reader: R,
    mut writer: W,
    ctx: &ListenCtx,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let request: Request = protocol::read_message(&mut reader, ipc_timeout()).await?;
    debug!(request = ?request_name(&request), "request");

    match request {
        Request::SandboxLogs { id, service } => {
            stream::sandbox_logs(ctx, &mut writer, &id, &service).await
        }
        Request::AgentEvents { id } => stream::agent_events(ctx, &mut writer, &id).await,
        Request::Status => {
            let sessions = ctx.engine.sessions.list().await.map(|s| s.len()).unwrap_or(0);
            let response = Response::Status {
                version: PROTOCOL_VERSION.to_string(),
                sessions,
                uptime_ms: ctx.start_time.elapsed().as_millis() as u64,
            };
            protocol::write_message(&mut writer, &response).await
        }
        Request::Shutdown => {
            protocol::write_message(&mut writer, &Response::Ok).await?;
            ctx.shutdown.notify_one();
            Ok(())
        }
        other => {
            let response = handlers::dispatch(ctx, other).await;
            protocol::write_message(&mut writer, &response).await
        }
    }
}

fn request_name(request: &Request) -> &'static str {
    match request {
        Request::Ping => "ping",
        Request::Status => "status",
        Request::Shutdown => "shutdown",
        Request::SandboxCreate { .. } => "sandbox:create",
        Request::SandboxList { .. } => "sandbox:list",
        Request::SandboxGet { .. } => "sandbox:get",
        Request::SandboxStart { .. } => "sandbox:start",
        Request::SandboxStop { .. } => "sandbox:stop",
        Request::SandboxTerminate { .. } => "sandbox:terminate",
        Request::SandboxExec { .. } => "sandbox:exec",
        Request::SandboxLogs { .. } => "sandbox:logs",
        Request::SandboxGit { .. } => "sandbox:git",
        Request::SandboxGitSync { .. } => "sandbox:git_sync",
        Request::SandboxSnapshot { .. } => "sandbox:snapshot",
        Request::SandboxRestore { .. } => "sandbox:restore",
        Request::SnapshotList => "snapshot:list",
        Request::SnapshotDelete { .. } => "snapshot:delete",
        Request::PoolClaim { .. } => "pool:claim",
        Request::PoolTyping { .. } => "pool:typing",
        Request::PoolStats { .. } => "pool:stats",
        Request::AgentSpawn { .. } => "agent:spawn",
        Request::AgentGet { .. } => "agent:get",
        Request::AgentOutput { .. } => "agent:output",
        Request::AgentCancel { .. } => "agent:cancel",
        Request::AgentList => "agent:list",
        Request::AgentEvents { .. } => "agent:events",
        Request::SessionCreate { .. } => "session:create",
        Request::SessionGet { .. } => "session:get",
        Request::SessionList => "session:list",
        Request::SessionDelete { .. } => "session:delete",
        Request::Join { .. } => "session:join",
        Request::Leave { .. } => "session:leave",
        Request::Connect { .. } => "session:connect",
        Request::Disconnect { .. } => "session:disconnect",
        Request::UpdateCursor { .. } => "session:cursor",
        Request::AcquireLock { .. } => "session:lock",
        Request::ReleaseLock { .. } => "session:unlock",
        Request::CanEdit { .. } => "session:can_edit",
        Request::UpdateState { .. } => "session:state",
        Request::HasChanges { .. } => "session:has_changes",
        Request::PromptAdd { .. } => "prompt:add",
        Request::PromptStartNext { .. } => "prompt:start_next",
        Request::PromptComplete { .. } => "prompt:complete",
        Request::PromptCancel { .. } => "prompt:cancel",
        Request::PromptReorder { .. } => "prompt:reorder",
        Request::PromptList { .. } => "prompt:list",
        Request::ToolAdmit { .. } => "tool:admit",
        Request::FollowUp { .. } => "lifecycle:follow_up",
    }
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod handlers_tests;
