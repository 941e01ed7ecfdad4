// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming responses: sandbox logs and agent status events.
//!
//! Each item is one framed `Response`; the stream ends with `stream:end`.
//! A write failure means the client went away; production stops there,
//! which is all the cancellation a disconnected stream needs.

use super::ListenCtx;
use crate::protocol::{self, ProtocolError, Response};
use ens_core::{AgentId, Event, SandboxId};
use tokio::io::AsyncWrite;

pub(crate) async fn sandbox_logs<W>(
    ctx: &ListenCtx,
    writer: &mut W,
    id: &SandboxId,
    service: &str,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut stream = match ctx.engine.provider().stream_logs(id, service).await {
        Ok(stream) => stream,
        Err(e) => {
            let e = ens_engine::EngineError::from(e);
            return protocol::write_message(writer, &Response::error(&e)).await;
        }
    };

    while let Some(line) = stream.next().await {
        protocol::write_message(writer, &Response::LogLine { line }).await?;
    }
    protocol::write_message(writer, &Response::StreamEnd).await
}

pub(crate) async fn agent_events<W>(
    ctx: &ListenCtx,
    writer: &mut W,
    id: &AgentId,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin + Send,
{
    // Subscribe before the initial status read so no transition is missed.
    let mut subscription = ctx.engine.bus.subscribe();

    let Some(agent) = ctx.engine.scheduler.get(id) else {
        let e = ens_engine::EngineError::NotFound(format!("agent {id}"));
        return protocol::write_message(writer, &Response::error(&e)).await;
    };

    let frame = Response::AgentStatusFrame { status: agent.status, error: agent.error.clone() };
    protocol::write_message(writer, &frame).await?;
    if agent.status.is_terminal() {
        return protocol::write_message(writer, &Response::StreamEnd).await;
    }

    while let Some(envelope) = subscription.next().await {
        let Event::AgentStatusChanged { agent_id, status, error, .. } = envelope.event else {
            continue;
        };
        if &agent_id != id {
            continue;
        }
        protocol::write_message(writer, &Response::AgentStatusFrame { status, error }).await?;
        if status.is_terminal() {
            break;
        }
    }
    protocol::write_message(writer, &Response::StreamEnd).await
}
