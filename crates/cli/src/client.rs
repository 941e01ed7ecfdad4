// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket client for the daemon.

use anyhow::{bail, Context, Result};
use ens_daemon::env;
use ens_daemon::protocol::{self, Request, Response};
use tokio::net::UnixStream;

/// Exit codes surfaced by the CLI.
///
/// `0` success, `1` generic error, `2` misuse, `64` not found,
/// `77` resource exhausted.
pub fn exit_code_for(response: &Response) -> i32 {
    use ens_daemon::protocol::ErrorKind;
    match response {
        Response::Error { kind, .. } => match kind {
            ErrorKind::Validation => 2,
            ErrorKind::NotFound => 64,
            ErrorKind::ResourceExhausted => 77,
            _ => 1,
        },
        _ => 0,
    }
}

pub struct Client {
    stream: UnixStream,
}

impl Client {
    /// Connect to the daemon socket under the state dir.
    pub async fn connect() -> Result<Self> {
        let socket = env::state_dir()?.join("ensd.sock");
        let stream = UnixStream::connect(&socket).await.with_context(|| {
            format!("cannot reach the daemon at {} (is ensd running?)", socket.display())
        })?;
        Ok(Self { stream })
    }

    /// Send one request and read one response.
    pub async fn call(mut self, request: Request) -> Result<Response> {
        protocol::write_message(&mut self.stream, &request).await?;
        let response = protocol::read_message(&mut self.stream, env::ipc_timeout()).await?;
        Ok(response)
    }

    /// Send one request and stream frames until `stream:end`.
    pub async fn stream(
        mut self,
        request: Request,
        mut on_frame: impl FnMut(Response),
    ) -> Result<()> {
        protocol::write_message(&mut self.stream, &request).await?;
        loop {
            // Streams are open-ended; wait generously between frames.
            let frame: Response = protocol::read_message(
                &mut self.stream,
                std::time::Duration::from_secs(24 * 60 * 60),
            )
            .await?;
            match frame {
                Response::StreamEnd => return Ok(()),
                Response::Error { kind, message } => {
                    bail!("stream failed ({kind:?}): {message}")
                }
                other => on_frame(other),
            }
        }
    }
}
