// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ens: CLI client for the ensemble daemon.

mod args;
mod client;
mod convert;

use anyhow::Result;
use args::{Cli, Command};
use clap::Parser;
use client::{exit_code_for, Client};
use ens_daemon::protocol::{Request, Response};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ens: {e:#}");
            1
        }
    };
    std::process::exit(code);
}

async fn run(command: Command) -> Result<i32> {
    match command {
        Command::Daemon => {
            ens_daemon::lifecycle::run().await?;
            Ok(0)
        }
        Command::Stop => call(Request::Shutdown).await,
        Command::Ping => call(Request::Ping).await,
        Command::Status => call(Request::Status).await,
        Command::Sandbox(cmd) => match convert::sandbox_request(cmd)? {
            convert::SandboxAction::Call(request) => call(request).await,
            convert::SandboxAction::StreamLogs { id, service } => {
                Client::connect()
                    .await?
                    .stream(Request::SandboxLogs { id, service }, |frame| {
                        if let Response::LogLine { line } = frame {
                            println!("{line}");
                        }
                    })
                    .await?;
                Ok(0)
            }
        },
        Command::Snapshots(cmd) => call(convert::snapshot_request(cmd)).await,
        Command::Pool(cmd) => call(convert::pool_request(cmd)).await,
        Command::Agent(cmd) => match convert::agent_request(cmd)? {
            convert::AgentAction::Call(request) => call(request).await,
            convert::AgentAction::Watch { id } => {
                Client::connect()
                    .await?
                    .stream(Request::AgentEvents { id }, |frame| {
                        if let Response::AgentStatusFrame { status, error } = frame {
                            match error {
                                Some(error) => println!("{status}: {error}"),
                                None => println!("{status}"),
                            }
                        }
                    })
                    .await?;
                Ok(0)
            }
        },
        Command::Session(cmd) => call(convert::session_request(cmd)?).await,
        Command::Prompt(cmd) => call(convert::prompt_request(cmd)?).await,
        Command::Admit { session, tool } => {
            call(Request::ToolAdmit { session_id: session.into(), tool }).await
        }
        Command::FollowUp { session, repo, branch, project } => {
            call(Request::FollowUp {
                session_id: session.into(),
                repository: repo,
                branch,
                project_id: project,
            })
            .await
        }
    }
}

/// One-shot request: print the response, derive the exit code.
async fn call(request: Request) -> Result<i32> {
    let response = Client::connect().await?.call(request).await?;
    let code = exit_code_for(&response);
    match &response {
        Response::Error { kind, message } => eprintln!("ens: {kind:?}: {message}"),
        Response::Ok | Response::Pong | Response::Admitted => println!("ok"),
        other => println!("{}", serde_json::to_string_pretty(other)?),
    }
    Ok(code)
}
