// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon's agent runner.
//!
//! Background agents get a sandbox from the provider and run their task
//! inside it as a command. The orchestration core does not execute model
//! calls itself; a hosted deployment swaps this runner for one that
//! drives the actual agent harness against the same contract.

use async_trait::async_trait;
use ens_core::{Agent, CreateSandboxInput, ExecRequest, SandboxId};
use ens_engine::{AgentRunner, RunnerError};
use ens_provider::SandboxProvider;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct SandboxAgentRunner {
    provider: Arc<dyn SandboxProvider>,
}

impl SandboxAgentRunner {
    pub fn new(provider: Arc<dyn SandboxProvider>) -> Arc<Self> {
        Arc::new(Self { provider })
    }
}

#[async_trait]
impl AgentRunner for SandboxAgentRunner {
    async fn initialize(
        &self,
        agent: &Agent,
        cancel: CancellationToken,
    ) -> Result<SandboxId, RunnerError> {
        let mut input = CreateSandboxInput::new(
            agent.parent_session_id.as_str(),
            agent.repository.clone().unwrap_or_default(),
        );
        input.branch = agent.branch.clone();

        let sandbox = tokio::select! {
            result = self.provider.create(input) => {
                result.map_err(|e| RunnerError(e.to_string()))?
            }
            _ = cancel.cancelled() => return Err("initialization cancelled".into()),
        };
        debug!(agent = %agent.id, sandbox = %sandbox.id, "agent sandbox ready");
        Ok(sandbox.id)
    }

    async fn run(&self, agent: &Agent, cancel: CancellationToken) -> Result<String, RunnerError> {
        let Some(sandbox_id) = &agent.sandbox_id else {
            return Err("agent has no sandbox".into());
        };
        let request = ExecRequest::new(["sh", "-c", agent.task.as_str()]);
        let output = tokio::select! {
            result = self.provider.execute(sandbox_id, request) => {
                result.map_err(|e| RunnerError(e.to_string()))?
            }
            _ = cancel.cancelled() => return Err("run cancelled".into()),
        };
        if output.exit_code != 0 {
            return Err(format!(
                "task exited with code {}: {}",
                output.exit_code,
                output.stderr.trim()
            )
            .into());
        }
        Ok(output.stdout)
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
