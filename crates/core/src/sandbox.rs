// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sandbox records and provider request/response types.

use crate::session::GitSyncStatus;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for an execution sandbox.
    pub struct SandboxId("sbx_");
}

/// Provider-side status of a sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxStatus {
    Creating,
    Running,
    Stopped,
    Terminated,
}

impl SandboxStatus {
    pub fn is_running(self) -> bool {
        matches!(self, SandboxStatus::Running)
    }
}

crate::simple_display! {
    SandboxStatus {
        Creating => "creating",
        Running => "running",
        Stopped => "stopped",
        Terminated => "terminated",
    }
}

/// An isolated execution environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sandbox {
    pub id: SandboxId,
    pub project_id: String,
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_tag: Option<String>,
    pub status: SandboxStatus,
    pub created_at_ms: u64,
}

/// Input for creating a sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSandboxInput {
    pub project_id: String,
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_tag: Option<String>,
}

impl CreateSandboxInput {
    pub fn new(project_id: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            repository: repository.into(),
            branch: None,
            image_tag: None,
        }
    }

    crate::optional_setters! {
        branch: String,
        image_tag: String,
    }

    /// The warm-pool key this input maps onto.
    pub fn pool_key(&self) -> PoolKey {
        PoolKey {
            repository: self.repository.clone(),
            branch: self.branch.clone(),
            image_tag: self.image_tag.clone(),
        }
    }
}

/// Warm-pool partition key: `(repository, branch?, image_tag?)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolKey {
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_tag: Option<String>,
}

impl PoolKey {
    pub fn new(repository: impl Into<String>) -> Self {
        Self { repository: repository.into(), branch: None, image_tag: None }
    }

    crate::optional_setters! {
        branch: String,
        image_tag: String,
    }
}

impl std::fmt::Display for PoolKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.repository)?;
        if let Some(branch) = &self.branch {
            write!(f, "@{branch}")?;
        }
        if let Some(tag) = &self.image_tag {
            write!(f, "#{tag}")?;
        }
        Ok(())
    }
}

/// A command execution request against a running sandbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecRequest {
    pub argv: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ExecRequest {
    pub fn new(argv: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { argv: argv.into_iter().map(Into::into).collect(), ..Self::default() }
    }

    pub fn env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    crate::optional_setters! {
        cwd: PathBuf,
        timeout_ms: u64,
    }
}

/// Outcome of a sandbox command execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Git state of a sandbox checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitStatus {
    pub commit: String,
    pub branch: String,
    pub sync_status: GitSyncStatus,
    pub dirty: bool,
}

#[cfg(test)]
#[path = "sandbox_tests.rs"]
mod tests;
