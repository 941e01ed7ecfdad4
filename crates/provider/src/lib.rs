// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ens-provider: the sandbox provider abstraction.
//!
//! A provider materializes isolated execution environments and operates on
//! them: lifecycle, command execution, log streaming, snapshots, git state.
//! Variants are pluggable: the local variant runs sandboxes as directories
//! plus local processes; remote hypervisors implement the same trait.

mod local;
mod logs;

pub use local::LocalProvider;
pub use logs::{LogSink, LogStream};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeProvider, ProviderCall};

use async_trait::async_trait;
use ens_core::{
    CreateSandboxInput, ExecOutput, ExecRequest, GitStatus, Sandbox, SandboxId, SnapshotId,
};
use thiserror::Error;

/// Default execution timeout when a request does not carry one.
pub const DEFAULT_EXEC_TIMEOUT_MS: u64 = 30_000;

/// Errors from provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("sandbox not found: {0}")]
    NotFound(SandboxId),
    #[error("sandbox not running: {0}")]
    NotRunning(SandboxId),
    #[error("snapshot not found: {0}")]
    SnapshotNotFound(SnapshotId),
    #[error("execution timed out")]
    Timeout,
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Capability set of a sandbox provider.
///
/// `execute` enforces the request timeout and distinguishes a missing
/// sandbox (`NotFound`) from a stopped one (`NotRunning`). `stream_logs`
/// produces a lazy sequence of UTF-8 lines that ends when the service
/// stops; delivery is lossy per subscriber (see [`LogStream`]).
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    async fn create(&self, input: CreateSandboxInput) -> Result<Sandbox, ProviderError>;

    async fn get(&self, id: &SandboxId) -> Result<Sandbox, ProviderError>;

    /// All sandboxes, optionally filtered by project.
    async fn list(&self, project_id: Option<&str>) -> Result<Vec<Sandbox>, ProviderError>;

    async fn start(&self, id: &SandboxId) -> Result<(), ProviderError>;

    async fn stop(&self, id: &SandboxId) -> Result<(), ProviderError>;

    async fn terminate(&self, id: &SandboxId) -> Result<(), ProviderError>;

    /// Capture the sandbox image under `snapshot_id`.
    async fn snapshot(&self, id: &SandboxId, snapshot_id: &SnapshotId)
        -> Result<(), ProviderError>;

    /// Materialize a fresh sandbox from a previously captured image.
    async fn restore(&self, snapshot_id: &SnapshotId) -> Result<Sandbox, ProviderError>;

    /// Drop a captured image. Missing images are not an error.
    async fn delete_snapshot(&self, snapshot_id: &SnapshotId) -> Result<(), ProviderError>;

    async fn execute(&self, id: &SandboxId, req: ExecRequest)
        -> Result<ExecOutput, ProviderError>;

    async fn stream_logs(&self, id: &SandboxId, service: &str)
        -> Result<LogStream, ProviderError>;

    async fn git_status(&self, id: &SandboxId) -> Result<GitStatus, ProviderError>;

    /// Bring the checkout up to date with its upstream, then report status.
    async fn sync_git(&self, id: &SandboxId) -> Result<GitStatus, ProviderError>;
}
