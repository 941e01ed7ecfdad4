// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted in-memory provider for tests.
//!
//! Records every call, mints sandboxes instantly (or after a configured
//! delay), and lets tests script git state, exec results, and create
//! failures. Exported behind the `test-support` feature so other crates'
//! tests can drive the engine without a real provider.

use crate::logs::{LogSink, LogStream};
use crate::{ProviderError, SandboxProvider};
use async_trait::async_trait;
use ens_core::{
    CreateSandboxInput, ExecOutput, ExecRequest, GitStatus, GitSyncStatus, Sandbox, SandboxId,
    SandboxStatus, SnapshotId,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// One recorded provider invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Create { project_id: String, repository: String },
    Start(SandboxId),
    Stop(SandboxId),
    Terminate(SandboxId),
    Snapshot { sandbox_id: SandboxId, snapshot_id: SnapshotId },
    Restore(SnapshotId),
    DeleteSnapshot(SnapshotId),
    Execute { sandbox_id: SandboxId, argv: Vec<String> },
    StreamLogs { sandbox_id: SandboxId, service: String },
    GitStatus(SandboxId),
    SyncGit(SandboxId),
}

#[derive(Default)]
struct FakeInner {
    sandboxes: HashMap<SandboxId, Sandbox>,
    sinks: HashMap<(SandboxId, String), LogSink>,
    snapshots: HashMap<SnapshotId, Sandbox>,
    calls: Vec<ProviderCall>,
    git_default: Option<GitStatus>,
    git_by_sandbox: HashMap<SandboxId, GitStatus>,
    exec_results: VecDeque<ExecOutput>,
    fail_next_create: Option<String>,
    create_delay: Option<Duration>,
    next_ts: u64,
}

/// In-memory provider with scripted behavior.
#[derive(Default)]
pub struct FakeProvider {
    inner: Mutex<FakeInner>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.inner.lock().calls.clone()
    }

    /// How many sandboxes `create` has minted.
    pub fn created_count(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, ProviderCall::Create { .. }))
            .count()
    }

    /// Ids of sandboxes terminated so far.
    pub fn terminated(&self) -> Vec<SandboxId> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                ProviderCall::Terminate(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Git status returned for every sandbox without a per-sandbox override.
    pub fn set_git_status(&self, status: GitStatus) {
        self.inner.lock().git_default = Some(status);
    }

    pub fn set_git_status_for(&self, id: &SandboxId, status: GitStatus) {
        self.inner.lock().git_by_sandbox.insert(id.clone(), status);
    }

    /// Queue a scripted exec result (FIFO). Without one, exec echoes argv
    /// with exit code 0.
    pub fn push_exec_result(&self, output: ExecOutput) {
        self.inner.lock().exec_results.push_back(output);
    }

    /// Fail the next `create` with the given message.
    pub fn fail_next_create(&self, message: impl Into<String>) {
        self.inner.lock().fail_next_create = Some(message.into());
    }

    /// Delay every `create` by `delay` (drives warm-timeout tests under a
    /// paused tokio clock).
    pub fn set_create_delay(&self, delay: Duration) {
        self.inner.lock().create_delay = Some(delay);
    }

    /// Publish a line into a sandbox's service log.
    pub fn publish_log(&self, id: &SandboxId, service: &str, line: impl Into<String>) {
        let sink = self
            .inner
            .lock()
            .sinks
            .entry((id.clone(), service.to_string()))
            .or_default()
            .clone();
        sink.publish(line);
    }

    /// Drop a service's sink, ending its attached streams.
    pub fn stop_service(&self, id: &SandboxId, service: &str) {
        self.inner.lock().sinks.remove(&(id.clone(), service.to_string()));
    }

    fn default_git(&self) -> GitStatus {
        GitStatus {
            commit: "abc1234".to_string(),
            branch: "main".to_string(),
            sync_status: GitSyncStatus::Synced,
            dirty: false,
        }
    }

    fn running(&self, id: &SandboxId) -> Result<Sandbox, ProviderError> {
        let inner = self.inner.lock();
        let sandbox =
            inner.sandboxes.get(id).ok_or_else(|| ProviderError::NotFound(id.clone()))?;
        if !sandbox.status.is_running() {
            return Err(ProviderError::NotRunning(id.clone()));
        }
        Ok(sandbox.clone())
    }
}

#[async_trait]
impl SandboxProvider for FakeProvider {
    async fn create(&self, input: CreateSandboxInput) -> Result<Sandbox, ProviderError> {
        let delay = {
            let mut inner = self.inner.lock();
            inner.calls.push(ProviderCall::Create {
                project_id: input.project_id.clone(),
                repository: input.repository.clone(),
            });
            if let Some(message) = inner.fail_next_create.take() {
                return Err(ProviderError::Unavailable(message));
            }
            inner.create_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock();
        inner.next_ts += 1_000;
        let record = Sandbox {
            id: SandboxId::generate(),
            project_id: input.project_id,
            repository: input.repository,
            branch: input.branch,
            image_tag: input.image_tag,
            status: SandboxStatus::Running,
            created_at_ms: inner.next_ts,
        };
        inner.sandboxes.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, id: &SandboxId) -> Result<Sandbox, ProviderError> {
        self.inner
            .lock()
            .sandboxes
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(id.clone()))
    }

    async fn list(&self, project_id: Option<&str>) -> Result<Vec<Sandbox>, ProviderError> {
        Ok(self
            .inner
            .lock()
            .sandboxes
            .values()
            .filter(|s| project_id.is_none_or(|p| s.project_id == p))
            .cloned()
            .collect())
    }

    async fn start(&self, id: &SandboxId) -> Result<(), ProviderError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::Start(id.clone()));
        let sandbox =
            inner.sandboxes.get_mut(id).ok_or_else(|| ProviderError::NotFound(id.clone()))?;
        sandbox.status = SandboxStatus::Running;
        Ok(())
    }

    async fn stop(&self, id: &SandboxId) -> Result<(), ProviderError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::Stop(id.clone()));
        let sandbox =
            inner.sandboxes.get_mut(id).ok_or_else(|| ProviderError::NotFound(id.clone()))?;
        sandbox.status = SandboxStatus::Stopped;
        Ok(())
    }

    async fn terminate(&self, id: &SandboxId) -> Result<(), ProviderError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::Terminate(id.clone()));
        let sandbox =
            inner.sandboxes.get_mut(id).ok_or_else(|| ProviderError::NotFound(id.clone()))?;
        sandbox.status = SandboxStatus::Terminated;
        // Ending the sinks ends attached log streams.
        inner.sinks.retain(|(sandbox_id, _), _| sandbox_id != id);
        Ok(())
    }

    async fn snapshot(
        &self,
        id: &SandboxId,
        snapshot_id: &SnapshotId,
    ) -> Result<(), ProviderError> {
        let sandbox = self.running(id)?;
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::Snapshot {
            sandbox_id: id.clone(),
            snapshot_id: snapshot_id.clone(),
        });
        inner.snapshots.insert(snapshot_id.clone(), sandbox);
        Ok(())
    }

    async fn restore(&self, snapshot_id: &SnapshotId) -> Result<Sandbox, ProviderError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::Restore(snapshot_id.clone()));
        let source = inner
            .snapshots
            .get(snapshot_id)
            .cloned()
            .ok_or_else(|| ProviderError::SnapshotNotFound(snapshot_id.clone()))?;
        inner.next_ts += 1_000;
        let record = Sandbox {
            id: SandboxId::generate(),
            status: SandboxStatus::Running,
            created_at_ms: inner.next_ts,
            ..source
        };
        inner.sandboxes.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn delete_snapshot(&self, snapshot_id: &SnapshotId) -> Result<(), ProviderError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::DeleteSnapshot(snapshot_id.clone()));
        inner.snapshots.remove(snapshot_id);
        Ok(())
    }

    async fn execute(
        &self,
        id: &SandboxId,
        req: ExecRequest,
    ) -> Result<ExecOutput, ProviderError> {
        self.running(id)?;
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::Execute {
            sandbox_id: id.clone(),
            argv: req.argv.clone(),
        });
        Ok(inner.exec_results.pop_front().unwrap_or(ExecOutput {
            stdout: req.argv.join(" "),
            stderr: String::new(),
            exit_code: 0,
        }))
    }

    async fn stream_logs(
        &self,
        id: &SandboxId,
        service: &str,
    ) -> Result<LogStream, ProviderError> {
        let mut inner = self.inner.lock();
        if !inner.sandboxes.contains_key(id) {
            return Err(ProviderError::NotFound(id.clone()));
        }
        inner.calls.push(ProviderCall::StreamLogs {
            sandbox_id: id.clone(),
            service: service.to_string(),
        });
        Ok(inner.sinks.entry((id.clone(), service.to_string())).or_default().subscribe())
    }

    async fn git_status(&self, id: &SandboxId) -> Result<GitStatus, ProviderError> {
        self.running(id)?;
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::GitStatus(id.clone()));
        Ok(inner
            .git_by_sandbox
            .get(id)
            .cloned()
            .or_else(|| inner.git_default.clone())
            .unwrap_or_else(|| self.default_git()))
    }

    async fn sync_git(&self, id: &SandboxId) -> Result<GitStatus, ProviderError> {
        self.running(id)?;
        let mut inner = self.inner.lock();
        inner.calls.push(ProviderCall::SyncGit(id.clone()));
        let mut status = inner
            .git_by_sandbox
            .get(id)
            .cloned()
            .or_else(|| inner.git_default.clone())
            .unwrap_or_else(|| self.default_git());
        status.sync_status = GitSyncStatus::Synced;
        inner.git_by_sandbox.insert(id.clone(), status.clone());
        Ok(status)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
