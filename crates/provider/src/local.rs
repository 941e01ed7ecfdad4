// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local-process sandbox provider.
//!
//! A sandbox is a directory under the provider's base dir plus the
//! processes run inside it. Snapshots are directory copies under
//! `snapshots/`. Git operations shell out to `git` inside the sandbox
//! directory. This variant backs single-node deployments and development;
//! remote hypervisors implement the same trait.

use crate::logs::{LogSink, LogStream};
use crate::{ProviderError, SandboxProvider, DEFAULT_EXEC_TIMEOUT_MS};
use async_trait::async_trait;
use ens_core::{
    CreateSandboxInput, ExecOutput, ExecRequest, GitStatus, GitSyncStatus, Sandbox, SandboxId,
    SandboxStatus, SnapshotId,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::process::Command;
use tracing::{debug, warn};

const META_FILE: &str = "sandbox.json";
const GIT_TIMEOUT: Duration = Duration::from_secs(120);

fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

struct LocalSandbox {
    record: Sandbox,
    dir: PathBuf,
    sinks: HashMap<String, LogSink>,
}

#[derive(Default)]
struct Inner {
    sandboxes: HashMap<SandboxId, LocalSandbox>,
    snapshots: HashMap<SnapshotId, PathBuf>,
}

/// Sandboxes as local directories + processes.
pub struct LocalProvider {
    base_dir: PathBuf,
    inner: Mutex<Inner>,
}

impl LocalProvider {
    /// Open a provider rooted at `base_dir`, creating it if needed.
    pub async fn open(base_dir: impl Into<PathBuf>) -> Result<Self, ProviderError> {
        let base_dir = base_dir.into();
        tokio::fs::create_dir_all(base_dir.join("snapshots")).await?;
        Ok(Self { base_dir, inner: Mutex::new(Inner::default()) })
    }

    fn sandbox_dir(&self, id: &SandboxId) -> PathBuf {
        self.base_dir.join(id.as_str())
    }

    fn snapshot_dir(&self, id: &SnapshotId) -> PathBuf {
        self.base_dir.join("snapshots").join(id.as_str())
    }

    /// Record + dir of a running sandbox, or the appropriate error.
    fn running_dir(&self, id: &SandboxId) -> Result<PathBuf, ProviderError> {
        let inner = self.inner.lock();
        let sandbox = inner.sandboxes.get(id).ok_or_else(|| ProviderError::NotFound(id.clone()))?;
        if !sandbox.record.status.is_running() {
            return Err(ProviderError::NotRunning(id.clone()));
        }
        Ok(sandbox.dir.clone())
    }

    fn set_status(&self, id: &SandboxId, status: SandboxStatus) -> Result<(), ProviderError> {
        let mut inner = self.inner.lock();
        let sandbox =
            inner.sandboxes.get_mut(id).ok_or_else(|| ProviderError::NotFound(id.clone()))?;
        sandbox.record.status = status;
        Ok(())
    }

    async fn run_command(
        dir: &Path,
        req: &ExecRequest,
    ) -> Result<ExecOutput, ProviderError> {
        let Some(program) = req.argv.first() else {
            return Err(ProviderError::Spawn("empty argv".to_string()));
        };
        let mut command = Command::new(program);
        command
            .args(&req.argv[1..])
            .current_dir(req.cwd.as_deref().unwrap_or(dir))
            .envs(req.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| ProviderError::Spawn(e.to_string()))?;
        let deadline = Duration::from_millis(req.timeout_ms.unwrap_or(DEFAULT_EXEC_TIMEOUT_MS));
        let output = tokio::time::timeout(deadline, child.wait_with_output())
            .await
            .map_err(|_| ProviderError::Timeout)??;

        Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    async fn git(&self, dir: &Path, args: &[&str]) -> Result<ExecOutput, ProviderError> {
        let mut argv = vec!["git".to_string()];
        argv.extend(args.iter().map(|s| s.to_string()));
        let req = ExecRequest { argv, timeout_ms: Some(GIT_TIMEOUT.as_millis() as u64), ..ExecRequest::default() };
        Self::run_command(dir, &req).await
    }

    async fn read_git_status(&self, dir: &Path) -> Result<GitStatus, ProviderError> {
        let head = self.git(dir, &["rev-parse", "HEAD"]).await?;
        if head.exit_code != 0 {
            return Err(ProviderError::Unavailable(format!(
                "not a git checkout: {}",
                head.stderr.trim()
            )));
        }
        let porcelain = self.git(dir, &["status", "--porcelain=v1", "-b"]).await?;
        let mut lines = porcelain.stdout.lines();
        let header = lines.next().unwrap_or_default();
        let branch = header
            .trim_start_matches("## ")
            .split(['.', ' '])
            .next()
            .unwrap_or("HEAD")
            .to_string();
        let dirty = lines.next().is_some();
        let sync_status = if header.contains("[behind") || header.contains("behind ") {
            GitSyncStatus::Pending
        } else {
            GitSyncStatus::Synced
        };
        Ok(GitStatus { commit: head.stdout.trim().to_string(), branch, sync_status, dirty })
    }
}

/// Recursively copy a directory tree.
fn copy_dir<'a>(
    src: &'a Path,
    dst: &'a Path,
) -> Pin<Box<dyn Future<Output = std::io::Result<()>> + Send + 'a>> {
    Box::pin(async move {
        tokio::fs::create_dir_all(dst).await?;
        let mut entries = tokio::fs::read_dir(src).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = dst.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                copy_dir(&entry.path(), &target).await?;
            } else {
                tokio::fs::copy(entry.path(), &target).await?;
            }
        }
        Ok(())
    })
}

#[async_trait]
impl SandboxProvider for LocalProvider {
    async fn create(&self, input: CreateSandboxInput) -> Result<Sandbox, ProviderError> {
        let id = SandboxId::generate();
        let dir = self.sandbox_dir(&id);
        tokio::fs::create_dir_all(&dir).await?;

        let record = Sandbox {
            id: id.clone(),
            project_id: input.project_id,
            repository: input.repository,
            branch: input.branch,
            image_tag: input.image_tag,
            status: SandboxStatus::Running,
            created_at_ms: epoch_ms(),
        };
        let meta = serde_json::to_vec(&record)
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        tokio::fs::write(dir.join(META_FILE), meta).await?;

        debug!(sandbox = %id, dir = %dir.display(), "created local sandbox");
        self.inner.lock().sandboxes.insert(
            id,
            LocalSandbox { record: record.clone(), dir, sinks: HashMap::new() },
        );
        Ok(record)
    }

    async fn get(&self, id: &SandboxId) -> Result<Sandbox, ProviderError> {
        self.inner
            .lock()
            .sandboxes
            .get(id)
            .map(|s| s.record.clone())
            .ok_or_else(|| ProviderError::NotFound(id.clone()))
    }

    async fn list(&self, project_id: Option<&str>) -> Result<Vec<Sandbox>, ProviderError> {
        Ok(self
            .inner
            .lock()
            .sandboxes
            .values()
            .map(|s| s.record.clone())
            .filter(|s| project_id.is_none_or(|p| s.project_id == p))
            .collect())
    }

    async fn start(&self, id: &SandboxId) -> Result<(), ProviderError> {
        self.set_status(id, SandboxStatus::Running)
    }

    async fn stop(&self, id: &SandboxId) -> Result<(), ProviderError> {
        self.set_status(id, SandboxStatus::Stopped)
    }

    async fn terminate(&self, id: &SandboxId) -> Result<(), ProviderError> {
        let removed = self
            .inner
            .lock()
            .sandboxes
            .remove(id)
            .ok_or_else(|| ProviderError::NotFound(id.clone()))?;
        // Dropping the sinks ends every attached log stream.
        drop(removed.sinks);
        if let Err(e) = tokio::fs::remove_dir_all(&removed.dir).await {
            warn!(sandbox = %id, error = %e, "failed to remove sandbox dir");
        }
        Ok(())
    }

    async fn snapshot(
        &self,
        id: &SandboxId,
        snapshot_id: &SnapshotId,
    ) -> Result<(), ProviderError> {
        let dir = self.running_dir(id)?;
        let target = self.snapshot_dir(snapshot_id);
        copy_dir(&dir, &target).await?;
        self.inner.lock().snapshots.insert(snapshot_id.clone(), target);
        Ok(())
    }

    async fn restore(&self, snapshot_id: &SnapshotId) -> Result<Sandbox, ProviderError> {
        let source = self
            .inner
            .lock()
            .snapshots
            .get(snapshot_id)
            .cloned()
            .ok_or_else(|| ProviderError::SnapshotNotFound(snapshot_id.clone()))?;

        let id = SandboxId::generate();
        let dir = self.sandbox_dir(&id);
        copy_dir(&source, &dir).await?;

        let meta = tokio::fs::read(dir.join(META_FILE)).await?;
        let mut record: Sandbox = serde_json::from_slice(&meta)
            .map_err(|e| ProviderError::Unavailable(format!("corrupt sandbox meta: {e}")))?;
        record.id = id.clone();
        record.status = SandboxStatus::Running;
        record.created_at_ms = epoch_ms();

        let meta = serde_json::to_vec(&record)
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        tokio::fs::write(dir.join(META_FILE), meta).await?;

        self.inner.lock().sandboxes.insert(
            id,
            LocalSandbox { record: record.clone(), dir, sinks: HashMap::new() },
        );
        Ok(record)
    }

    async fn delete_snapshot(&self, snapshot_id: &SnapshotId) -> Result<(), ProviderError> {
        let Some(dir) = self.inner.lock().snapshots.remove(snapshot_id) else {
            return Ok(());
        };
        if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
            warn!(snapshot = %snapshot_id, error = %e, "failed to remove snapshot dir");
        }
        Ok(())
    }

    async fn execute(
        &self,
        id: &SandboxId,
        req: ExecRequest,
    ) -> Result<ExecOutput, ProviderError> {
        let dir = self.running_dir(id)?;
        let output = Self::run_command(&dir, &req).await?;

        // Mirror stdout into the exec log channel for attached streams.
        if !output.stdout.is_empty() {
            let sink = {
                let mut inner = self.inner.lock();
                inner
                    .sandboxes
                    .get_mut(id)
                    .map(|s| s.sinks.entry("exec".to_string()).or_default().clone())
            };
            if let Some(sink) = sink {
                sink.publish_lines(&output.stdout);
            }
        }
        Ok(output)
    }

    async fn stream_logs(
        &self,
        id: &SandboxId,
        service: &str,
    ) -> Result<LogStream, ProviderError> {
        let mut inner = self.inner.lock();
        let sandbox =
            inner.sandboxes.get_mut(id).ok_or_else(|| ProviderError::NotFound(id.clone()))?;
        Ok(sandbox.sinks.entry(service.to_string()).or_default().subscribe())
    }

    async fn git_status(&self, id: &SandboxId) -> Result<GitStatus, ProviderError> {
        let dir = self.running_dir(id)?;
        self.read_git_status(&dir).await
    }

    async fn sync_git(&self, id: &SandboxId) -> Result<GitStatus, ProviderError> {
        let dir = self.running_dir(id)?;
        let pull = self.git(&dir, &["pull", "--ff-only", "--quiet"]).await?;
        if pull.exit_code != 0 {
            return Err(ProviderError::Unavailable(format!(
                "git pull failed: {}",
                pull.stderr.trim()
            )));
        }
        self.read_git_status(&dir).await
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
