// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ens_core::{CreateSandboxInput, ExecRequest, SnapshotId};
use tempfile::TempDir;

async fn open_provider() -> (TempDir, LocalProvider) {
    let dir = TempDir::new().unwrap();
    let provider = LocalProvider::open(dir.path().join("sandboxes")).await.unwrap();
    (dir, provider)
}

fn input() -> CreateSandboxInput {
    CreateSandboxInput::new("proj-1", "org/repo").branch("main")
}

#[tokio::test]
async fn create_makes_directory_and_running_record() {
    let (_dir, provider) = open_provider().await;
    let sandbox = provider.create(input()).await.unwrap();

    assert!(sandbox.status.is_running());
    assert_eq!(sandbox.repository, "org/repo");
    assert!(provider.sandbox_dir(&sandbox.id).join("sandbox.json").exists());
}

#[tokio::test]
async fn get_and_list_filter_by_project() {
    let (_dir, provider) = open_provider().await;
    let a = provider.create(input()).await.unwrap();
    provider.create(CreateSandboxInput::new("proj-2", "org/other")).await.unwrap();

    assert_eq!(provider.get(&a.id).await.unwrap().id, a.id);
    assert_eq!(provider.list(Some("proj-1")).await.unwrap().len(), 1);
    assert_eq!(provider.list(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn execute_runs_commands_in_sandbox_dir() {
    let (_dir, provider) = open_provider().await;
    let sandbox = provider.create(input()).await.unwrap();

    let out = provider
        .execute(&sandbox.id, ExecRequest::new(["sh", "-c", "echo hello; pwd"]))
        .await
        .unwrap();

    assert_eq!(out.exit_code, 0);
    assert!(out.stdout.starts_with("hello"));
    assert!(out.stdout.contains(sandbox.id.as_str()));
}

#[tokio::test]
async fn execute_reports_exit_codes_and_stderr() {
    let (_dir, provider) = open_provider().await;
    let sandbox = provider.create(input()).await.unwrap();

    let out = provider
        .execute(&sandbox.id, ExecRequest::new(["sh", "-c", "echo oops >&2; exit 3"]))
        .await
        .unwrap();

    assert_eq!(out.exit_code, 3);
    assert_eq!(out.stderr.trim(), "oops");
}

#[tokio::test]
async fn execute_times_out() {
    let (_dir, provider) = open_provider().await;
    let sandbox = provider.create(input()).await.unwrap();

    let err = provider
        .execute(&sandbox.id, ExecRequest::new(["sleep", "10"]).timeout_ms(50u64))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Timeout));
}

#[tokio::test]
async fn execute_distinguishes_missing_from_stopped() {
    let (_dir, provider) = open_provider().await;
    let sandbox = provider.create(input()).await.unwrap();

    provider.stop(&sandbox.id).await.unwrap();
    let err = provider.execute(&sandbox.id, ExecRequest::new(["true"])).await.unwrap_err();
    assert!(matches!(err, ProviderError::NotRunning(_)));

    let err = provider
        .execute(&"sbx_gone".into(), ExecRequest::new(["true"]))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::NotFound(_)));
}

#[tokio::test]
async fn terminate_removes_sandbox() {
    let (_dir, provider) = open_provider().await;
    let sandbox = provider.create(input()).await.unwrap();
    let dir = provider.sandbox_dir(&sandbox.id);

    provider.terminate(&sandbox.id).await.unwrap();

    assert!(!dir.exists());
    assert!(matches!(provider.get(&sandbox.id).await, Err(ProviderError::NotFound(_))));
}

#[tokio::test]
async fn snapshot_restore_round_trips_files() {
    let (_dir, provider) = open_provider().await;
    let sandbox = provider.create(input()).await.unwrap();
    provider
        .execute(&sandbox.id, ExecRequest::new(["sh", "-c", "echo state > work.txt"]))
        .await
        .unwrap();

    let snapshot_id = SnapshotId::generate();
    provider.snapshot(&sandbox.id, &snapshot_id).await.unwrap();
    provider.terminate(&sandbox.id).await.unwrap();

    let restored = provider.restore(&snapshot_id).await.unwrap();
    assert_ne!(restored.id, sandbox.id);
    assert_eq!(restored.repository, "org/repo");

    let out = provider
        .execute(&restored.id, ExecRequest::new(["cat", "work.txt"]))
        .await
        .unwrap();
    assert_eq!(out.stdout.trim(), "state");
}

#[tokio::test]
async fn restore_unknown_snapshot_fails() {
    let (_dir, provider) = open_provider().await;
    let err = provider.restore(&SnapshotId::generate()).await.unwrap_err();
    assert!(matches!(err, ProviderError::SnapshotNotFound(_)));
}

#[tokio::test]
async fn delete_snapshot_is_idempotent() {
    let (_dir, provider) = open_provider().await;
    let sandbox = provider.create(input()).await.unwrap();
    let snapshot_id = SnapshotId::generate();
    provider.snapshot(&sandbox.id, &snapshot_id).await.unwrap();

    provider.delete_snapshot(&snapshot_id).await.unwrap();
    provider.delete_snapshot(&snapshot_id).await.unwrap();
    assert!(matches!(
        provider.restore(&snapshot_id).await,
        Err(ProviderError::SnapshotNotFound(_))
    ));
}

#[tokio::test]
async fn git_status_on_plain_dir_is_unavailable() {
    let (_dir, provider) = open_provider().await;
    let sandbox = provider.create(input()).await.unwrap();
    let err = provider.git_status(&sandbox.id).await.unwrap_err();
    assert!(matches!(err, ProviderError::Unavailable(_)));
}

#[tokio::test]
async fn exec_output_mirrors_into_log_stream() {
    let (_dir, provider) = open_provider().await;
    let sandbox = provider.create(input()).await.unwrap();
    let mut stream = provider.stream_logs(&sandbox.id, "exec").await.unwrap();

    provider
        .execute(&sandbox.id, ExecRequest::new(["echo", "streamed"]))
        .await
        .unwrap();

    assert_eq!(stream.next().await.as_deref(), Some("streamed"));
}
