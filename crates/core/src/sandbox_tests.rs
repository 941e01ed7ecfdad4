// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn pool_key_display_includes_optional_parts() {
    let bare = PoolKey::new("org/repo");
    assert_eq!(bare.to_string(), "org/repo");

    let full = PoolKey::new("org/repo").branch("main").image_tag("v2");
    assert_eq!(full.to_string(), "org/repo@main#v2");
}

#[test]
fn create_input_maps_to_pool_key() {
    let input = CreateSandboxInput::new("proj-1", "org/repo").branch("main");
    let key = input.pool_key();
    assert_eq!(key.repository, "org/repo");
    assert_eq!(key.branch.as_deref(), Some("main"));
    assert!(key.image_tag.is_none());
}

#[test]
fn exec_request_setters() {
    let req = ExecRequest::new(["git", "status"]).timeout_ms(5_000u64);
    assert_eq!(req.argv, ["git", "status"]);
    assert_eq!(req.timeout_ms, Some(5_000));
    assert!(req.cwd.is_none());
}

#[test]
fn sandbox_status_predicates() {
    assert!(SandboxStatus::Running.is_running());
    assert!(!SandboxStatus::Stopped.is_running());
    assert_eq!(SandboxStatus::Terminated.to_string(), "terminated");
}
