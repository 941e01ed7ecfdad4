// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear_env() {
    std::env::remove_var("ENS_STATE_DIR");
    std::env::remove_var("ENS_STATE_STORE");
    std::env::remove_var("ENS_IPC_TIMEOUT_MS");
}

#[test]
#[serial]
fn explicit_state_dir_wins() {
    clear_env();
    std::env::set_var("ENS_STATE_DIR", "/tmp/ens-test-state");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/ens-test-state"));
    clear_env();
}

#[test]
#[serial]
fn state_dir_falls_back_to_home() {
    clear_env();
    std::env::remove_var("XDG_STATE_HOME");
    std::env::set_var("HOME", "/home/tester");
    assert_eq!(state_dir().unwrap(), PathBuf::from("/home/tester/.local/state/ens"));
    clear_env();
}

#[test]
#[serial]
fn store_kind_parses() {
    clear_env();
    assert_eq!(state_store().unwrap(), StoreKind::File);

    std::env::set_var("ENS_STATE_STORE", "memory");
    assert_eq!(state_store().unwrap(), StoreKind::Memory);

    std::env::set_var("ENS_STATE_STORE", "sqlite");
    assert!(matches!(state_store(), Err(EnvError::UnknownStore(_))));
    clear_env();
}

#[test]
#[serial]
fn ipc_timeout_parses_millis() {
    clear_env();
    assert_eq!(ipc_timeout(), Duration::from_secs(5));
    std::env::set_var("ENS_IPC_TIMEOUT_MS", "250");
    assert_eq!(ipc_timeout(), Duration::from_millis(250));
    clear_env();
}
