// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ens_core::{PromptId, QueueError};
use std::sync::atomic::{AtomicU32, Ordering};

#[test]
fn queue_errors_map_onto_taxonomy() {
    assert!(matches!(EngineError::from(QueueError::Full), EngineError::ResourceExhausted(_)));
    assert!(matches!(
        EngineError::from(QueueError::NotFound(PromptId::from_string("prm_x"))),
        EngineError::NotFound(_)
    ));
    assert!(matches!(
        EngineError::from(QueueError::ReorderDisabled),
        EngineError::Validation(_)
    ));
}

#[test]
fn store_close_is_fatal() {
    let e = EngineError::from(ens_storage::StoreError::Closed);
    assert!(matches!(e, EngineError::Fatal(_)));
    assert!(!e.is_transient());
}

#[tokio::test]
async fn retry_retries_transient_up_to_bound() {
    let attempts = AtomicU32::new(0);
    let result: Result<u32, EngineError> = retry("op", 3, || {
        let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n < 3 {
                Err(EngineError::Transient("flaky".to_string()))
            } else {
                Ok(n)
            }
        }
    })
    .await;
    assert_eq!(result.unwrap(), 3);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_gives_up_after_bound() {
    let attempts = AtomicU32::new(0);
    let result: Result<(), EngineError> = retry("op", 3, || {
        attempts.fetch_add(1, Ordering::SeqCst);
        async { Err(EngineError::Transient("still flaky".to_string())) }
    })
    .await;
    assert!(matches!(result, Err(EngineError::Transient(_))));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_does_not_retry_permanent_errors() {
    let attempts = AtomicU32::new(0);
    let result: Result<(), EngineError> = retry("op", 3, || {
        attempts.fetch_add(1, Ordering::SeqCst);
        async { Err(EngineError::NotFound("gone".to_string())) }
    })
    .await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}
