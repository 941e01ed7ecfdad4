// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::TestBed;
use ens_core::{Event, PromptStatus};

#[tokio::test]
async fn add_orders_by_priority_then_age() {
    let bed = TestBed::new();
    let id = bed.session_with_user("u1").await;
    let u = "u1".into();

    bed.queues.add(&id, &u, "A", Priority::Normal).await.unwrap();
    bed.clock.advance_ms(1);
    bed.queues.add(&id, &u, "B", Priority::High).await.unwrap();
    bed.clock.advance_ms(1);
    bed.queues.add(&id, &u, "C", Priority::Urgent).await.unwrap();
    bed.clock.advance_ms(1);
    bed.queues.add(&id, &u, "D", Priority::Normal).await.unwrap();

    let mut order = Vec::new();
    while let Some(prompt) = bed.queues.start_next(&id).await.unwrap() {
        order.push(prompt.content.clone());
        bed.queues.complete(&id).await.unwrap();
    }
    assert_eq!(order, ["C", "B", "A", "D"]);
}

#[tokio::test]
async fn start_next_is_single_flight() {
    let bed = TestBed::new();
    let id = bed.session_with_user("u1").await;
    let u = "u1".into();
    bed.queues.add(&id, &u, "one", Priority::Normal).await.unwrap();
    bed.queues.add(&id, &u, "two", Priority::Normal).await.unwrap();

    let first = bed.queues.start_next(&id).await.unwrap().unwrap();
    assert_eq!(first.status, PromptStatus::Executing);
    assert!(bed.queues.start_next(&id).await.unwrap().is_none());

    let done = bed.queues.complete(&id).await.unwrap().unwrap();
    assert_eq!(done.status, PromptStatus::Completed);
    assert_eq!(bed.queues.start_next(&id).await.unwrap().unwrap().content, "two");
}

#[tokio::test]
async fn cancel_enforces_authorship() {
    let bed = TestBed::new();
    let id = bed.session_with_user("u1").await;
    bed.sessions.join(&id, crate::multiplayer::JoinInput::new("u2", "U2")).await.unwrap();

    let prompt = bed.queues.add(&id, &"u1".into(), "p1", Priority::Normal).await.unwrap();

    assert!(!bed.queues.cancel(&id, &prompt.id, &"u2".into()).await.unwrap());
    assert!(bed.queues.cancel(&id, &prompt.id, &"u1".into()).await.unwrap());
    // Second cancel: the prompt is gone.
    assert!(!bed.queues.cancel(&id, &prompt.id, &"u1".into()).await.unwrap());
}

#[tokio::test]
async fn capacity_rejects_with_resource_exhausted() {
    let bed = TestBed::with_configs(
        Default::default(),
        QueueConfig { max_prompts: 2, allow_reorder: true },
    );
    let id = bed.session_with_user("u1").await;
    let u = "u1".into();

    bed.queues.add(&id, &u, "a", Priority::Normal).await.unwrap();
    bed.queues.add(&id, &u, "b", Priority::Normal).await.unwrap();
    let err = bed.queues.add(&id, &u, "c", Priority::Normal).await.unwrap_err();
    assert!(matches!(err, EngineError::ResourceExhausted(_)));
}

#[tokio::test]
async fn reorder_respects_config() {
    let disabled = TestBed::with_configs(
        Default::default(),
        QueueConfig { max_prompts: 10, allow_reorder: false },
    );
    let id = disabled.session_with_user("u1").await;
    let u = "u1".into();
    let prompt = disabled.queues.add(&id, &u, "a", Priority::Normal).await.unwrap();

    let err = disabled.queues.reorder(&id, &prompt.id, &u, 0).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn reorder_moves_and_clamps() {
    let bed = TestBed::new();
    let id = bed.session_with_user("u1").await;
    let u = "u1".into();
    let a = bed.queues.add(&id, &u, "a", Priority::Normal).await.unwrap();
    bed.clock.advance_ms(1);
    bed.queues.add(&id, &u, "b", Priority::Normal).await.unwrap();

    let landed = bed.queues.reorder(&id, &a.id, &u, 99).await.unwrap();
    assert_eq!(landed, 1);
    let (_, queue) = bed.queues.list(&id).await.unwrap();
    assert_eq!(queue[1].id, a.id);
}

#[tokio::test]
async fn queue_ops_emit_exactly_one_event_each() {
    let bed = TestBed::new();
    let id = bed.session_with_user("u1").await;
    let u = "u1".into();
    let mut sub = bed.bus.subscribe();

    bed.queues.add(&id, &u, "a", Priority::Normal).await.unwrap();
    bed.queues.start_next(&id).await.unwrap();
    bed.queues.complete(&id).await.unwrap();

    assert!(matches!(sub.next().await.unwrap().event, Event::PromptAdded { .. }));
    assert!(matches!(sub.next().await.unwrap().event, Event::PromptStarted { .. }));
    assert!(matches!(sub.next().await.unwrap().event, Event::PromptCompleted { .. }));
}

#[tokio::test]
async fn every_queue_op_bumps_version_by_one() {
    let bed = TestBed::new();
    let id = bed.session_with_user("u1").await;
    let u = "u1".into();

    let v0 = bed.sessions.get(&id).await.unwrap().state.version;
    bed.queues.add(&id, &u, "a", Priority::Normal).await.unwrap();
    let v1 = bed.sessions.get(&id).await.unwrap().state.version;
    bed.queues.start_next(&id).await.unwrap();
    let v2 = bed.sessions.get(&id).await.unwrap().state.version;
    bed.queues.complete(&id).await.unwrap();
    let v3 = bed.sessions.get(&id).await.unwrap().state.version;

    assert_eq!([v1 - v0, v2 - v1, v3 - v2], [1, 1, 1]);

    // A no-op start on an empty queue does not bump.
    bed.queues.start_next(&id).await.unwrap();
    assert_eq!(bed.sessions.get(&id).await.unwrap().state.version, v3);
}

#[tokio::test]
async fn clear_drops_everything_queued() {
    let bed = TestBed::new();
    let id = bed.session_with_user("u1").await;
    let u = "u1".into();
    bed.queues.add(&id, &u, "a", Priority::Normal).await.unwrap();
    bed.queues.add(&id, &u, "b", Priority::High).await.unwrap();

    assert_eq!(bed.queues.clear(&id).await.unwrap(), 2);
    let (active, queue) = bed.queues.list(&id).await.unwrap();
    assert!(active.is_none());
    assert!(queue.is_empty());
    // Clearing an empty queue is a no-op.
    assert_eq!(bed.queues.clear(&id).await.unwrap(), 0);
}
