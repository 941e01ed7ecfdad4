// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn subscribers_receive_published_lines() {
    let sink = LogSink::new();
    let mut stream = sink.subscribe();

    sink.publish("one");
    sink.publish("two");

    assert_eq!(stream.next().await.as_deref(), Some("one"));
    assert_eq!(stream.next().await.as_deref(), Some("two"));
}

#[tokio::test]
async fn stream_ends_when_sink_drops() {
    let sink = LogSink::new();
    let mut stream = sink.subscribe();
    sink.publish("last");
    drop(sink);

    assert_eq!(stream.next().await.as_deref(), Some("last"));
    assert_eq!(stream.next().await, None);
}

#[tokio::test]
async fn lines_before_subscription_are_not_replayed() {
    let sink = LogSink::new();
    sink.publish("early");
    let mut stream = sink.subscribe();
    sink.publish("later");

    assert_eq!(stream.next().await.as_deref(), Some("later"));
}

#[tokio::test]
async fn slow_subscriber_skips_lagged_lines() {
    let sink = LogSink::new();
    let mut stream = sink.subscribe();

    // Overflow the per-subscriber buffer.
    for i in 0..600 {
        sink.publish(format!("line-{i}"));
    }
    drop(sink);

    let first = stream.next().await.unwrap();
    // The earliest lines were dropped, not delivered late.
    assert_ne!(first, "line-0");
    assert!(stream.dropped() > 0);

    // The stream still drains to completion.
    let mut count = 1;
    while stream.next().await.is_some() {
        count += 1;
    }
    assert!(count <= 256);
}

#[tokio::test]
async fn publish_lines_splits_blocks() {
    let sink = LogSink::new();
    let mut stream = sink.subscribe();
    sink.publish_lines("a\nb\nc\n");

    assert_eq!(stream.next().await.as_deref(), Some("a"));
    assert_eq!(stream.next().await.as_deref(), Some("b"));
    assert_eq!(stream.next().await.as_deref(), Some("c"));
}

#[tokio::test]
async fn each_subscriber_gets_every_line() {
    let sink = LogSink::new();
    let mut a = sink.subscribe();
    let mut b = sink.subscribe();
    assert_eq!(sink.subscriber_count(), 2);

    sink.publish("shared");
    assert_eq!(a.next().await.as_deref(), Some("shared"));
    assert_eq!(b.next().await.as_deref(), Some("shared"));
}
