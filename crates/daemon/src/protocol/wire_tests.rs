// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::protocol::{Request, Response};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(1);

#[test]
fn encode_prefixes_payload_length() {
    let frame = encode(&Request::Ping).unwrap();
    let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
    assert_eq!(len, frame.len() - 4);
    let parsed: Request = decode(&frame[4..]).unwrap();
    assert_eq!(parsed, Request::Ping);
}

#[tokio::test]
async fn read_write_round_trips() {
    let (mut client, mut server) = tokio::io::duplex(4096);

    write_message(&mut client, &Request::Status).await.unwrap();
    let request: Request = read_message(&mut server, TIMEOUT).await.unwrap();
    assert_eq!(request, Request::Status);

    write_message(&mut server, &Response::Pong).await.unwrap();
    let response: Response = read_message(&mut client, TIMEOUT).await.unwrap();
    assert_eq!(response, Response::Pong);
}

#[tokio::test]
async fn closed_connection_is_distinguished() {
    let (client, mut server) = tokio::io::duplex(64);
    drop(client);

    let result: Result<Request, _> = read_message(&mut server, TIMEOUT).await;
    assert!(matches!(result, Err(ProtocolError::ConnectionClosed)));
}

#[tokio::test]
async fn oversized_frames_are_rejected() {
    let (mut client, mut server) = tokio::io::duplex(64);
    tokio::spawn(async move {
        use tokio::io::AsyncWriteExt;
        let _ = client.write_all(&u32::MAX.to_be_bytes()).await;
    });

    let result: Result<Request, _> = read_message(&mut server, TIMEOUT).await;
    assert!(matches!(result, Err(ProtocolError::FrameTooLarge(_))));
}

#[tokio::test]
async fn slow_peers_time_out() {
    let (_client, mut server) = tokio::io::duplex(64);
    let result: Result<Request, _> =
        read_message(&mut server, Duration::from_millis(20)).await;
    assert!(matches!(result, Err(ProtocolError::Timeout)));
}

#[test]
fn malformed_payloads_error() {
    let result: Result<Request, _> = decode(b"{\"type\":\"NoSuchRequest\"}");
    assert!(matches!(result, Err(ProtocolError::Malformed(_))));
}
