// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lossy per-subscriber log streaming.
//!
//! Each (sandbox, service) pair has one [`LogSink`] producing lines and any
//! number of [`LogStream`] subscribers. A slow subscriber skips lines it
//! missed instead of blocking the producer; the skip count is reported on
//! the stream. Streams end when the sink is dropped (service stopped) or
//! the sandbox is terminated.

use tokio::sync::broadcast;

/// Buffered lines per subscriber before the channel starts dropping.
const CHANNEL_CAPACITY: usize = 256;

/// Producer half of a service log channel.
#[derive(Debug, Clone)]
pub struct LogSink {
    tx: broadcast::Sender<String>,
}

impl LogSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish one line. Lines published with no subscribers are dropped.
    pub fn publish(&self, line: impl Into<String>) {
        let _ = self.tx.send(line.into());
    }

    /// Publish every line of a block of output.
    pub fn publish_lines(&self, text: &str) {
        for line in text.lines() {
            self.publish(line);
        }
    }

    pub fn subscribe(&self) -> LogStream {
        LogStream { rx: self.tx.subscribe(), dropped: 0 }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

/// Consumer half: a lazy, finite-when-the-service-stops sequence of lines.
pub struct LogStream {
    rx: broadcast::Receiver<String>,
    dropped: u64,
}

impl LogStream {
    /// Next line, or `None` once the producing service has stopped.
    /// Lagged gaps are skipped and counted, never surfaced as errors.
    pub async fn next(&mut self) -> Option<String> {
        loop {
            match self.rx.recv().await {
                Ok(line) => return Some(line),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    self.dropped += n;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Lines this subscriber missed due to backpressure.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
#[path = "logs_tests.rs"]
mod tests;
