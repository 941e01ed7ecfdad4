// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process typed pub/sub.
//!
//! Multi-producer, multi-consumer. Delivery is best-effort fire-and-forget
//! per subscriber: a slow subscriber skips envelopes it missed instead of
//! blocking publishers, and an erroring subscriber affects nobody else.

use ens_core::{Clock, Event};
use tokio::sync::broadcast;

/// Buffered envelopes per subscriber before the channel starts dropping.
const BUS_CAPACITY: usize = 1024;

/// An event stamped with its publish time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub at_ms: u64,
    pub event: Event,
}

/// Typed event bus consumed by the lifecycle, the gate, and telemetry.
pub struct EventBus<C: Clock> {
    tx: broadcast::Sender<Envelope>,
    clock: C,
}

impl<C: Clock> Clone for EventBus<C> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone(), clock: self.clock.clone() }
    }
}

impl<C: Clock> EventBus<C> {
    pub fn new(clock: C) -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx, clock }
    }

    /// Publish one event. Never blocks; events published with no
    /// subscribers are dropped.
    pub fn publish(&self, event: Event) {
        tracing::debug!(event = %event.log_summary(), "publish");
        let _ = self.tx.send(Envelope { at_ms: self.clock.epoch_ms(), event });
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.publish(event);
        }
    }

    pub fn subscribe(&self) -> BusSubscription {
        BusSubscription { rx: self.tx.subscribe(), dropped: 0 }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// One subscriber's view of the bus.
pub struct BusSubscription {
    rx: broadcast::Receiver<Envelope>,
    dropped: u64,
}

impl BusSubscription {
    /// Next envelope, or `None` once every bus handle is gone. Lagged gaps
    /// are skipped and counted, never surfaced as errors.
    pub async fn next(&mut self) -> Option<Envelope> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    self.dropped += n;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Envelopes this subscriber missed due to backpressure.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
