// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session actors.
//!
//! All mutations to one session are executed on that session's actor in the
//! order received: load from the store, run the mutation, bump the version,
//! persist, publish. Reads bypass the actor and observe a consistent
//! snapshot from the store.
//!
//! A mutation closure returns the events its operation emits. The version
//! bumps by exactly 1 iff the closure emitted events, so no-op operations
//! (idempotent re-join, releasing an un-held lock) leave the version alone.
//! Closures that build a [`ens_core::Event::StateChanged`] see the
//! pre-bump version and add 1 themselves.

use crate::bus::EventBus;
use crate::error::{retry, EngineError, DEFAULT_RETRY_ATTEMPTS};
use ens_core::{Clock, Event, Session, SessionId};
use ens_storage::SessionStore;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

/// Mailbox depth per session actor.
const MAILBOX_CAPACITY: usize = 64;

type Reply = oneshot::Sender<Result<Box<dyn Any + Send>, EngineError>>;
type Mutation =
    Box<dyn FnOnce(&mut Session) -> Result<(Box<dyn Any + Send>, Vec<Event>), EngineError> + Send>;

struct ActorMsg {
    mutate: Mutation,
    reply: Reply,
}

/// Registry of live session actors.
pub struct SessionActors<C: Clock> {
    store: Arc<dyn SessionStore>,
    bus: EventBus<C>,
    mailboxes: Mutex<HashMap<SessionId, mpsc::Sender<ActorMsg>>>,
}

impl<C: Clock> SessionActors<C> {
    pub fn new(store: Arc<dyn SessionStore>, bus: EventBus<C>) -> Arc<Self> {
        Arc::new(Self { store, bus, mailboxes: Mutex::new(HashMap::new()) })
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Read a consistent snapshot without going through the actor.
    pub async fn read(&self, id: &SessionId) -> Result<Session, EngineError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("session {id}")))
    }

    /// Run a mutation on the session's actor.
    ///
    /// The closure returns a value for the caller plus the events to
    /// publish. Events are published only after a successful persist.
    pub async fn update<R, F>(&self, id: &SessionId, f: F) -> Result<R, EngineError>
    where
        R: Send + 'static,
        F: FnOnce(&mut Session) -> Result<(R, Vec<Event>), EngineError> + Send + 'static,
    {
        let mutate: Mutation = Box::new(move |session| {
            f(session).map(|(value, events)| (Box::new(value) as Box<dyn Any + Send>, events))
        });

        let (reply, rx) = oneshot::channel();
        let sender = self.mailbox(id);
        sender
            .send(ActorMsg { mutate, reply })
            .await
            .map_err(|_| EngineError::NotFound(format!("session {id}")))?;

        let boxed = rx
            .await
            .map_err(|_| EngineError::NotFound(format!("session {id}")))??;
        boxed
            .downcast::<R>()
            .map(|v| *v)
            .map_err(|_| EngineError::Fatal("actor reply type mismatch".to_string()))
    }

    /// Stop a session's actor. Queued operations already in the mailbox
    /// still run; new sends go to a fresh actor if the session survives.
    pub fn stop(&self, id: &SessionId) {
        self.mailboxes.lock().remove(id);
    }

    /// Drop every mailbox. In-flight operations drain, then actors exit.
    pub fn shutdown(&self) {
        self.mailboxes.lock().clear();
    }

    fn mailbox(&self, id: &SessionId) -> mpsc::Sender<ActorMsg> {
        let mut mailboxes = self.mailboxes.lock();
        if let Some(sender) = mailboxes.get(id) {
            if !sender.is_closed() {
                return sender.clone();
            }
        }
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        let store = Arc::clone(&self.store);
        let bus = self.bus.clone();
        let actor_id = id.clone();
        tokio::spawn(async move {
            run_actor(actor_id, store, bus, rx).await;
        });
        mailboxes.insert(id.clone(), tx.clone());
        tx
    }
}

async fn run_actor<C: Clock>(
    id: SessionId,
    store: Arc<dyn SessionStore>,
    bus: EventBus<C>,
    mut rx: mpsc::Receiver<ActorMsg>,
) {
    debug!(session = %id, "actor started");
    while let Some(msg) = rx.recv().await {
        let store_ref = &store;
        let id_ref = &id;
        let loaded = retry("store.get", DEFAULT_RETRY_ATTEMPTS, || async move {
            store_ref.get(id_ref).await.map_err(EngineError::from)
        })
        .await;
        let mut session = match loaded {
            Ok(Some(session)) => session,
            Ok(None) => {
                let _ = msg.reply.send(Err(EngineError::NotFound(format!("session {id}"))));
                continue;
            }
            Err(e) => {
                if matches!(e, EngineError::Fatal(_)) {
                    error!(session = %id, error = %e, "fatal error loading session");
                }
                let _ = msg.reply.send(Err(e));
                continue;
            }
        };

        match (msg.mutate)(&mut session) {
            Err(e) => {
                // The aggregate copy is discarded; failed ops mutate nothing.
                if matches!(e, EngineError::Fatal(_)) {
                    error!(session = %id, error = %e, "fatal error applying mutation");
                }
                let _ = msg.reply.send(Err(e));
            }
            Ok((value, events)) => {
                if events.is_empty() {
                    let _ = msg.reply.send(Ok(value));
                    continue;
                }
                session.state.version += 1;
                let persisted = retry("store.set", DEFAULT_RETRY_ATTEMPTS, || {
                    let session = session.clone();
                    async move { store_ref.set(session).await.map_err(EngineError::from) }
                })
                .await;
                match persisted {
                    Ok(()) => {
                        bus.publish_all(events);
                        let _ = msg.reply.send(Ok(value));
                    }
                    Err(e) => {
                        error!(session = %id, error = %e, "failed to persist session");
                        let _ = msg.reply.send(Err(e));
                    }
                }
            }
        }
    }
    debug!(session = %id, "actor stopped");
}

#[cfg(test)]
#[path = "actor_tests.rs"]
mod tests;
