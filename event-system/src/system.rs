// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::event::{Event, EventKind};
use crate::handle::EventSystemHandle;
use crate::handler::EventHandler;
use crate::mediator::MediatorRegistry;

/// Deterministic single-consumer event dispatcher.
///
/// Handlers register for concrete event kinds; `raise_event` (reachable through
/// `handle()`) enqueues in FIFO order and `run` drains the queue on one logical task,
/// handing each event to every handler registered for its kind, in registration
/// order. There is no parallelism: `run` awaits each handler's `handle` call to
/// completion before moving to the next event.
pub struct EventSystem<E: Event> {
    handle: EventSystemHandle<E>,
    receiver: UnboundedReceiver<E>,
    handlers: HashMap<EventKind, Vec<Arc<dyn EventHandler<E>>>>,
    fatal_check: Option<Box<dyn Fn(&anyhow::Error) -> bool + Send + Sync>>,
    aborted: Option<anyhow::Error>,
}

impl<E: Event> EventSystem<E> {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mediators = Arc::new(Mutex::new(MediatorRegistry::new()));
        Self {
            handle: EventSystemHandle::new(sender, mediators),
            receiver,
            handlers: HashMap::new(),
            fatal_check: None,
            aborted: None,
        }
    }

    /// Registers the predicate `dispatch` uses to tell a fatal handler error apart
    /// from a routine one. A fatal error stops `run`/`drain_ready` from processing
    /// any further queued event instead of being logged and ignored; callers read
    /// back the cause via `abort_error`. Domain code (e.g. the consensus engine root)
    /// supplies this rather than the dispatcher knowing about any concrete error type.
    pub fn set_fatal_predicate(&mut self, predicate: impl Fn(&anyhow::Error) -> bool + Send + Sync + 'static) {
        self.fatal_check = Some(Box::new(predicate));
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }

    pub fn abort_error(&self) -> Option<&anyhow::Error> {
        self.aborted.as_ref()
    }

    /// A cheap, cloneable handle for raising events and reaching mediators from layer
    /// code that is itself invoked as a handler (see `EventSystemHandle` for why the
    /// two halves are split).
    pub fn handle(&self) -> EventSystemHandle<E> {
        self.handle.clone()
    }

    pub fn register_handler(&mut self, kind: EventKind, handler: Arc<dyn EventHandler<E>>) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Enqueues `event` for delivery. Equivalent to `self.handle().raise_event(event)`.
    pub fn raise_event(&self, event: E) {
        self.handle.raise_event(event);
    }

    /// Drains the queue forever. Run as the node's single logical task; never spawned
    /// more than once per engine. Stops early, without draining the rest of the
    /// channel, if a handler raises an error `set_fatal_predicate` classifies fatal.
    pub async fn run(&mut self) {
        while let Some(event) = self.receiver.recv().await {
            self.dispatch(event).await;
            if self.aborted.is_some() {
                break;
            }
        }
    }

    /// Drains whatever is currently queued without blocking for more, returning the
    /// number of events processed. Useful in tests that want deterministic stepping
    /// instead of an unbounded `run` loop. Stops early on a fatal handler error, same
    /// as `run`.
    pub async fn drain_ready(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.dispatch(event).await;
            processed += 1;
            if self.aborted.is_some() {
                break;
            }
        }
        processed
    }

    async fn dispatch(&mut self, event: E) {
        if self.aborted.is_some() {
            return;
        }
        if let Some(handlers) = self.handlers.get(event.kind()) {
            for handler in handlers {
                if let Err(error) = handler.handle(event.clone()).await {
                    let fatal = self.fatal_check.as_ref().is_some_and(|check| check(&error));
                    if fatal {
                        tracing::error!(kind = event.kind(), %error, "fatal handler error, aborting engine");
                        self.aborted = Some(error);
                        return;
                    }
                    tracing::error!(kind = event.kind(), %error, "event handler returned an error");
                }
            }
        }
    }
}

impl<E: Event> Default for EventSystem<E> {
    fn default() -> Self {
        Self::new()
    }
}
