// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

//! Root object wiring the Event System to the Order/Round/Sync stack.

use std::sync::Arc;

use consensus_types::{ConsensusError, DataFactory, Epoch, VoteFactory};
use event_system::mediators::delayed::{DelayedEventMediator, InstantExecutor};
use event_system::{EventHandler, EventKind, EventSystem, EventSystemHandle};

use crate::config::ConsensusConfig;
use crate::events::ConsensusEvent;
use crate::layers::order::OrderHandler;

/// One replica's consensus state machine. Owns the event dispatcher and the Order
/// layer; `run`/`drain_ready` mirror `EventSystem`'s own pump methods since this is
/// the only handler registered.
pub struct ConsensusEngine {
    system: EventSystem<ConsensusEvent>,
}

impl ConsensusEngine {
    /// Builds an engine wired with a live `InstantExecutor` for delayed events. Tests
    /// that need recording or replay construct the `EventSystem` and mediator
    /// themselves and use `ConsensusEngine::from_parts` instead.
    pub fn new(config: ConsensusConfig, data_factory: Arc<dyn DataFactory>, vote_factory: Arc<dyn VoteFactory>) -> Self {
        let mut system = EventSystem::<ConsensusEvent>::new();
        let handle = system.handle();
        handle.register_mediator(DelayedEventMediator::new(Box::new(InstantExecutor::new(handle.clone()))));
        Self::from_parts(system, handle, config, data_factory, vote_factory)
    }

    /// Wires `order` handlers onto an already-constructed `system`/`handle` pair,
    /// letting the caller pick the `DelayedEventMediator` executor (instant, record,
    /// or replay) before the engine starts processing events.
    pub fn from_parts(
        mut system: EventSystem<ConsensusEvent>,
        handle: EventSystemHandle<ConsensusEvent>,
        config: ConsensusConfig,
        data_factory: Arc<dyn DataFactory>,
        vote_factory: Arc<dyn VoteFactory>,
    ) -> Self {
        // A fatal `ConsensusError` (equivocation, a conflicting commit, quorum on
        // unverified data) indicates a safety bug rather than routine out-of-band
        // traffic; it must stop this engine rather than being logged and ignored like
        // every other handler error.
        system.set_fatal_predicate(|error| error.downcast_ref::<ConsensusError>().is_some_and(ConsensusError::is_fatal));

        let order = Arc::new(OrderHandler::new(config, data_factory, vote_factory, handle));
        system.register_handler("initialize", order.clone());
        system.register_handler("receive_data", order.clone());
        system.register_handler("receive_vote", order.clone());
        system.register_handler("round_end", order);
        Self { system }
    }

    pub fn handle(&self) -> EventSystemHandle<ConsensusEvent> {
        self.system.handle()
    }

    /// Registers an additional handler for `kind`, alongside the built-in Order
    /// wiring. Used by test harnesses to observe `RoundEnd`s or rebroadcast
    /// `BroadcastData`/`BroadcastVote` to peers — concerns the out-of-scope
    /// application shell would otherwise own.
    pub fn register_handler(&mut self, kind: EventKind, handler: Arc<dyn EventHandler<ConsensusEvent>>) {
        self.system.register_handler(kind, handler);
    }

    /// Starts a fresh epoch at round 0, chained from `genesis_id`.
    pub fn initialize(&self, epoch: Epoch, genesis_id: consensus_types::message::MessageId) {
        self.system.raise_event(ConsensusEvent::Initialize { epoch, genesis_id });
    }

    pub fn raise_event(&self, event: ConsensusEvent) {
        self.system.raise_event(event);
    }

    /// Runs the dispatcher until cancelled. Never returns in ordinary operation.
    pub async fn run(&mut self) {
        self.system.run().await;
    }

    /// Drains whatever is currently queued, including anything delayed events raised
    /// synchronously re-enqueue. Used by tests driving the clock manually.
    pub async fn drain_ready(&mut self) -> usize {
        self.system.drain_ready().await
    }

    /// True once a fatal `ConsensusError` has stopped this engine from processing
    /// further events.
    pub fn is_aborted(&self) -> bool {
        self.system.is_aborted()
    }

    pub fn abort_error(&self) -> Option<&anyhow::Error> {
        self.system.abort_error()
    }
}
