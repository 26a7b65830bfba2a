// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;

use crate::event::Event;
use crate::mediator::{Mediator, MediatorRegistry};

/// Cheap, cloneable handle into a running `EventSystem`.
///
/// Layers hold a handle rather than the `EventSystem` itself: the system needs to call
/// into layer code as a registered `EventHandler`, and layer code needs to call back
/// into the system to raise events and reach mediators. Splitting the "dispatch" half
/// (owned solely by `EventSystem`) from the "raise + mediate" half (this handle)
/// avoids a reference cycle between the two.
pub struct EventSystemHandle<E: Event> {
    sender: UnboundedSender<E>,
    mediators: Arc<Mutex<MediatorRegistry>>,
}

impl<E: Event> Clone for EventSystemHandle<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            mediators: self.mediators.clone(),
        }
    }
}

impl<E: Event> EventSystemHandle<E> {
    pub(crate) fn new(sender: UnboundedSender<E>, mediators: Arc<Mutex<MediatorRegistry>>) -> Self {
        Self { sender, mediators }
    }

    /// Enqueues `event` for delivery, in the order this was called relative to other
    /// `raise_event` calls on the same handle or its siblings.
    pub fn raise_event(&self, event: E) {
        let _ = self.sender.send(event);
    }

    pub fn register_mediator<M: Mediator>(&self, mediator: M) {
        self.mediators
            .lock()
            .expect("mediator registry mutex poisoned")
            .register(mediator);
    }

    /// Runs `f` against the registered mediator of type `M`, if any. The closure must
    /// be synchronous — mediator operations (`execute`, pool lookups) never need to
    /// await, so no lock is ever held across a suspension point.
    pub fn with_mediator<M: Mediator, R>(&self, f: impl FnOnce(&mut M) -> R) -> Option<R> {
        let mut registry = self.mediators.lock().expect("mediator registry mutex poisoned");
        registry.get_mut::<M>().map(f)
    }
}
