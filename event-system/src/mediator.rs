// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// A stateful, recordable capability attached to the event system — delayed timers,
/// message pools, and similar side-effectful helpers that need to be swapped wholesale
/// between live and replay execution without touching layer code.
pub trait Mediator: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Registry of mediators keyed by concrete type, mirroring how the event system hosts
/// exactly one instance of each mediator kind (`DelayedEventMediator` and whatever
/// other stateful capabilities a given domain registers).
#[derive(Default)]
pub struct MediatorRegistry {
    mediators: HashMap<TypeId, Box<dyn Mediator>>,
}

impl MediatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<M: Mediator>(&mut self, mediator: M) {
        self.mediators.insert(TypeId::of::<M>(), Box::new(mediator));
    }

    pub fn get<M: Mediator>(&self) -> Option<&M> {
        self.mediators
            .get(&TypeId::of::<M>())
            .and_then(|m| m.as_any().downcast_ref::<M>())
    }

    pub fn get_mut<M: Mediator>(&mut self) -> Option<&mut M> {
        self.mediators
            .get_mut(&TypeId::of::<M>())
            .and_then(|m| m.as_any_mut().downcast_mut::<M>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(u32);

    impl Mediator for Counter {
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn register_then_get_round_trips() {
        let mut registry = MediatorRegistry::new();
        registry.register(Counter(7));
        assert_eq!(registry.get::<Counter>().unwrap().0, 7);

        registry.get_mut::<Counter>().unwrap().0 = 9;
        assert_eq!(registry.get::<Counter>().unwrap().0, 9);
    }

    #[test]
    fn missing_mediator_is_none() {
        let registry = MediatorRegistry::new();
        assert!(registry.get::<Counter>().is_none());
    }
}
