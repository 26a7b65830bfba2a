// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Debug;

/// String tag identifying a family of events a handler can register against. Kept as
/// a plain string rather than a generated discriminant so this crate stays agnostic of
/// any particular event enum shape.
pub type EventKind = &'static str;

/// An event that can flow through the dispatcher.
///
/// `is_deterministic` selects whether the event is eligible for the record log: the
/// initial bootstrap and externally-delayed events are marked non-deterministic and
/// never written.
pub trait Event: Clone + Debug + Send + Sync + 'static {
    fn kind(&self) -> EventKind;
    fn is_deterministic(&self) -> bool;
}
