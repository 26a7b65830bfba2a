// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

use crate::event::Event;

/// A registered consumer of events of a given kind. The dispatcher hands each event to
/// every handler registered for its `kind()`, in registration order.
#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync {
    async fn handle(&self, event: E) -> anyhow::Result<()>;
}
