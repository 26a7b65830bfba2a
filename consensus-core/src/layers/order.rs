// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

//! Outermost admission filter: classifies incoming data/votes by round relative to the
//! currently open round, and owns the live Sync+Round pair.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use consensus_types::message::MessageId;
use consensus_types::{Data, DataFactory, Epoch, Vote, VoteFactory};
use event_system::{EventHandler, EventSystemHandle};

use crate::config::ConsensusConfig;
use crate::counters;
use crate::events::ConsensusEvent;
use crate::layers::sync::SyncLayer;
use crate::pool::MessagePool;

struct OrderState {
    epoch: Option<Epoch>,
    open_round: u64,
    commit_id: MessageId,
    commit_number: u64,
    config: ConsensusConfig,
    data_factory: Arc<dyn DataFactory>,
    vote_factory: Arc<dyn VoteFactory>,
    pool: MessagePool,
    active: Option<SyncLayer>,
    future_data: HashMap<u64, Vec<Data>>,
    future_votes: HashMap<u64, Vec<Vote>>,
    handle: EventSystemHandle<ConsensusEvent>,
}

impl OrderState {
    async fn initialize(&mut self, epoch: Epoch, genesis_id: MessageId) -> anyhow::Result<()> {
        self.pool.prune_epoch(epoch.num());
        self.epoch = Some(epoch.clone());
        self.commit_id = genesis_id;
        self.commit_number = 0;
        self.future_data.clear();
        self.future_votes.clear();
        self.start_round(epoch, 0).await
    }

    async fn start_round(&mut self, epoch: Epoch, round_num: u64) -> anyhow::Result<()> {
        self.open_round = round_num;
        counters::CURRENT_OPEN_ROUND.set(round_num as i64);
        tracing::debug!(epoch_num = epoch.num(), round_num, "round start");
        self.handle.raise_event(ConsensusEvent::RoundStart { epoch_num: epoch.num(), round_num });

        let mut sync = SyncLayer::new(
            epoch.clone(),
            round_num,
            self.commit_id.clone(),
            self.commit_number,
            self.config,
            self.data_factory.clone(),
            self.vote_factory.clone(),
        );
        let events = sync.start(&mut self.pool, &self.handle).await?;
        self.active = Some(sync);
        for event in events {
            self.handle.raise_event(event);
        }

        if let Some(buffered) = self.future_data.remove(&round_num) {
            for data in buffered {
                self.handle.raise_event(ConsensusEvent::ReceiveData { data });
            }
        }
        if let Some(buffered) = self.future_votes.remove(&round_num) {
            for vote in buffered {
                self.handle.raise_event(ConsensusEvent::ReceiveVote { vote });
            }
        }
        Ok(())
    }

    fn current_epoch(&self) -> Option<&Epoch> {
        self.epoch.as_ref()
    }

    async fn on_receive_data(&mut self, data: Data) -> anyhow::Result<()> {
        let Some(epoch) = self.current_epoch().cloned() else {
            tracing::debug!("dropping data received before initialize");
            return Ok(());
        };
        if data.epoch_num() != epoch.num() {
            counters::ADMISSION_REJECTIONS.with_label_values(&["invalid_term"]).inc();
            return Ok(());
        }
        match data.round_num().cmp(&self.open_round) {
            Ordering::Equal => {
                let active = self.active.as_mut().expect("active round must exist once initialized");
                let events = active.receive_data(data, &mut self.pool, &self.handle).await?;
                for event in events {
                    self.handle.raise_event(event);
                }
            }
            Ordering::Greater => {
                self.future_data.entry(data.round_num()).or_default().push(data);
            }
            Ordering::Less => {
                if self.open_round.saturating_sub(data.round_num()) <= self.config.past_round_window {
                    self.pool.insert_data(data);
                }
            }
        }
        Ok(())
    }

    async fn on_receive_vote(&mut self, vote: Vote) -> anyhow::Result<()> {
        let Some(epoch) = self.current_epoch().cloned() else {
            tracing::debug!("dropping vote received before initialize");
            return Ok(());
        };
        if vote.epoch_num() != epoch.num() {
            counters::ADMISSION_REJECTIONS.with_label_values(&["invalid_term"]).inc();
            return Ok(());
        }
        match vote.round_num().cmp(&self.open_round) {
            Ordering::Equal => {
                let active = self.active.as_mut().expect("active round must exist once initialized");
                let events = active.receive_vote(vote, &mut self.pool, &self.handle).await?;
                for event in events {
                    self.handle.raise_event(event);
                }
            }
            Ordering::Greater => {
                self.future_votes.entry(vote.round_num()).or_default().push(vote);
            }
            Ordering::Less => {
                if self.open_round.saturating_sub(vote.round_num()) <= self.config.past_round_window {
                    self.pool.insert_vote(vote);
                }
            }
        }
        Ok(())
    }

    async fn on_round_end(&mut self, epoch_num: u64, round_num: u64, committed: Option<Data>) -> anyhow::Result<()> {
        let Some(epoch) = self.current_epoch().cloned() else {
            return Ok(());
        };
        if epoch_num != epoch.num() || round_num != self.open_round {
            // Stale signal from a round we've already advanced past.
            return Ok(());
        }

        match &committed {
            Some(data) => {
                tracing::debug!(epoch_num, round_num, number = data.number(), "round committed");
                counters::ROUNDS_COMMITTED.inc();
                self.commit_id = data.id().clone();
                self.commit_number = data.number();
            }
            None => {
                tracing::debug!(epoch_num, round_num, "round failed");
                counters::ROUNDS_FAILED.inc();
            }
        }

        let floor = self.open_round.saturating_sub(self.config.past_round_window);
        self.pool.prune_before(epoch.num(), floor);
        self.start_round(epoch, round_num + 1).await
    }
}

/// Registered against the `"initialize"`, `"receive_data"`, `"receive_vote"` and
/// `"round_end"` event kinds. Interior mutability lets one `Arc<OrderHandler>` satisfy
/// `EventHandler<ConsensusEvent>`'s `&self` signature for all four registrations.
pub struct OrderHandler {
    state: tokio::sync::Mutex<OrderState>,
}

impl OrderHandler {
    pub fn new(
        config: ConsensusConfig,
        data_factory: Arc<dyn DataFactory>,
        vote_factory: Arc<dyn VoteFactory>,
        handle: EventSystemHandle<ConsensusEvent>,
    ) -> Self {
        Self {
            state: tokio::sync::Mutex::new(OrderState {
                epoch: None,
                open_round: 0,
                commit_id: Bytes::new(),
                commit_number: 0,
                config,
                data_factory,
                vote_factory,
                pool: MessagePool::new(),
                active: None,
                future_data: HashMap::new(),
                future_votes: HashMap::new(),
                handle,
            }),
        }
    }
}

#[async_trait]
impl EventHandler<ConsensusEvent> for OrderHandler {
    async fn handle(&self, event: ConsensusEvent) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        match event {
            ConsensusEvent::Initialize { epoch, genesis_id } => state.initialize(epoch, genesis_id).await,
            ConsensusEvent::ReceiveData { data } => state.on_receive_data(data).await,
            ConsensusEvent::ReceiveVote { vote } => state.on_receive_vote(vote).await,
            ConsensusEvent::RoundEnd { epoch_num, round_num, committed } => {
                state.on_round_end(epoch_num, round_num, committed).await
            }
            ConsensusEvent::BroadcastData { .. } | ConsensusEvent::BroadcastVote { .. } | ConsensusEvent::RoundStart { .. } => {
                // Outputs of this engine, not inputs Order reacts to; a host-level
                // harness is responsible for rebroadcasting and echoing them back.
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use event_system::mediators::delayed::{DelayedEventMediator, InstantExecutor};
    use event_system::EventSystem;

    use super::*;
    use crate::testing::{MockDataFactory, MockVoteFactory};

    fn test_state(voters: Vec<consensus_types::NodeId>, past_round_window: u64) -> OrderState {
        let system = EventSystem::<ConsensusEvent>::new();
        let handle = system.handle();
        handle.register_mediator(DelayedEventMediator::new(Box::new(InstantExecutor::new(handle.clone()))));

        let mut config = ConsensusConfig::default();
        config.past_round_window = past_round_window;
        let voter = voters[0];
        OrderState {
            epoch: Some(Epoch::new(0, voters, 1)),
            open_round: 2,
            commit_id: Bytes::new(),
            commit_number: 0,
            config,
            data_factory: Arc::new(MockDataFactory::new()),
            vote_factory: Arc::new(MockVoteFactory::new(voter)),
            pool: MessagePool::new(),
            active: None,
            future_data: HashMap::new(),
            future_votes: HashMap::new(),
            handle,
        }
    }

    fn voters(n: usize) -> Vec<consensus_types::NodeId> {
        (0..n as u8).map(|i| consensus_types::NodeId::from_bytes([i; 16])).collect()
    }

    fn vote(voter: consensus_types::NodeId, round_num: u64) -> Vote {
        Vote::new(
            consensus_types::VoteKind::Real,
            Bytes::from(format!("vote-{voter}-{round_num}")),
            Bytes::from("some-data"),
            Bytes::new(),
            voter,
            0,
            round_num,
        )
    }

    fn data(proposer: consensus_types::NodeId, round_num: u64) -> Data {
        Data::new(
            consensus_types::DataKind::Real,
            Bytes::from(format!("data-{proposer}-{round_num}")),
            Bytes::new(),
            proposer,
            round_num + 1,
            0,
            round_num,
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn past_round_vote_within_window_lands_in_pool_only() {
        // open_round=2, past_round_window=1: round 1 is admissible read-only, round 0 is not.
        let mut state = test_state(voters(4), 1);
        let in_window = vote(voters(4)[0], 1);
        state.on_receive_vote(in_window.clone()).await.unwrap();
        assert!(state.pool.data_by_id(0, 1, in_window.data_id()).is_none());
        assert_eq!(state.pool.votes_in_round(0, 1).count(), 1);
    }

    #[tokio::test]
    async fn past_round_vote_outside_window_is_dropped() {
        let mut state = test_state(voters(4), 1);
        let too_old = vote(voters(4)[0], 0);
        state.on_receive_vote(too_old).await.unwrap();
        assert_eq!(state.pool.votes_in_round(0, 0).count(), 0);
    }

    #[tokio::test]
    async fn future_round_data_is_buffered_until_its_round_opens() {
        let mut state = test_state(voters(4), 1);
        let proposer = state.epoch.as_ref().unwrap().proposer_id(3);
        let future = data(proposer, 3);
        state.on_receive_data(future.clone()).await.unwrap();

        assert_eq!(state.future_data.get(&3).map(Vec::len), Some(1));
        assert!(state.pool.data_by_id(0, 3, future.id()).is_none());
    }
}
