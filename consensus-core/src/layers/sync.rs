// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

//! Reliability shim: admission gate plus synthetic none/lazy message fabrication.
//! One instance per live round, owned by Order.

use std::sync::Arc;

use consensus_types::message::MessageId;
use consensus_types::{ConsensusError, Data, DataFactory, Epoch, Vote, VoteFactory};
use event_system::mediators::delayed::DelayedEventMediator;
use event_system::EventSystemHandle;

use crate::config::ConsensusConfig;
use crate::counters;
use crate::events::ConsensusEvent;
use crate::layers::round::{RoundLayer, RoundSignal};
use crate::pool::MessagePool;

pub struct SyncLayer {
    epoch: Epoch,
    round_num: u64,
    config: ConsensusConfig,
    data_factory: Arc<dyn DataFactory>,
    vote_factory: Arc<dyn VoteFactory>,
    round: RoundLayer,
    lazy_vote_sent: bool,
    /// The id this round's own fabricated lazy-data would carry, computed once at
    /// `start`. Every node derives the same id from `(epoch_num, round_num,
    /// proposer_id)`, so lazy-votes cast against it converge across the whole network
    /// even on nodes that never saw a real proposal.
    lazy_data_id: MessageId,
}

impl SyncLayer {
    pub fn new(
        epoch: Epoch,
        round_num: u64,
        commit_id: MessageId,
        commit_number: u64,
        config: ConsensusConfig,
        data_factory: Arc<dyn DataFactory>,
        vote_factory: Arc<dyn VoteFactory>,
    ) -> Self {
        Self {
            round: RoundLayer::new(epoch.clone(), round_num, commit_id, commit_number),
            epoch,
            round_num,
            config,
            data_factory,
            vote_factory,
            lazy_vote_sent: false,
            lazy_data_id: MessageId::new(),
        }
    }

    /// Fabricates the round's none-data (fed to itself immediately, so a candidate
    /// always exists) and schedules the lazy-data propose timeout.
    pub async fn start(
        &mut self,
        pool: &mut MessagePool,
        handle: &EventSystemHandle<ConsensusEvent>,
    ) -> anyhow::Result<Vec<ConsensusEvent>> {
        let proposer = self.epoch.proposer_id(self.round_num);

        let none_data = self.data_factory.create_none_data(self.epoch.num(), self.round_num, proposer).await?;
        let mut events = self.receive_data(none_data, pool, handle).await?;

        let lazy_data = self.data_factory.create_lazy_data(self.epoch.num(), self.round_num, proposer).await?;
        self.lazy_data_id = lazy_data.id().clone();
        let scheduled = handle.with_mediator::<DelayedEventMediator<ConsensusEvent>, _>(|mediator| {
            mediator.execute(self.config.propose_timeout.as_secs_f64(), ConsensusEvent::ReceiveData { data: lazy_data })
        });
        scheduled.expect("DelayedEventMediator must be registered before the engine starts");
        counters::LAZY_DATA_INJECTED.inc();

        events.extend(self.check_lazy_vote_timeout(pool, handle).await);
        Ok(events)
    }

    pub async fn receive_data(
        &mut self,
        data: Data,
        pool: &mut MessagePool,
        handle: &EventSystemHandle<ConsensusEvent>,
    ) -> anyhow::Result<Vec<ConsensusEvent>> {
        if data.epoch_num() != self.epoch.num() {
            self.reject("invalid_term");
            return Ok(Vec::new());
        }
        if data.round_num() != self.round_num {
            self.reject("invalid_round");
            return Ok(Vec::new());
        }
        if let Err(error) = self.epoch.verify_data(&data) {
            return self.admit_error(error);
        }
        if !self.data_factory.verify_data(&data).await {
            self.reject("invalid_signature");
            return Ok(Vec::new());
        }
        if !pool.insert_data(data.clone()) {
            self.reject("already_proposed");
            return Ok(Vec::new());
        }

        let mut signals = match self.round.receive_data(data.clone()) {
            Ok(signals) => signals,
            Err(error) => return self.admit_error(error),
        };
        for late_vote in pool.votes_for_data(self.epoch.num(), self.round_num, data.id()) {
            signals.extend(self.round.receive_vote(late_vote)?);
        }

        let mut events = self.resolve(signals).await?;
        events.extend(self.check_lazy_vote_timeout(pool, handle).await);
        Ok(events)
    }

    pub async fn receive_vote(
        &mut self,
        vote: Vote,
        pool: &mut MessagePool,
        handle: &EventSystemHandle<ConsensusEvent>,
    ) -> anyhow::Result<Vec<ConsensusEvent>> {
        if vote.epoch_num() != self.epoch.num() {
            self.reject("invalid_term");
            return Ok(Vec::new());
        }
        if vote.round_num() != self.round_num {
            self.reject("invalid_round");
            return Ok(Vec::new());
        }
        if let Err(error) = self.epoch.verify_voter(vote.voter_id(), None) {
            return self.admit_error(error);
        }
        if !self.vote_factory.verify_vote(&vote).await {
            self.reject("invalid_signature");
            return Ok(Vec::new());
        }
        if !pool.insert_vote(vote.clone()) {
            self.reject("already_voted");
            return Ok(Vec::new());
        }

        let mut signals = Vec::new();
        if pool.data_by_id(self.epoch.num(), self.round_num, vote.data_id()).is_some() {
            signals.extend(self.round.receive_vote(vote)?);
        }

        let mut events = self.resolve(signals).await?;
        events.extend(self.check_lazy_vote_timeout(pool, handle).await);
        Ok(events)
    }

    fn reject(&self, reason: &str) {
        tracing::debug!(epoch = self.epoch.num(), round = self.round_num, reason, "dropping message at admission");
        counters::ADMISSION_REJECTIONS.with_label_values(&[reason]).inc();
    }

    /// Classifies a `ConsensusError` raised while admitting a data or vote: recoverable
    /// errors are dropped exactly like any other admission rejection, structural errors
    /// are dropped with a warning, and a fatal error propagates so it reaches
    /// `EventSystem::dispatch`'s abort path instead of being swallowed here.
    fn admit_error(&self, error: ConsensusError) -> anyhow::Result<Vec<ConsensusEvent>> {
        if error.is_recoverable() {
            self.reject(rejection_label(&error));
            return Ok(Vec::new());
        }
        if error.is_fatal() {
            return Err(error.into());
        }
        tracing::warn!(epoch = self.epoch.num(), round = self.round_num, %error, "dropping structurally invalid message");
        counters::ADMISSION_REJECTIONS.with_label_values(&["structural"]).inc();
        Ok(Vec::new())
    }

    async fn resolve(&mut self, signals: Vec<RoundSignal>) -> anyhow::Result<Vec<ConsensusEvent>> {
        let mut events = Vec::new();
        for signal in signals {
            match signal {
                RoundSignal::CastVote { data_id, commit_id } => {
                    let vote = self.vote_factory.create_vote(data_id, commit_id, self.epoch.num(), self.round_num).await?;
                    events.push(ConsensusEvent::BroadcastVote { vote });
                }
                RoundSignal::Commit { data } => {
                    events.push(ConsensusEvent::RoundEnd {
                        epoch_num: self.epoch.num(),
                        round_num: self.round_num,
                        committed: Some(data),
                    });
                }
                RoundSignal::Fail => {
                    events.push(ConsensusEvent::RoundEnd {
                        epoch_num: self.epoch.num(),
                        round_num: self.round_num,
                        committed: None,
                    });
                }
            }
        }
        Ok(events)
    }

    /// Fragmented-quorum detection: once total votes reach `quorum_num` without any
    /// single `data_id` also reaching it, fabricate one lazy-vote per voter, scheduled
    /// `TIMEOUT_VOTE` later. Fires at most once per round.
    async fn check_lazy_vote_timeout(&mut self, pool: &MessagePool, handle: &EventSystemHandle<ConsensusEvent>) -> Vec<ConsensusEvent> {
        if self.lazy_vote_sent {
            return Vec::new();
        }
        let counts = pool.vote_counts_by_data(self.epoch.num(), self.round_num);
        let total: usize = counts.values().sum();
        let quorum = self.epoch.quorum_num();
        let fragmented = total >= quorum && counts.values().all(|&c| c < quorum);
        if !fragmented {
            return Vec::new();
        }
        self.lazy_vote_sent = true;
        counters::LAZY_VOTE_BATCHES_INJECTED.inc();

        let data_id = self.lazy_data_id.clone();
        let commit_id = self.round.commit_id();
        for voter in self.epoch.voters_id() {
            if let Ok(lazy_vote) = self
                .vote_factory
                .create_lazy_vote(*voter, data_id.clone(), commit_id.clone(), self.epoch.num(), self.round_num)
                .await
            {
                handle.with_mediator::<DelayedEventMediator<ConsensusEvent>, _>(|mediator| {
                    mediator.execute(self.config.vote_timeout.as_secs_f64(), ConsensusEvent::ReceiveVote { vote: lazy_vote })
                });
            }
        }
        Vec::new()
    }
}

fn rejection_label(error: &ConsensusError) -> &'static str {
    match error {
        ConsensusError::InvalidProposer { .. } => "invalid_proposer",
        ConsensusError::InvalidVoter { .. } => "invalid_voter",
        _ => "invalid_term_structure",
    }
}
