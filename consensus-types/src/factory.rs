// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

use crate::message::data::Data;
use crate::message::vote::Vote;
use crate::message::MessageId;
use crate::node_id::NodeId;

/// Application-supplied construction and verification of candidate blocks.
///
/// Signature schemes and payload encoding are entirely the host's concern; the engine
/// only ever calls through this trait, never constructs a `Data` itself except via the
/// sentinel constructors that every implementation must make verify trivially true.
#[async_trait]
pub trait DataFactory: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn create_data(
        &self,
        prev_id: MessageId,
        proposer_id: NodeId,
        number: u64,
        epoch_num: u64,
        round_num: u64,
        prev_votes: Vec<Vote>,
    ) -> anyhow::Result<Data>;

    async fn create_none_data(&self, epoch_num: u64, round_num: u64, proposer_id: NodeId) -> anyhow::Result<Data>;

    async fn create_lazy_data(&self, epoch_num: u64, round_num: u64, proposer_id: NodeId) -> anyhow::Result<Data>;

    /// Yields `true` on success. None/lazy/not data must always verify trivially true
    /// since they never carry an application signature.
    async fn verify_data(&self, data: &Data) -> bool;
}

/// Application-supplied construction and verification of vote attestations.
#[async_trait]
pub trait VoteFactory: Send + Sync {
    async fn create_vote(
        &self,
        data_id: MessageId,
        commit_id: MessageId,
        epoch_num: u64,
        round_num: u64,
    ) -> anyhow::Result<Vote>;

    /// `data_id`/`commit_id` are the round's current candidate and commit chain head —
    /// every voter's lazy-vote must converge on the same `data_id` for the
    /// fragmented-quorum fallback to actually reach quorum.
    async fn create_lazy_vote(&self, voter_id: NodeId, data_id: MessageId, commit_id: MessageId, epoch_num: u64, round_num: u64) -> anyhow::Result<Vote>;

    async fn create_none_vote(
        &self,
        data_id: MessageId,
        commit_id: MessageId,
        epoch_num: u64,
        round_num: u64,
    ) -> anyhow::Result<Vote>;

    /// Yields `true` on success. None/lazy/not votes must always verify trivially true.
    async fn verify_vote(&self, vote: &Vote) -> bool;
}
