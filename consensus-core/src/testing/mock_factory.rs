// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

//! Mock `DataFactory`/`VoteFactory` pair, the Rust analogue of
//! `tests/test_utils/test_datas.py`'s `MockConsensusData`/`MockVote`: no real
//! signature, ids minted from a cheap hash so they're distinct and reproducible enough
//! for assertions, never for cryptographic use.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use consensus_types::message::MessageId;
use consensus_types::{Data, DataFactory, DataKind, NodeId, Vote, VoteFactory, VoteKind};

fn mock_id(seed: &str) -> MessageId {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    Bytes::copy_from_slice(&hasher.finish().to_be_bytes())
}

/// Builds `Data` with no application payload and a sequence-numbered id. One instance
/// is shared by every node in a test, since fabricating data never requires a private
/// key.
pub struct MockDataFactory {
    counter: AtomicU64,
}

impl MockDataFactory {
    pub fn new() -> Self {
        Self { counter: AtomicU64::new(0) }
    }
}

impl Default for MockDataFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataFactory for MockDataFactory {
    async fn create_data(
        &self,
        prev_id: MessageId,
        proposer_id: NodeId,
        number: u64,
        epoch_num: u64,
        round_num: u64,
        prev_votes: Vec<Vote>,
    ) -> anyhow::Result<Data> {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        let id = mock_id(&format!("data:{proposer_id}:{epoch_num}:{round_num}:{number}:{seq}"));
        Ok(Data::new(DataKind::Real, id, prev_id, proposer_id, number, epoch_num, round_num, prev_votes))
    }

    async fn create_none_data(&self, epoch_num: u64, round_num: u64, proposer_id: NodeId) -> anyhow::Result<Data> {
        let id = mock_id(&format!("none:{proposer_id}:{epoch_num}:{round_num}"));
        Ok(Data::new(DataKind::NoneData, id, Bytes::new(), proposer_id, 0, epoch_num, round_num, Vec::new()))
    }

    async fn create_lazy_data(&self, epoch_num: u64, round_num: u64, proposer_id: NodeId) -> anyhow::Result<Data> {
        let id = mock_id(&format!("lazy:{proposer_id}:{epoch_num}:{round_num}"));
        Ok(Data::new(DataKind::LazyData, id, Bytes::new(), proposer_id, 0, epoch_num, round_num, Vec::new()))
    }

    async fn verify_data(&self, data: &Data) -> bool {
        !data.id().is_empty()
    }
}

/// Signs real votes as `voter_id`; lazy/none votes can be minted on behalf of any
/// voter, mirroring the real engine where those sentinels never carry a signature.
pub struct MockVoteFactory {
    voter_id: NodeId,
    counter: AtomicU64,
}

impl MockVoteFactory {
    pub fn new(voter_id: NodeId) -> Self {
        Self { voter_id, counter: AtomicU64::new(0) }
    }
}

#[async_trait]
impl VoteFactory for MockVoteFactory {
    async fn create_vote(&self, data_id: MessageId, commit_id: MessageId, epoch_num: u64, round_num: u64) -> anyhow::Result<Vote> {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        let id = mock_id(&format!("vote:{}:{epoch_num}:{round_num}:{seq}", self.voter_id));
        Ok(Vote::new(VoteKind::Real, id, data_id, commit_id, self.voter_id, epoch_num, round_num))
    }

    async fn create_lazy_vote(
        &self,
        voter_id: NodeId,
        data_id: MessageId,
        commit_id: MessageId,
        epoch_num: u64,
        round_num: u64,
    ) -> anyhow::Result<Vote> {
        let id = mock_id(&format!("lazyvote:{voter_id}:{epoch_num}:{round_num}"));
        Ok(Vote::new(VoteKind::LazyVote, id, data_id, commit_id, voter_id, epoch_num, round_num))
    }

    async fn create_none_vote(&self, data_id: MessageId, commit_id: MessageId, epoch_num: u64, round_num: u64) -> anyhow::Result<Vote> {
        let id = mock_id(&format!("nonevote:{}:{epoch_num}:{round_num}", self.voter_id));
        Ok(Vote::new(VoteKind::NoneVote, id, data_id, commit_id, self.voter_id, epoch_num, round_num))
    }

    async fn verify_vote(&self, vote: &Vote) -> bool {
        !vote.id().is_empty()
    }
}
