// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

//! Retained Data/Vote storage shared by the Order and Round layers.
//! Ownership sits with the consensus root; layers only ever borrow it.

use std::collections::HashMap;

use consensus_types::message::MessageId;
use consensus_types::{Data, NodeId, Vote};

/// `(epoch_num, round_num)` shard key.
type RoundKey = (u64, u64);

/// Data and votes retained across rounds, sharded by `(epoch, round)` and, for votes,
/// additionally indexed by voter so at-most-one-real-vote is a pool-level invariant
/// rather than something every caller has to re-check.
#[derive(Default)]
pub struct MessagePool {
    data: HashMap<RoundKey, HashMap<MessageId, Data>>,
    votes: HashMap<RoundKey, HashMap<NodeId, Vote>>,
}

impl MessagePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `data`. Returns `false` if a data with the same id was already present
    /// for `(epoch, round)` — the caller turns that into `AlreadyProposed`.
    pub fn insert_data(&mut self, data: Data) -> bool {
        let key = (data.epoch_num(), data.round_num());
        let shard = self.data.entry(key).or_default();
        if shard.contains_key(data.id()) {
            return false;
        }
        shard.insert(data.id().clone(), data);
        true
    }

    /// Inserts `vote`. Returns `false` if this voter already has a vote recorded for
    /// `(epoch, round)` — the caller turns that into `AlreadyVoted`.
    pub fn insert_vote(&mut self, vote: Vote) -> bool {
        let key = (vote.epoch_num(), vote.round_num());
        let shard = self.votes.entry(key).or_default();
        if shard.contains_key(&vote.voter_id()) {
            return false;
        }
        shard.insert(vote.voter_id(), vote);
        true
    }

    pub fn data_by_id(&self, epoch_num: u64, round_num: u64, id: &MessageId) -> Option<&Data> {
        self.data.get(&(epoch_num, round_num))?.get(id)
    }

    pub fn votes_in_round(&self, epoch_num: u64, round_num: u64) -> impl Iterator<Item = &Vote> {
        self.votes.get(&(epoch_num, round_num)).into_iter().flat_map(|v| v.values())
    }

    /// Votes already admitted for `data_id`, used to drain late votes into Round once
    /// the matching data itself arrives.
    pub fn votes_for_data(&self, epoch_num: u64, round_num: u64, data_id: &MessageId) -> Vec<Vote> {
        self.votes_in_round(epoch_num, round_num)
            .filter(|v| v.data_id() == data_id)
            .cloned()
            .collect()
    }

    /// Vote counts grouped by `data_id`, used by Sync to detect a fragmented quorum:
    /// the total reaches `quorum_num` but no single bucket does.
    pub fn vote_counts_by_data(&self, epoch_num: u64, round_num: u64) -> HashMap<MessageId, usize> {
        let mut counts: HashMap<MessageId, usize> = HashMap::new();
        for vote in self.votes_in_round(epoch_num, round_num) {
            *counts.entry(vote.data_id().clone()).or_default() += 1;
        }
        counts
    }

    /// Drops every shard for rounds strictly older than `floor` within `epoch_num`.
    /// Called on round advance; `floor` is `open_round - past_round_window`.
    pub fn prune_before(&mut self, epoch_num: u64, floor: u64) {
        self.data.retain(|(e, r), _| *e != epoch_num || *r >= floor);
        self.votes.retain(|(e, r), _| *e != epoch_num || *r >= floor);
    }

    /// Drops every shard outside `epoch_num`. Called on epoch change.
    pub fn prune_epoch(&mut self, epoch_num: u64) {
        self.data.retain(|(e, _), _| *e == epoch_num);
        self.votes.retain(|(e, _), _| *e == epoch_num);
    }
}
