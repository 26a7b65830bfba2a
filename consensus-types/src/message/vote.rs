// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use super::MessageId;
use crate::node_id::NodeId;

/// Which of the four flavors a `Vote` is, mirroring `DataKind`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteKind {
    Real,
    /// Attests to a `NoneData`; a voter casts this instead of abstaining.
    NoneVote,
    /// Injected by Sync for every voter once a fragmented quorum is detected.
    LazyVote,
    /// Generic "not a substantive attestation" sentinel reserved for future use.
    NotVote,
}

/// A voter's attestation for a data id. A voter contributes at most one real vote per
/// `(epoch, round)`; lazy/none votes are sentinels the Sync layer may inject.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    kind: VoteKind,
    id: MessageId,
    data_id: MessageId,
    commit_id: MessageId,
    voter_id: NodeId,
    epoch_num: u64,
    round_num: u64,
}

impl Vote {
    pub fn new(
        kind: VoteKind,
        id: MessageId,
        data_id: MessageId,
        commit_id: MessageId,
        voter_id: NodeId,
        epoch_num: u64,
        round_num: u64,
    ) -> Self {
        Self {
            kind,
            id,
            data_id,
            commit_id,
            voter_id,
            epoch_num,
            round_num,
        }
    }

    pub fn kind(&self) -> VoteKind {
        self.kind
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn data_id(&self) -> &MessageId {
        &self.data_id
    }

    pub fn commit_id(&self) -> &MessageId {
        &self.commit_id
    }

    pub fn voter_id(&self) -> NodeId {
        self.voter_id
    }

    pub fn epoch_num(&self) -> u64 {
        self.epoch_num
    }

    pub fn round_num(&self) -> u64 {
        self.round_num
    }

    pub fn is_real(&self) -> bool {
        matches!(self.kind, VoteKind::Real)
    }

    pub fn is_none(&self) -> bool {
        matches!(self.kind, VoteKind::NoneVote)
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self.kind, VoteKind::LazyVote)
    }

    pub fn is_not(&self) -> bool {
        !self.is_real()
    }
}
