// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use super::vote::Vote;
use super::MessageId;
use crate::node_id::NodeId;

/// Which of the four flavors a `Data` is. Real data carries application payload and
/// must pass factory verification; the other three are engine-fabricated sentinels
/// that must survive verification trivially.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataKind {
    Real,
    /// Installed by Sync at round start so every round has a candidate to vote on.
    NoneData,
    /// Injected by Sync after `TIMEOUT_PROPOSE` if no real proposal arrived.
    LazyData,
    /// Generic "not a substantive proposal" sentinel reserved for future use.
    NotData,
}

/// A candidate block. `number = prev.number + 1` for real data; genesis has an empty
/// `prev_id` and `number = 0`. None/lazy/not data carry sentinel ids minted by the
/// data factory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Data {
    kind: DataKind,
    id: MessageId,
    prev_id: MessageId,
    proposer_id: NodeId,
    number: u64,
    epoch_num: u64,
    round_num: u64,
    prev_votes: Vec<Vote>,
}

impl Data {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: DataKind,
        id: MessageId,
        prev_id: MessageId,
        proposer_id: NodeId,
        number: u64,
        epoch_num: u64,
        round_num: u64,
        prev_votes: Vec<Vote>,
    ) -> Self {
        Self {
            kind,
            id,
            prev_id,
            proposer_id,
            number,
            epoch_num,
            round_num,
            prev_votes,
        }
    }

    pub fn kind(&self) -> DataKind {
        self.kind
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn prev_id(&self) -> &MessageId {
        &self.prev_id
    }

    pub fn proposer_id(&self) -> NodeId {
        self.proposer_id
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn epoch_num(&self) -> u64 {
        self.epoch_num
    }

    pub fn round_num(&self) -> u64 {
        self.round_num
    }

    pub fn prev_votes(&self) -> &[Vote] {
        &self.prev_votes
    }

    pub fn is_real(&self) -> bool {
        matches!(self.kind, DataKind::Real)
    }

    pub fn is_none(&self) -> bool {
        matches!(self.kind, DataKind::NoneData)
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self.kind, DataKind::LazyData)
    }

    /// True for any sentinel flavor (none/lazy/not) — the complement of `is_real`.
    pub fn is_not(&self) -> bool {
        !self.is_real()
    }
}
