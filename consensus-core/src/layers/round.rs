// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

//! Per-round vote bookkeeping and commit decision.

use std::collections::HashMap;

use consensus_types::message::MessageId;
use consensus_types::{ConsensusError, Data, Epoch, Vote};

/// What Round wants done as a consequence of admitting a data or vote. Round itself
/// never touches the vote factory or the event system — casting a signed vote needs an
/// `await` on the application factory, which Sync (the async caller one level up, with
/// the factory handle) performs before turning this into a `BroadcastVoteEvent`.
#[derive(Debug)]
pub enum RoundSignal {
    /// Adopted `data_id` as the round's candidate; cast a real vote for it, chained
    /// from `commit_id` (the previous commit's id, carried unchanged through a round).
    CastVote { data_id: MessageId, commit_id: MessageId },
    /// Quorum reached on a real data: the round committed.
    Commit { data: Data },
    /// Quorum reached on a none/lazy data: the round failed without commit.
    Fail,
}

/// Drives the vote decision for exactly one `(epoch, round)`. Constructed fresh by
/// Sync at round start and discarded once the round ends.
pub struct RoundLayer {
    epoch: Epoch,
    round_num: u64,
    commit_id: MessageId,
    commit_number: u64,
    candidate: Option<Data>,
    seen_data: HashMap<MessageId, Data>,
    votes_by_data: HashMap<MessageId, Vec<Vote>>,
    proposer_real_data_id: Option<MessageId>,
    finished: bool,
}

impl RoundLayer {
    pub fn new(epoch: Epoch, round_num: u64, commit_id: MessageId, commit_number: u64) -> Self {
        Self {
            epoch,
            round_num,
            commit_id,
            commit_number,
            candidate: None,
            seen_data: HashMap::new(),
            votes_by_data: HashMap::new(),
            proposer_real_data_id: None,
            finished: false,
        }
    }

    pub fn round_num(&self) -> u64 {
        self.round_num
    }

    pub fn commit_id(&self) -> MessageId {
        self.commit_id.clone()
    }

    fn candidate_is_real(&self) -> bool {
        self.candidate.as_ref().map(Data::is_real).unwrap_or(false)
    }

    /// Admits `data` that Sync has already verified and pool-deduplicated.
    pub fn receive_data(&mut self, data: Data) -> Result<Vec<RoundSignal>, ConsensusError> {
        if self.finished {
            return Ok(Vec::new());
        }

        if data.is_real() {
            if data.number() != self.commit_number + 1 {
                return Err(ConsensusError::NumberGap {
                    prev: self.commit_number,
                    got: data.number(),
                });
            }

            match &self.proposer_real_data_id {
                Some(existing) if existing != data.id() => {
                    return Err(ConsensusError::Equivocation {
                        proposer: data.proposer_id(),
                        epoch: data.epoch_num(),
                        round: data.round_num(),
                    });
                }
                Some(_) => {}
                None => self.proposer_real_data_id = Some(data.id().clone()),
            }
        }

        self.seen_data.insert(data.id().clone(), data.clone());

        let mut signals = Vec::new();
        if !self.candidate_is_real() {
            self.candidate = Some(data.clone());
            // None-data is silent filler so a candidate always exists; it is never
            // itself voted on, or every round would reach quorum on it instantly.
            // Real and lazy data both get a cast vote once adopted.
            if !data.is_none() {
                signals.push(RoundSignal::CastVote {
                    data_id: data.id().clone(),
                    commit_id: self.commit_id.clone(),
                });
            }
        }

        signals.extend(self.try_resolve(data.id())?);
        Ok(signals)
    }

    pub fn receive_vote(&mut self, vote: Vote) -> Result<Vec<RoundSignal>, ConsensusError> {
        if self.finished {
            return Ok(Vec::new());
        }
        let data_id = vote.data_id().clone();
        self.votes_by_data.entry(data_id.clone()).or_default().push(vote);
        self.try_resolve(&data_id)
    }

    fn try_resolve(&mut self, data_id: &MessageId) -> Result<Vec<RoundSignal>, ConsensusError> {
        if self.finished {
            return Ok(Vec::new());
        }
        let quorum = self.epoch.quorum_num();
        let count = self.votes_by_data.get(data_id).map(Vec::len).unwrap_or(0);
        if count < quorum {
            return Ok(Vec::new());
        }
        let Some(data) = self.seen_data.get(data_id).cloned() else {
            // Quorum reached on a data id this round never saw the data for; it
            // cannot be resolved until the data itself arrives.
            return Ok(Vec::new());
        };
        self.finished = true;
        if data.is_real() {
            Ok(vec![RoundSignal::Commit { data }])
        } else {
            Ok(vec![RoundSignal::Fail])
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use consensus_types::message::data::DataKind;
    use consensus_types::NodeId;

    use super::*;

    fn epoch() -> Epoch {
        Epoch::new(0, vec![NodeId::from_bytes([0; 16])], 1)
    }

    fn real_data(number: u64) -> Data {
        Data::new(DataKind::Real, Bytes::from(format!("d{number}")), Bytes::new(), NodeId::from_bytes([0; 16]), number, 0, 0, Vec::new())
    }

    #[test]
    fn real_data_with_skipped_number_is_rejected() {
        let mut round = RoundLayer::new(epoch(), 0, Bytes::new(), 0);
        let error = round.receive_data(real_data(2)).unwrap_err();
        assert!(matches!(error, ConsensusError::NumberGap { prev: 0, got: 2 }));
    }

    #[test]
    fn real_data_with_correct_number_is_admitted() {
        let mut round = RoundLayer::new(epoch(), 0, Bytes::new(), 0);
        assert!(round.receive_data(real_data(1)).is_ok());
    }
}
