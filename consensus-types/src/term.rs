// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use crate::error::ConsensusError;
use crate::message::data::Data;
use crate::message::vote::Vote;
use crate::node_id::NodeId;

/// Immutable voter configuration for a contiguous span of rounds.
///
/// Proposer rotation is deterministic: `voters[(round / rotate_bound) mod n]`. An
/// `Epoch` is created once at genesis or when a commit closes the previous one, and is
/// never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Epoch {
    num: u64,
    voters: Vec<NodeId>,
    rotate_bound: u64,
}

impl Epoch {
    /// Builds a new epoch. Panics if `voters` is empty or `rotate_bound` is zero — an
    /// epoch with no voters or no rotation period is not a configuration error callers
    /// should recover from, it is a construction bug.
    pub fn new(num: u64, voters: Vec<NodeId>, rotate_bound: u64) -> Self {
        assert!(!voters.is_empty(), "epoch must have at least one voter");
        assert!(rotate_bound > 0, "rotate_bound must be positive");
        Self {
            num,
            voters,
            rotate_bound,
        }
    }

    pub fn num(&self) -> u64 {
        self.num
    }

    pub fn rotate_bound(&self) -> u64 {
        self.rotate_bound
    }

    pub fn voters_id(&self) -> &[NodeId] {
        &self.voters
    }

    /// `⌈2/3 · n⌉`
    pub fn quorum_num(&self) -> usize {
        let n = self.voters.len();
        (n * 2 + 2) / 3
    }

    pub fn proposer_id(&self, round_num: u64) -> NodeId {
        let index = (round_num / self.rotate_bound) as usize % self.voters.len();
        self.voters[index]
    }

    pub fn voter_id(&self, index: usize) -> Option<NodeId> {
        self.voters.get(index).copied()
    }

    pub fn verify_proposer(&self, proposer: NodeId, round_num: u64) -> Result<(), ConsensusError> {
        let expected = self.proposer_id(round_num);
        if proposer != expected {
            return Err(ConsensusError::InvalidProposer {
                got: proposer,
                expected,
                round: round_num,
            });
        }
        Ok(())
    }

    /// `vote_index < 0` (modeled as `None`) accepts any recognized voter; a concrete
    /// index enforces positional match against the voter list, used when verifying
    /// previous-round vote bundles embedded in a data's `prev_votes`.
    pub fn verify_voter(&self, voter: NodeId, vote_index: Option<usize>) -> Result<(), ConsensusError> {
        match vote_index {
            Some(index) => {
                let expected = self.voter_id(index);
                if expected != Some(voter) {
                    return Err(ConsensusError::InvalidVoter {
                        got: voter,
                        expected,
                    });
                }
                Ok(())
            }
            None => {
                if self.voters.contains(&voter) {
                    Ok(())
                } else {
                    Err(ConsensusError::InvalidVoter {
                        got: voter,
                        expected: None,
                    })
                }
            }
        }
    }

    pub fn verify_vote(&self, vote: &Vote, vote_index: Option<usize>) -> Result<(), ConsensusError> {
        self.verify_voter(vote.voter_id(), vote_index)
    }

    /// Verifies the proposer, that real data carries the right shape of `prev_votes`
    /// (none below number 2, since nothing has voted yet at genesis; a full quorum at
    /// and above it), and walks `prev_votes` as an ordered list indexed by voter
    /// position, checking `voter == voters[i]` for each entry.
    pub fn verify_data(&self, data: &Data) -> Result<(), ConsensusError> {
        self.verify_proposer(data.proposer_id(), data.round_num())?;
        if data.is_real() {
            let expected = if data.number() <= 1 { 0 } else { self.quorum_num() };
            if data.prev_votes().len() != expected {
                return Err(ConsensusError::MalformedPrevVotes {
                    got: data.prev_votes().len(),
                    expected,
                });
            }
        }
        for (i, vote) in data.prev_votes().iter().enumerate() {
            self.verify_vote(vote, Some(i))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voters(n: usize) -> Vec<NodeId> {
        (0..n as u8).map(|i| NodeId::from_bytes([i; 16])).collect()
    }

    #[test]
    fn quorum_is_ceil_two_thirds() {
        assert_eq!(Epoch::new(0, voters(4), 1).quorum_num(), 3);
        assert_eq!(Epoch::new(0, voters(3), 1).quorum_num(), 2);
        assert_eq!(Epoch::new(0, voters(7), 1).quorum_num(), 5);
        assert_eq!(Epoch::new(0, voters(1), 1).quorum_num(), 1);
    }

    #[test]
    fn rotation_with_bound_two_over_three_voters() {
        // S6: with 3 voters and rotate_bound=2, proposers for rounds 0..5 are v0,v0,v1,v1,v2,v2.
        let epoch = Epoch::new(0, voters(3), 2);
        let expected = [
            voters(3)[0],
            voters(3)[0],
            voters(3)[1],
            voters(3)[1],
            voters(3)[2],
            voters(3)[2],
        ];
        for (round, expected_proposer) in expected.into_iter().enumerate() {
            assert_eq!(epoch.proposer_id(round as u64), expected_proposer);
        }
    }

    #[test]
    fn verify_proposer_rejects_wrong_node() {
        let epoch = Epoch::new(0, voters(4), 1);
        let wrong = NodeId::from_bytes([99; 16]);
        assert!(epoch.verify_proposer(wrong, 0).is_err());
    }

    #[test]
    fn verify_voter_with_index_enforces_position() {
        let epoch = Epoch::new(0, voters(4), 1);
        assert!(epoch.verify_voter(voters(4)[2], Some(2)).is_ok());
        assert!(epoch.verify_voter(voters(4)[1], Some(2)).is_err());
    }

    #[test]
    fn verify_voter_without_index_accepts_any_member() {
        let epoch = Epoch::new(0, voters(4), 1);
        assert!(epoch.verify_voter(voters(4)[3], None).is_ok());
        let outsider = NodeId::from_bytes([200; 16]);
        assert!(epoch.verify_voter(outsider, None).is_err());
    }

    #[test]
    fn verify_data_rejects_real_data_with_wrong_prev_votes_count() {
        use bytes::Bytes;

        use crate::message::data::{Data, DataKind};

        let epoch = Epoch::new(0, voters(4), 1);
        let proposer = epoch.proposer_id(0);
        let data = Data::new(DataKind::Real, Bytes::from("d"), Bytes::new(), proposer, 2, 0, 0, Vec::new());
        let error = epoch.verify_data(&data).unwrap_err();
        assert!(matches!(error, ConsensusError::MalformedPrevVotes { got: 0, expected: 3 }));
    }

    mod invariants {
        use proptest::prelude::*;

        use super::*;

        fn arb_voters(max: usize) -> impl Strategy<Value = Vec<NodeId>> {
            (1..=max).prop_map(|n| (0..n as u8).map(|i| NodeId::from_bytes([i; 16])).collect())
        }

        proptest! {
            /// `quorum_num` stays within `(n/2, n]` for every non-empty voter set: more than
            /// a bare majority (the safety property two distinct quorums must intersect
            /// needs), never more than the whole set.
            #[test]
            fn quorum_exceeds_majority_and_never_exceeds_voter_count(voters in arb_voters(50)) {
                let n = voters.len();
                let quorum = Epoch::new(0, voters, 1).quorum_num();
                prop_assert!(quorum * 2 > n);
                prop_assert!(quorum <= n);
            }

            /// The proposer for any round is always a member of the voter list, and
            /// rotation only changes at `rotate_bound` boundaries.
            #[test]
            fn proposer_is_always_a_voter_and_stable_within_a_rotation_window(
                voters in arb_voters(20),
                rotate_bound in 1u64..10,
                round_num in 0u64..1000,
            ) {
                let epoch = Epoch::new(0, voters.clone(), rotate_bound);
                let proposer = epoch.proposer_id(round_num);
                prop_assert!(voters.contains(&proposer));

                let window_start = (round_num / rotate_bound) * rotate_bound;
                prop_assert_eq!(epoch.proposer_id(window_start), proposer);
            }

            /// A voter can cast at most one real vote per round by construction; this
            /// checks the positional check that `prev_votes` verification relies on: a
            /// vote at index `i` is accepted only from `voters[i]`, never another member.
            #[test]
            fn verify_voter_with_index_rejects_every_other_member(
                voters in arb_voters(20),
                index in 0usize..20,
            ) {
                prop_assume!(index < voters.len());
                let epoch = Epoch::new(0, voters.clone(), 1);
                for (i, voter) in voters.iter().enumerate() {
                    let result = epoch.verify_voter(*voter, Some(index));
                    prop_assert_eq!(result.is_ok(), i == index);
                }
            }
        }
    }
}
