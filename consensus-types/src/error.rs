// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

use crate::node_id::NodeId;

/// Error taxonomy for the consensus engine.
///
/// Admission and authorization errors are expected, normal out-of-band traffic and are
/// always recovered at the Sync layer edge. Structural errors are dropped with a
/// warning. Fatal variants indicate a safety bug and must never be swallowed.
#[derive(Debug, Error)]
pub enum ConsensusError {
    // -- Admission errors: recovered locally, never surfaced past Sync. --
    #[error("data/vote epoch {got} does not match current epoch {expected}")]
    InvalidTerm { got: u64, expected: u64 },

    #[error("data/vote round {got} does not match current round {expected}")]
    InvalidRound { got: u64, expected: u64 },

    #[error("data {0:?} from proposer {1} already in the pool")]
    AlreadyProposed(bytes::Bytes, NodeId),

    #[error("voter {0} already voted in this epoch/round")]
    AlreadyVoted(NodeId),

    // -- Authorization errors: drop, optionally log. --
    #[error("proposer {got} does not match expected proposer {expected} for round {round}")]
    InvalidProposer {
        got: NodeId,
        expected: NodeId,
        round: u64,
    },

    #[error("voter {got} is not a recognized voter (expected {expected:?})")]
    InvalidVoter { got: NodeId, expected: Option<NodeId> },

    #[error("message failed application signature verification")]
    InvalidSignature,

    // -- Structural errors: drop with warning. --
    #[error("data number {got} is not one greater than previous number {prev}")]
    NumberGap { prev: u64, got: u64 },

    #[error("data carries {got} prev_votes, expected {expected}")]
    MalformedPrevVotes { got: usize, expected: usize },

    // -- Fatal invariant violations: abort, never recovered. --
    #[error("two distinct real data committed at (epoch {epoch}, round {round}, number {number})")]
    ConflictingCommit {
        epoch: u64,
        round: u64,
        number: u64,
    },

    #[error("quorum reached on data {0:?} that never passed verification")]
    QuorumOnUnverifiedData(bytes::Bytes),

    #[error("proposer {proposer} submitted two distinct real data for (epoch {epoch}, round {round})")]
    Equivocation {
        proposer: NodeId,
        epoch: u64,
        round: u64,
    },
}

impl ConsensusError {
    /// Admission and authorization errors are expected traffic; the Sync layer drops
    /// them silently. Structural and fatal errors are not recoverable by this rule —
    /// structural errors are dropped with a warning (by the caller), fatal errors must
    /// abort the engine.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ConsensusError::InvalidTerm { .. }
                | ConsensusError::InvalidRound { .. }
                | ConsensusError::AlreadyProposed(..)
                | ConsensusError::AlreadyVoted(..)
                | ConsensusError::InvalidProposer { .. }
                | ConsensusError::InvalidVoter { .. }
                | ConsensusError::InvalidSignature
        )
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ConsensusError::ConflictingCommit { .. }
                | ConsensusError::QuorumOnUnverifiedData(..)
                | ConsensusError::Equivocation { .. }
        )
    }
}
