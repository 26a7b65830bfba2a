// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

//! The single event type shared by every layer and mediator in one engine instance.

use consensus_types::message::MessageId;
use consensus_types::{Data, Epoch, Vote};
use event_system::Event;

/// Every state transition an engine instance reacts to or emits. Order, Round and Sync
/// are all `EventHandler<ConsensusEvent>` implementors registered against the same
/// `EventSystem`, dispatched by `kind()`.
#[derive(Clone, Debug)]
pub enum ConsensusEvent {
    /// Starts a fresh epoch at round 0, chained from `genesis_id`. Raised once by the
    /// engine root.
    Initialize { epoch: Epoch, genesis_id: MessageId },
    /// A `Data` arriving from the network or from Sync's own fabrication.
    ReceiveData { data: Data },
    /// A `Vote` arriving from the network or from Sync's own fabrication.
    ReceiveVote { vote: Vote },
    /// Round has adopted or fabricated `data` and wants it sent to every voter,
    /// including itself.
    BroadcastData { data: Data },
    /// Round has cast `vote` and wants it sent to every voter, including itself.
    BroadcastVote { vote: Vote },
    /// Order has opened `round_num` for admission; Sync reacts by scheduling its
    /// propose timeout.
    RoundStart { epoch_num: u64, round_num: u64 },
    /// Round has reached a terminal state for `round_num`: `Some(data)` on commit,
    /// `None` on timeout-driven failure. Order reacts by advancing `r*`.
    RoundEnd {
        epoch_num: u64,
        round_num: u64,
        committed: Option<Data>,
    },
}

impl Event for ConsensusEvent {
    fn kind(&self) -> event_system::EventKind {
        match self {
            ConsensusEvent::Initialize { .. } => "initialize",
            ConsensusEvent::ReceiveData { .. } => "receive_data",
            ConsensusEvent::ReceiveVote { .. } => "receive_vote",
            ConsensusEvent::BroadcastData { .. } => "broadcast_data",
            ConsensusEvent::BroadcastVote { .. } => "broadcast_vote",
            ConsensusEvent::RoundStart { .. } => "round_start",
            ConsensusEvent::RoundEnd { .. } => "round_end",
        }
    }

    fn is_deterministic(&self) -> bool {
        // The bootstrap trigger comes from the host (local storage, a CLI flag, ...),
        // not from protocol state, so a replay must not expect it to reappear at a
        // recorded offset; the replaying harness raises it directly instead. Every
        // other kind is derived entirely from received or fabricated protocol data and
        // replays verbatim.
        !matches!(self, ConsensusEvent::Initialize { .. })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use consensus_types::NodeId;

    use super::*;

    fn epoch() -> Epoch {
        Epoch::new(0, vec![NodeId::from_bytes([0; 16])], 1)
    }

    #[test]
    fn initialize_is_the_only_non_deterministic_kind() {
        assert!(!ConsensusEvent::Initialize { epoch: epoch(), genesis_id: Bytes::new() }.is_deterministic());

        assert!(ConsensusEvent::RoundStart { epoch_num: 0, round_num: 0 }.is_deterministic());
        assert!(ConsensusEvent::RoundEnd { epoch_num: 0, round_num: 0, committed: None }.is_deterministic());
    }
}
