// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

//! S1: with every voter honest and the proposer's real data delivered promptly, the
//! genesis round commits unanimously before either timeout fires.

mod common;

use std::time::Duration;

use bytes::Bytes;
use common::Network;
use consensus_core::{ConsensusConfig, ConsensusEvent};

#[tokio::test(start_paused = true)]
async fn genesis_round_commits_with_unanimous_real_votes() {
    let config = ConsensusConfig::default();
    let mut network = Network::new(4, 1, config);
    network.drain_all().await;

    let proposer_index = 0;
    let proposer = network.voters[proposer_index];
    let data = network.create_real_data(proposer, Bytes::from_static(b"genesis"), 1, 0, 0).await;

    network.propose(proposer_index, data);
    network.drain_all().await;

    for log in &network.round_ends {
        let events = log.lock().unwrap();
        let committed = events.iter().find_map(|event| match event {
            ConsensusEvent::RoundEnd { round_num: 0, committed: Some(data), .. } => Some(data.number()),
            _ => None,
        });
        assert_eq!(committed, Some(1), "every node should observe round 0 commit the real proposal");
    }

    // No node should have needed the propose timeout to resolve the round.
    tokio::time::advance(Duration::from_millis(100)).await;
    network.drain_all().await;
    for log in &network.round_ends {
        let events = log.lock().unwrap();
        let round_zero_ends = events.iter().filter(|event| matches!(event, ConsensusEvent::RoundEnd { round_num: 0, .. })).count();
        assert_eq!(round_zero_ends, 1, "round 0 must resolve exactly once per node");
    }
}
