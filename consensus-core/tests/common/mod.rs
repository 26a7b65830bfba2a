// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

//! Minimal multi-node harness standing in for the out-of-scope application shell:
//! it rebroadcasts each engine's `BroadcastData`/`BroadcastVote` outputs to every
//! node (including the sender, mirroring the Python original's `register_peer`
//! echo-to-self) and collects `RoundEnd`s for assertions.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use consensus_core::testing::{MockDataFactory, MockVoteFactory};
use consensus_core::{ConsensusConfig, ConsensusEngine, ConsensusEvent};
use consensus_types::{DataFactory, Epoch, NodeId};
use event_system::{EventHandler, EventSystemHandle};

pub struct RoundEndLog(pub Arc<Mutex<Vec<ConsensusEvent>>>);

#[async_trait]
impl EventHandler<ConsensusEvent> for RoundEndLog {
    async fn handle(&self, event: ConsensusEvent) -> anyhow::Result<()> {
        self.0.lock().unwrap().push(event);
        Ok(())
    }
}

struct Rebroadcaster {
    peers: Vec<EventSystemHandle<ConsensusEvent>>,
}

#[async_trait]
impl EventHandler<ConsensusEvent> for Rebroadcaster {
    async fn handle(&self, event: ConsensusEvent) -> anyhow::Result<()> {
        match event {
            ConsensusEvent::BroadcastData { data } => {
                for peer in &self.peers {
                    peer.raise_event(ConsensusEvent::ReceiveData { data: data.clone() });
                }
            }
            ConsensusEvent::BroadcastVote { vote } => {
                for peer in &self.peers {
                    peer.raise_event(ConsensusEvent::ReceiveVote { vote: vote.clone() });
                }
            }
            _ => {}
        }
        Ok(())
    }
}

pub struct Network {
    pub voters: Vec<NodeId>,
    pub engines: Vec<ConsensusEngine>,
    pub round_ends: Vec<Arc<Mutex<Vec<ConsensusEvent>>>>,
    pub data_factory: Arc<MockDataFactory>,
}

impl Network {
    pub fn new(n: usize, rotate_bound: u64, config: ConsensusConfig) -> Self {
        let voters: Vec<NodeId> = (0..n).map(|_| NodeId::random()).collect();
        let data_factory = Arc::new(MockDataFactory::new());

        let mut engines: Vec<ConsensusEngine> = voters
            .iter()
            .map(|voter| ConsensusEngine::new(config, data_factory.clone(), Arc::new(MockVoteFactory::new(*voter))))
            .collect();

        let handles: Vec<EventSystemHandle<ConsensusEvent>> = engines.iter().map(ConsensusEngine::handle).collect();

        let mut round_ends = Vec::new();
        for engine in engines.iter_mut() {
            let log = Arc::new(Mutex::new(Vec::new()));
            engine.register_handler("round_end", Arc::new(RoundEndLog(log.clone())));
            engine.register_handler("round_start", Arc::new(RoundEndLog(log.clone())));
            engine.register_handler("broadcast_data", Arc::new(Rebroadcaster { peers: handles.clone() }));
            engine.register_handler("broadcast_vote", Arc::new(Rebroadcaster { peers: handles.clone() }));
            round_ends.push(log);
        }

        let epoch = Epoch::new(0, voters.clone(), rotate_bound);
        for engine in &engines {
            engine.initialize(epoch.clone(), Bytes::from_static(b"genesis"));
        }

        Self { voters, engines, round_ends, data_factory }
    }

    /// Drains every engine's queue repeatedly until none of them have anything left,
    /// so cross-engine rebroadcasts settle before assertions run.
    pub async fn drain_all(&mut self) {
        loop {
            let mut processed = 0;
            for engine in self.engines.iter_mut() {
                processed += engine.drain_ready().await;
            }
            if processed == 0 {
                break;
            }
        }
    }

    /// Simulates `engines[proposer]` deciding to propose `data` (the host-level
    /// trigger this crate does not implement).
    pub fn propose(&self, proposer: usize, data: consensus_types::Data) {
        self.engines[proposer].raise_event(ConsensusEvent::BroadcastData { data });
    }

    pub async fn create_real_data(&self, proposer: NodeId, prev_id: Bytes, number: u64, epoch_num: u64, round_num: u64) -> consensus_types::Data {
        self.data_factory.create_data(prev_id, proposer, number, epoch_num, round_num, Vec::new()).await.unwrap()
    }
}
