// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

//! Message, term and error types shared between the event system and the consensus
//! layers. This crate has no knowledge of the event dispatcher or the layer state
//! machines — it is the vocabulary they're all written in.

pub mod error;
pub mod factory;
pub mod message;
pub mod node_id;
pub mod term;

pub use error::ConsensusError;
pub use factory::{DataFactory, VoteFactory};
pub use message::data::{Data, DataKind};
pub use message::vote::{Vote, VoteKind};
pub use message::MessageId;
pub use node_id::NodeId;
pub use term::Epoch;
