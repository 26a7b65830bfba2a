// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Timing and retention constants threaded into the engine root at construction,
/// instead of being hard-coded per layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConsensusConfig {
    /// Delay before Sync's fabricated lazy-data becomes visible if no real proposal
    /// arrives (`TIMEOUT_PROPOSE`).
    pub propose_timeout: Duration,
    /// Delay before Sync's fabricated lazy-votes become visible once a fragmented
    /// quorum is detected (`TIMEOUT_VOTE`).
    pub vote_timeout: Duration,
    /// How many rounds behind the currently open round Order still accepts messages
    /// for (read-only, never re-commits). Fixed at 1.
    pub past_round_window: u64,
    /// Default `rotate_bound` for epochs constructed without an explicit override.
    pub default_rotate_bound: u64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            propose_timeout: Duration::from_secs_f64(2.0),
            vote_timeout: Duration::from_secs_f64(2.0),
            past_round_window: 1,
            default_rotate_bound: 1,
        }
    }
}
