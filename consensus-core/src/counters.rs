// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

//! Process-wide metrics, registered as `once_cell::sync::Lazy` statics rather than
//! threading a registry handle through every layer.

use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts};

pub static ROUNDS_COMMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("consensus_rounds_committed_total", "rounds that reached commit").unwrap()
});

pub static ROUNDS_FAILED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("consensus_rounds_failed_total", "rounds that closed without commit").unwrap()
});

pub static LAZY_DATA_INJECTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "consensus_lazy_data_injected_total",
        "synthetic lazy-data proposals fabricated by Sync after a propose timeout",
    )
    .unwrap()
});

pub static LAZY_VOTE_BATCHES_INJECTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "consensus_lazy_vote_batches_injected_total",
        "synthetic lazy-vote batches fabricated by Sync after a fragmented quorum",
    )
    .unwrap()
});

pub static ADMISSION_REJECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "consensus_admission_rejections_total",
            "messages rejected at the Sync admission edge, by error kind",
        ),
        &["reason"],
    )
    .unwrap()
});

pub static CURRENT_OPEN_ROUND: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("consensus_open_round", "round number Order currently accepts real votes for").unwrap()
});

/// Registers every counter above with `registry`. Call once per process; the engine
/// does this on construction against `prometheus::default_registry()` unless a test
/// supplies its own registry to avoid cross-test collisions.
pub fn register(registry: &prometheus::Registry) -> prometheus::Result<()> {
    registry.register(Box::new(ROUNDS_COMMITTED.clone()))?;
    registry.register(Box::new(ROUNDS_FAILED.clone()))?;
    registry.register(Box::new(LAZY_DATA_INJECTED.clone()))?;
    registry.register(Box::new(LAZY_VOTE_BATCHES_INJECTED.clone()))?;
    registry.register(Box::new(ADMISSION_REJECTIONS.clone()))?;
    registry.register(Box::new(CURRENT_OPEN_ROUND.clone()))?;
    Ok(())
}
