// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

//! Test-only support, compiled when running this crate's own test suite or when a
//! downstream integration test enables the `testing` feature.

pub mod mock_factory;

pub use mock_factory::{MockDataFactory, MockVoteFactory};
