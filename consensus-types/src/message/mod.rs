// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

pub mod data;
pub mod vote;

/// Byte identity shared by `Data` and `Vote` ids. Kept opaque — the engine never
/// interprets the bytes, only compares and forwards them; the factory that minted the
/// id is responsible for giving it whatever structure its signature scheme needs.
pub type MessageId = bytes::Bytes;
