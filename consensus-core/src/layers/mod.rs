// Copyright (c) Aptos
// SPDX-License-Identifier: Apache-2.0

pub mod order;
pub mod round;
pub mod sync;
