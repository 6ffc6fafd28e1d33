// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pex-storage: durable node records behind the [`RecordStore`] contract

mod json;
#[cfg(any(test, feature = "test-support"))]
mod memory;
mod store;

pub use json::{JsonStore, NodeTable};
#[cfg(any(test, feature = "test-support"))]
pub use memory::{MemoryStore, StoreCall};
pub use store::{order_parent_first, RecordStore, StoreError};
