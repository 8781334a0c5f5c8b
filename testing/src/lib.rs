//! # Wereda Testing
//!
//! Testing utilities for the Wereda queue system:
//!
//! - [`mocks`]: deterministic clocks (`FixedClock`, `SteppingClock`).
//! - [`memory`]: `MemoryQueueStore`, a fast in-memory implementation of the
//!   store traits with real transactional semantics - the reference store
//!   for engine and HTTP tests.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wereda_core::{EngineConfig, QueueEngine};
//! use wereda_testing::{memory::MemoryQueueStore, mocks::test_clock};
//!
//! let store = Arc::new(MemoryQueueStore::new());
//! let engine = QueueEngine::new(store, Arc::new(test_clock()), EngineConfig::default());
//! ```

pub mod memory;
pub mod mocks;

pub use memory::MemoryQueueStore;
pub use mocks::{FixedClock, SteppingClock, test_clock};
