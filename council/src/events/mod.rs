//! Event-driven observation of council runs
//!
//! This module provides the pub/sub messaging infrastructure for watching
//! run progress and persisting event history for replay.
//!
//! # Event Flow
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Orchestrator │────▶│  Event Bus   │────▶│  Subscribers │
//! │  (publish)   │     │  (broadcast) │     │   (recv)     │
//! └──────────────┘     └──────┬───────┘     └──────────────┘
//!                             │
//!                             ▼
//!                      ┌──────────────┐
//!                      │   RocksDB    │
//!                      │  (persist)   │
//!                      └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use council::events::{CouncilEvent, EventBus};
//!
//! // Create event bus with persistence
//! let bus = EventBus::with_persistence(store.clone()).shared();
//!
//! // Watch run progress
//! let mut receiver = bus.subscribe();
//! let event = receiver.recv().await?;
//! ```

pub mod bus;
pub mod types;

// Re-export core types
pub use bus::{EventBus, EventBusError, EventBusResult, SharedEventBus};
pub use types::{CouncilEvent, EventId};
