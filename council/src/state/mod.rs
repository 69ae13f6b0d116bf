//! State persistence module for council runs
//!
//! This module provides RocksDB-backed persistent storage for:
//! - Run records and their status history
//! - The models selected for each run
//! - Generated answers and reviewer verdicts
//! - Aggregated rankings
//! - Event history for replay and debugging
//!
//! # Architecture
//!
//! The run store uses RocksDB column families to logically separate different
//! data types while sharing a single database instance:
//!
//! - `runs`: Run lifecycle records
//! - `selected_models`: SelectedModel rows per run, in selection order
//! - `answers`: Answer rows per run, in generation order
//! - `reviews`: Review rows per run, in reviewer order
//! - `aggregations`: AggregationResult per run
//! - `events`: Event history for replay
//!
//! # Usage
//!
//! ```ignore
//! use council::run::Run;
//! use council::state::RunStore;
//!
//! // Open or create the run store
//! let store = RunStore::open("./.council-state")?;
//!
//! // Create and store a run
//! let run = Run::new("Compare Rust and Go for network services", true);
//! store.put_run(&run)?;
//!
//! // Load everything known about it
//! let snapshot = store.load_run(&run.id)?;
//! ```

pub mod schema;
pub mod store;

// Re-export core types
pub use store::{RunStore, SharedRunStore, StoreError, StoreResult};
