//! LLM Council Library
//!
//! This library puts one question to several LLMs at once, has reviewer
//! models rank the answers blind, and aggregates the rankings into a
//! consensus verdict.
//!
//! # How a run works
//!
//! 1. **Selection**: a run is created with a question and a list of
//!    (provider, model) specs. Duplicate selections get instance labels so
//!    two copies of the same model stay distinguishable.
//! 2. **Answer phase**: the question fans out to every selected model
//!    concurrently. Every attempt is recorded, failures included, and each
//!    answer gets a blind label (A, B, C, ...).
//! 3. **Evaluation phase**: reviewer models receive the answers under their
//!    blind labels only, score them on six dimensions, and return a ranked
//!    ballot. Unreliable reviewers are retried once, then discarded.
//! 4. **Aggregation**: ballots combine by Borda count into a final ranking
//!    with per-label tallies, ties broken by mean scores then label order.
//!
//! Runs, answers, reviews, and rankings persist in RocksDB; progress is
//! observable over a broadcast event bus.
//!
//! # Usage
//!
//! ```ignore
//! use council::adapters::AdapterRegistry;
//! use council::config::CouncilConfig;
//! use council::events::EventBus;
//! use council::orchestrator::CouncilOrchestrator;
//! use council::run::ModelSpec;
//! use council::state::RunStore;
//!
//! let config = CouncilConfig::from_env();
//! let store = RunStore::open(&config.state_path)?.shared();
//! let registry = AdapterRegistry::from_config(&config)?.shared();
//! let bus = EventBus::with_persistence(store.clone()).shared();
//! let orchestrator = CouncilOrchestrator::new(store, registry, bus, config).shared();
//!
//! let snapshot = orchestrator
//!     .run_full_pipeline(
//!         "Is Rust or Go better suited to a high-throughput proxy?",
//!         vec![
//!             ModelSpec::new("anthropic", "claude-sonnet-4-5-20250929"),
//!             ModelSpec::new("openai", "gpt-5.2"),
//!             ModelSpec::new("google", "gemini-2.0-flash-exp"),
//!         ],
//!         true,
//!         None,
//!     )
//!     .await?;
//! ```

#![allow(dead_code)]
#![allow(clippy::uninlined_format_args)]

pub mod adapters;
pub mod config;
pub mod evaluation;
pub mod events;
pub mod labeling;
pub mod orchestrator;
pub mod run;
pub mod state;
pub mod voting;

// Re-export key run types
pub use run::{
    AggregationResult, Answer, ModelParams, ModelSpec, ParsedReview, Review, ReviewScores, Run,
    RunSnapshot, RunStatus, RunSummary, SelectedModel, StatusTransition, TransitionError,
    VoteBreakdown,
};

// Re-export key adapter types
pub use adapters::{
    AdapterRegistry, AnswerOutput, ModelInfo, ProviderAdapter, RegistryError, ReviewOutput,
    SharedAdapterRegistry, SharedProviderAdapter,
};

// Re-export key state types
pub use state::{RunStore, SharedRunStore, StoreError, StoreResult};

// Re-export key event types
pub use events::{CouncilEvent, EventBus, EventBusError, SharedEventBus};

// Re-export key orchestration types
pub use orchestrator::{
    CouncilOrchestrator, OrchestratorError, OrchestratorResult, SharedOrchestrator,
};

pub use config::CouncilConfig;
pub use voting::{aggregate_votes, AggregationOutcome};
