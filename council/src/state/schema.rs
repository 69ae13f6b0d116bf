//! Column family definitions for the RocksDB run store.
//!
//! Each column family provides logical separation of data types
//! while sharing the same RocksDB instance.

/// Column family for run records
pub const CF_RUNS: &str = "runs";

/// Column family for a run's selected models
pub const CF_SELECTED_MODELS: &str = "selected_models";

/// Column family for generated answers
pub const CF_ANSWERS: &str = "answers";

/// Column family for reviewer verdicts
pub const CF_REVIEWS: &str = "reviews";

/// Column family for aggregated rankings
pub const CF_AGGREGATIONS: &str = "aggregations";

/// Column family for event history
pub const CF_EVENTS: &str = "events";

/// All column family names
pub const ALL_CFS: &[&str] = &[
    CF_RUNS,
    CF_SELECTED_MODELS,
    CF_ANSWERS,
    CF_REVIEWS,
    CF_AGGREGATIONS,
    CF_EVENTS,
];

/// Key prefixes for compound keys
pub mod keys {
    /// Create a run key
    pub fn run(run_id: &str) -> String {
        format!("run:{}", run_id)
    }

    /// Create a selected-model key (run + selection position)
    pub fn selected_model(run_id: &str, seq: usize) -> String {
        format!("model:{}:{:04}", run_id, seq)
    }

    /// Prefix covering all of a run's selected models
    pub fn selected_model_prefix(run_id: &str) -> String {
        format!("model:{}:", run_id)
    }

    /// Create an answer key (run + generation position)
    pub fn answer(run_id: &str, seq: usize) -> String {
        format!("ans:{}:{:04}", run_id, seq)
    }

    /// Prefix covering all of a run's answers
    pub fn answer_prefix(run_id: &str) -> String {
        format!("ans:{}:", run_id)
    }

    /// Create a review key (run + reviewer position)
    pub fn review(run_id: &str, seq: usize) -> String {
        format!("review:{}:{:04}", run_id, seq)
    }

    /// Prefix covering all of a run's reviews
    pub fn review_prefix(run_id: &str) -> String {
        format!("review:{}:", run_id)
    }

    /// Create an aggregation key
    pub fn aggregation(run_id: &str) -> String {
        format!("agg:{}", run_id)
    }

    /// Create an event key (run-scoped, timestamp-ordered within the run)
    pub fn event(run_id: &str, timestamp_nanos: i64, event_id: &str) -> String {
        format!("evt:{}:{:020}:{}", run_id, timestamp_nanos, event_id)
    }

    /// Prefix covering all of a run's events
    pub fn event_prefix(run_id: &str) -> String {
        format!("evt:{}:", run_id)
    }

    /// Parse event timestamp from key
    pub fn parse_event_timestamp(key: &str) -> Option<i64> {
        let parts: Vec<&str> = key.split(':').collect();
        if parts.len() >= 3 && parts[0] == "evt" {
            parts[2].parse().ok()
        } else {
            None
        }
    }
}
