//! RocksDB-backed state store for council runs
//!
//! Provides persistent storage with column families for logical data separation.
//! Uses bincode for efficient binary serialization internally; events are
//! stored as JSON for debuggability.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use rocksdb::{ColumnFamilyDescriptor, Options, DB};
use serde::{de::DeserializeOwned, Serialize};

use super::schema::{self, ALL_CFS};
use crate::run::{AggregationResult, Answer, Review, Run, RunSnapshot, RunSummary, SelectedModel};

/// Error type for state store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Lock poisoned")]
    LockPoisoned,

    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),
}

/// Result type for state store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared reference to RunStore
pub type SharedRunStore = Arc<RunStore>;

/// RocksDB-backed persistent store for runs and their artifacts
pub struct RunStore {
    db: RwLock<DB>,
    path: PathBuf,
}

impl RunStore {
    /// Open or create a run store at the given path
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, &path, cf_descriptors)?;

        Ok(Self {
            db: RwLock::new(db),
            path,
        })
    }

    /// Create a shared reference to this store
    pub fn shared(self) -> SharedRunStore {
        Arc::new(self)
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    // =========================================================================
    // Generic operations
    // =========================================================================

    /// Store a value in a column family
    fn put<T: Serialize>(&self, cf_name: &str, key: &str, value: &T) -> StoreResult<()> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(cf_name)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf_name.to_string()))?;

        let bytes = bincode::serde::encode_to_vec(value, bincode::config::standard())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        db.put_cf(&cf, key.as_bytes(), bytes)?;
        Ok(())
    }

    /// Get a value from a column family
    fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &str) -> StoreResult<Option<T>> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(cf_name)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf_name.to_string()))?;

        match db.get_cf(&cf, key.as_bytes())? {
            Some(bytes) => {
                let (value, _) =
                    bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
                        .map_err(|e| StoreError::Deserialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Delete a value from a column family
    fn delete(&self, cf_name: &str, key: &str) -> StoreResult<()> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(cf_name)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf_name.to_string()))?;

        db.delete_cf(&cf, key.as_bytes())?;
        Ok(())
    }

    /// List all keys with a prefix in a column family
    fn list_keys(&self, cf_name: &str, prefix: &str) -> StoreResult<Vec<String>> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(cf_name)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf_name.to_string()))?;

        let mut keys = Vec::new();
        let iter = db.prefix_iterator_cf(&cf, prefix.as_bytes());

        for result in iter {
            let (key, _) = result?;
            if let Ok(key_str) = String::from_utf8(key.to_vec()) {
                if key_str.starts_with(prefix) {
                    keys.push(key_str);
                } else {
                    break; // Prefix no longer matches
                }
            }
        }

        Ok(keys)
    }

    /// Delete every key under a prefix, returning how many were removed
    fn delete_prefix(&self, cf_name: &str, prefix: &str) -> StoreResult<usize> {
        let keys = self.list_keys(cf_name, prefix)?;
        let count = keys.len();
        for key in &keys {
            self.delete(cf_name, key)?;
        }
        Ok(count)
    }

    // =========================================================================
    // Run operations
    // =========================================================================

    /// Store a run record, creating or overwriting it
    pub fn put_run(&self, run: &Run) -> StoreResult<()> {
        let key = schema::keys::run(&run.id);
        self.put(schema::CF_RUNS, &key, run)
    }

    /// Get a run by ID
    pub fn get_run(&self, run_id: &str) -> StoreResult<Option<Run>> {
        let key = schema::keys::run(run_id);
        self.get(schema::CF_RUNS, &key)
    }

    /// List run summaries, newest first, windowed by limit and offset
    pub fn list_runs(&self, limit: usize, offset: usize) -> StoreResult<Vec<RunSummary>> {
        let keys = self.list_keys(schema::CF_RUNS, "run:")?;

        let mut summaries: Vec<RunSummary> = keys
            .iter()
            .filter_map(|key| self.get::<Run>(schema::CF_RUNS, key).ok()?)
            .map(|run| RunSummary::from_run(&run))
            .collect();

        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries.into_iter().skip(offset).take(limit).collect())
    }

    /// Delete a run and everything hanging off it
    pub fn delete_run(&self, run_id: &str) -> StoreResult<()> {
        let key = schema::keys::run(run_id);
        if self.get::<Run>(schema::CF_RUNS, &key)?.is_none() {
            return Err(StoreError::NotFound(key));
        }

        self.delete(schema::CF_RUNS, &key)?;
        self.delete_prefix(
            schema::CF_SELECTED_MODELS,
            &schema::keys::selected_model_prefix(run_id),
        )?;
        self.delete_prefix(schema::CF_ANSWERS, &schema::keys::answer_prefix(run_id))?;
        self.delete_prefix(schema::CF_REVIEWS, &schema::keys::review_prefix(run_id))?;
        self.delete(schema::CF_AGGREGATIONS, &schema::keys::aggregation(run_id))?;
        self.delete_prefix(schema::CF_EVENTS, &schema::keys::event_prefix(run_id))?;
        Ok(())
    }

    /// Assemble the full snapshot for a run, or None if the run is unknown
    pub fn load_run(&self, run_id: &str) -> StoreResult<Option<RunSnapshot>> {
        let Some(run) = self.get_run(run_id)? else {
            return Ok(None);
        };

        Ok(Some(RunSnapshot {
            run,
            selected_models: self.get_selected_models(run_id)?,
            answers: self.get_answers(run_id)?,
            reviews: self.get_reviews(run_id)?,
            aggregation: self.get_aggregation(run_id)?,
        }))
    }

    // =========================================================================
    // Selected model operations
    // =========================================================================

    /// Replace a run's selected models, preserving slice order
    pub fn put_selected_models(
        &self,
        run_id: &str,
        models: &[SelectedModel],
    ) -> StoreResult<()> {
        self.delete_prefix(
            schema::CF_SELECTED_MODELS,
            &schema::keys::selected_model_prefix(run_id),
        )?;
        for (seq, model) in models.iter().enumerate() {
            let key = schema::keys::selected_model(run_id, seq);
            self.put(schema::CF_SELECTED_MODELS, &key, model)?;
        }
        Ok(())
    }

    /// Get a run's selected models in selection order
    pub fn get_selected_models(&self, run_id: &str) -> StoreResult<Vec<SelectedModel>> {
        let prefix = schema::keys::selected_model_prefix(run_id);
        let keys = self.list_keys(schema::CF_SELECTED_MODELS, &prefix)?;

        Ok(keys
            .iter()
            .filter_map(|key| self.get(schema::CF_SELECTED_MODELS, key).ok()?)
            .collect())
    }

    // =========================================================================
    // Answer operations
    // =========================================================================

    /// Replace a run's answers wholesale; re-runs leave no stale rows behind
    pub fn replace_answers(&self, run_id: &str, answers: &[Answer]) -> StoreResult<()> {
        self.delete_prefix(schema::CF_ANSWERS, &schema::keys::answer_prefix(run_id))?;
        for (seq, answer) in answers.iter().enumerate() {
            let key = schema::keys::answer(run_id, seq);
            self.put(schema::CF_ANSWERS, &key, answer)?;
        }
        Ok(())
    }

    /// Get a run's answers in generation order
    pub fn get_answers(&self, run_id: &str) -> StoreResult<Vec<Answer>> {
        let prefix = schema::keys::answer_prefix(run_id);
        let keys = self.list_keys(schema::CF_ANSWERS, &prefix)?;

        Ok(keys
            .iter()
            .filter_map(|key| self.get(schema::CF_ANSWERS, key).ok()?)
            .collect())
    }

    // =========================================================================
    // Review operations
    // =========================================================================

    /// Replace a run's reviews wholesale
    pub fn replace_reviews(&self, run_id: &str, reviews: &[Review]) -> StoreResult<()> {
        self.delete_prefix(schema::CF_REVIEWS, &schema::keys::review_prefix(run_id))?;
        for (seq, review) in reviews.iter().enumerate() {
            let key = schema::keys::review(run_id, seq);
            self.put(schema::CF_REVIEWS, &key, review)?;
        }
        Ok(())
    }

    /// Get a run's reviews in reviewer order
    pub fn get_reviews(&self, run_id: &str) -> StoreResult<Vec<Review>> {
        let prefix = schema::keys::review_prefix(run_id);
        let keys = self.list_keys(schema::CF_REVIEWS, &prefix)?;

        Ok(keys
            .iter()
            .filter_map(|key| self.get(schema::CF_REVIEWS, key).ok()?)
            .collect())
    }

    // =========================================================================
    // Aggregation operations
    // =========================================================================

    /// Store a run's aggregation result
    pub fn put_aggregation(&self, aggregation: &AggregationResult) -> StoreResult<()> {
        let key = schema::keys::aggregation(&aggregation.run_id);
        self.put(schema::CF_AGGREGATIONS, &key, aggregation)
    }

    /// Get a run's aggregation result
    pub fn get_aggregation(&self, run_id: &str) -> StoreResult<Option<AggregationResult>> {
        let key = schema::keys::aggregation(run_id);
        self.get(schema::CF_AGGREGATIONS, &key)
    }

    /// Delete a run's aggregation result, if any
    pub fn delete_aggregation(&self, run_id: &str) -> StoreResult<()> {
        let key = schema::keys::aggregation(run_id);
        self.delete(schema::CF_AGGREGATIONS, &key)
    }

    // =========================================================================
    // Event operations (for replay)
    // =========================================================================

    /// Store an event under its run (serialized as JSON for debuggability)
    pub fn put_event(
        &self,
        run_id: &str,
        timestamp_nanos: i64,
        event_id: &str,
        event: &impl Serialize,
    ) -> StoreResult<()> {
        let key = schema::keys::event(run_id, timestamp_nanos, event_id);
        let bytes =
            serde_json::to_vec(event).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(schema::CF_EVENTS)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(schema::CF_EVENTS.to_string()))?;

        db.put_cf(&cf, key.as_bytes(), bytes)?;
        Ok(())
    }

    /// Get one run's events, oldest first
    pub fn get_run_events<T: DeserializeOwned>(&self, run_id: &str) -> StoreResult<Vec<(i64, T)>> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(schema::CF_EVENTS)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(schema::CF_EVENTS.to_string()))?;

        let prefix = schema::keys::event_prefix(run_id);
        let iter = db.prefix_iterator_cf(&cf, prefix.as_bytes());

        let mut events = Vec::new();
        for result in iter {
            let (key, value) = result?;
            let key_str = String::from_utf8(key.to_vec())
                .map_err(|e| StoreError::Deserialization(e.to_string()))?;
            if !key_str.starts_with(&prefix) {
                break;
            }

            if let Some(ts) = schema::keys::parse_event_timestamp(&key_str) {
                let event: T = serde_json::from_slice(&value)
                    .map_err(|e| StoreError::Deserialization(e.to_string()))?;
                events.push((ts, event));
            }
        }

        Ok(events)
    }
}
