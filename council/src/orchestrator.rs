//! Run orchestration: answer fan-out, reviewer fan-out, and aggregation.
//!
//! The orchestrator owns run lifecycle policy. Stores stay mechanical; every
//! status transition, retry, discard, and re-run replacement decision lives
//! here. Phases are all-or-nothing about their artifacts: re-running the
//! answer phase replaces answers and clears downstream reviews and
//! aggregation, and re-running evaluation replaces reviews and rebuilds the
//! aggregation from scratch.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use crate::adapters::{AnswerOutput, ReviewOutput, SharedAdapterRegistry};
use crate::config::{
    CouncilConfig, DEFAULT_ANSWER_MAX_TOKENS, DEFAULT_ANSWER_TEMPERATURE,
    DEFAULT_REVIEW_MAX_TOKENS, DEFAULT_REVIEW_TEMPERATURE,
};
use crate::evaluation::{assign_labels, build_review_prompt};
use crate::events::{CouncilEvent, SharedEventBus};
use crate::labeling::apply_instance_labels;
use crate::run::{
    AggregationResult, Answer, ModelSpec, ParsedReview, Review, Run, RunSnapshot, RunStatus,
    RunSummary, SelectedModel, TransitionError,
};
use crate::state::{SharedRunStore, StoreError};
use crate::voting::aggregate_votes;

/// Total attempts per reviewer before its verdict is discarded.
const REVIEW_ATTEMPTS: usize = 2;

/// Question prefix length carried in run-created events.
const QUESTION_PREVIEW_CHARS: usize = 80;

/// Error type for orchestration operations
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Run not found: {0}")]
    NotFound(String),

    #[error("Need at least 2 successful answers to evaluate (got {got})")]
    NotEnoughAnswers { got: usize },

    #[error("Evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Invalid status transition: {0}")]
    Transition(#[from] TransitionError),

    #[error("State store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for orchestration operations
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Shared reference to CouncilOrchestrator
pub type SharedOrchestrator = Arc<CouncilOrchestrator>;

/// Coordinates runs end to end over the store, registry, and event bus
pub struct CouncilOrchestrator {
    store: SharedRunStore,
    registry: SharedAdapterRegistry,
    event_bus: SharedEventBus,
    config: CouncilConfig,
}

/// Per-reviewer inputs captured before fan-out, re-joined positionally after.
struct ReviewerContext {
    reviewer: SelectedModel,
    shown_labels: Vec<String>,
    exclude_label: Option<String>,
}

impl CouncilOrchestrator {
    pub fn new(
        store: SharedRunStore,
        registry: SharedAdapterRegistry,
        event_bus: SharedEventBus,
        config: CouncilConfig,
    ) -> Self {
        Self {
            store,
            registry,
            event_bus,
            config,
        }
    }

    /// Create a shared reference to this orchestrator
    pub fn shared(self) -> SharedOrchestrator {
        Arc::new(self)
    }

    // =========================================================================
    // Run management
    // =========================================================================

    /// Create a run with its selected models. Instance labels are assigned
    /// up front so duplicate (provider, model) selections stay tellable
    /// apart in every later artifact.
    pub fn create_run(
        &self,
        question: &str,
        specs: Vec<ModelSpec>,
        blind_review: bool,
    ) -> OrchestratorResult<RunSnapshot> {
        let run = Run::new(question, blind_review);
        let mut models: Vec<SelectedModel> = specs
            .into_iter()
            .map(|spec| SelectedModel::from_spec(&run.id, spec))
            .collect();
        apply_instance_labels(&mut models);

        self.store.put_run(&run)?;
        self.store.put_selected_models(&run.id, &models)?;

        self.publish(CouncilEvent::RunCreated {
            run_id: run.id.clone(),
            question_preview: question.chars().take(QUESTION_PREVIEW_CHARS).collect(),
            model_count: models.len(),
            blind_review,
            timestamp: Utc::now(),
        });
        info!(run_id = %run.id, models = models.len(), blind_review, "Run created");

        self.load_snapshot(&run.id)
    }

    /// Get the full snapshot for a run
    pub fn get_run(&self, run_id: &str) -> OrchestratorResult<RunSnapshot> {
        self.load_snapshot(run_id)
    }

    /// List run summaries, newest first
    pub fn list_runs(&self, limit: usize, offset: usize) -> OrchestratorResult<Vec<RunSummary>> {
        Ok(self.store.list_runs(limit, offset)?)
    }

    /// Delete a run and all its artifacts
    pub fn delete_run(&self, run_id: &str) -> OrchestratorResult<()> {
        match self.store.delete_run(run_id) {
            Err(StoreError::NotFound(_)) => Err(OrchestratorError::NotFound(run_id.to_string())),
            other => Ok(other?),
        }
    }

    /// Persisted event history for one run, oldest first
    pub fn run_events(&self, run_id: &str) -> OrchestratorResult<Vec<CouncilEvent>> {
        let events: Vec<(i64, CouncilEvent)> = self.store.get_run_events(run_id)?;
        Ok(events.into_iter().map(|(_, event)| event).collect())
    }

    // =========================================================================
    // Answer phase
    // =========================================================================

    /// Fan the question out to every selected model and persist one answer
    /// row per model, errored attempts included. Re-invocation replaces the
    /// previous answers and clears reviews and aggregation.
    pub async fn generate_answers(&self, run_id: &str) -> OrchestratorResult<RunSnapshot> {
        let snapshot = self.load_snapshot(run_id)?;
        let mut run = snapshot.run;
        run.transition(RunStatus::GeneratingAnswers, "answer generation started")?;
        self.store.put_run(&run)?;

        // Relabeling is idempotent; this also back-fills labels for models
        // written before labeling existed.
        let mut models = snapshot.selected_models;
        apply_instance_labels(&mut models);
        self.store.put_selected_models(&run.id, &models)?;

        self.publish(CouncilEvent::AnswerPhaseStarted {
            run_id: run.id.clone(),
            model_count: models.len(),
            timestamp: Utc::now(),
        });

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut handles = Vec::with_capacity(models.len());
        for model in &models {
            let semaphore = semaphore.clone();
            let registry = self.registry.clone();
            let question = run.question.clone();
            let model = model.clone();
            handles.push(tokio::spawn(async move {
                // Held for the whole provider round trip.
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return AnswerOutput::failure("Concurrency limiter closed", 0),
                };
                let adapter = match registry.get(&model.provider) {
                    Ok(adapter) => adapter,
                    Err(e) => return AnswerOutput::failure(e.to_string(), 0),
                };
                adapter
                    .generate_answer(
                        &model.model_name,
                        &question,
                        model.params.temperature.unwrap_or(DEFAULT_ANSWER_TEMPERATURE),
                        model.params.max_tokens.unwrap_or(DEFAULT_ANSWER_MAX_TOKENS),
                        model.params.system_prompt.as_deref(),
                    )
                    .await
            }));
        }

        // join_all preserves input order, so outputs re-zip with models
        // positionally and blind labels land in selection order.
        let outputs = join_all(handles).await;
        let mut answers = Vec::with_capacity(models.len());
        for (model, joined) in models.iter().zip(outputs) {
            let output = joined.unwrap_or_else(|e| {
                AnswerOutput::failure(format!("Answer task panicked: {}", e), 0)
            });
            answers.push(Answer {
                id: Uuid::new_v4().to_string(),
                run_id: run.id.clone(),
                producer_model: model.display_label().to_string(),
                provider: model.provider.clone(),
                label: String::new(),
                text: output.text,
                latency_ms: output.latency_ms,
                tokens_in: output.tokens_in,
                tokens_out: output.tokens_out,
                error: output.error,
            });
        }
        assign_labels(&mut answers);

        self.store.replace_answers(&run.id, &answers)?;
        self.store.replace_reviews(&run.id, &[])?;
        self.store.delete_aggregation(&run.id)?;

        run.transition(RunStatus::AnswersComplete, "all answer attempts finished")?;
        self.store.put_run(&run)?;

        let succeeded = answers.iter().filter(|a| a.is_success()).count();
        let failed = answers.len() - succeeded;
        self.publish(CouncilEvent::AnswersComplete {
            run_id: run.id.clone(),
            succeeded,
            failed,
            timestamp: Utc::now(),
        });
        info!(run_id = %run.id, succeeded, failed, "Answer phase complete");

        self.load_snapshot(&run.id)
    }

    // =========================================================================
    // Evaluation phase
    // =========================================================================

    /// Have reviewers rank the successful answers, then aggregate their
    /// ballots into a final ranking. Reviewers default to the run's own
    /// selected models; explicit reviewer specs get instance labels of
    /// their own. Any discarded reviewer fails the whole evaluation, with
    /// the surviving verdicts left persisted for inspection.
    pub async fn run_evaluation(
        &self,
        run_id: &str,
        reviewer_specs: Option<Vec<ModelSpec>>,
    ) -> OrchestratorResult<RunSnapshot> {
        let snapshot = self.load_snapshot(run_id)?;
        let mut run = snapshot.run;
        run.transition(RunStatus::Evaluating, "evaluation started")?;
        self.store.put_run(&run)?;

        let candidates: Vec<Answer> = snapshot
            .answers
            .iter()
            .filter(|a| a.is_success())
            .cloned()
            .collect();
        if candidates.len() < 2 {
            let got = candidates.len();
            return self.fail_run(
                run,
                format!("need at least 2 successful answers to evaluate, got {}", got),
                OrchestratorError::NotEnoughAnswers { got },
            );
        }
        let candidate_labels: Vec<String> = candidates.iter().map(|a| a.label.clone()).collect();

        let reviewers: Vec<SelectedModel> = match reviewer_specs {
            Some(specs) => {
                let mut reviewers: Vec<SelectedModel> = specs
                    .into_iter()
                    .map(|spec| SelectedModel::from_spec(&run.id, spec))
                    .collect();
                apply_instance_labels(&mut reviewers);
                reviewers
            }
            None => snapshot.selected_models,
        };

        self.publish(CouncilEvent::EvaluationStarted {
            run_id: run.id.clone(),
            reviewer_count: reviewers.len(),
            timestamp: Utc::now(),
        });

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut contexts = Vec::with_capacity(reviewers.len());
        let mut handles = Vec::with_capacity(reviewers.len());
        for reviewer in reviewers {
            // Under blind review a reviewer ranks its own answer like any
            // other; otherwise that answer is withheld from its prompt.
            let exclude_label = if run.blind_review {
                None
            } else {
                candidates
                    .iter()
                    .find(|a| {
                        a.provider == reviewer.provider
                            && a.producer_model == reviewer.display_label()
                    })
                    .map(|a| a.label.clone())
            };
            let shown_labels: Vec<String> = candidate_labels
                .iter()
                .filter(|label| Some(label.as_str()) != exclude_label.as_deref())
                .cloned()
                .collect();
            let prompt = build_review_prompt(&run.question, &candidates, exclude_label.as_deref());

            let semaphore = semaphore.clone();
            let registry = self.registry.clone();
            let provider = reviewer.provider.clone();
            let model_name = reviewer.model_name.clone();
            let reviewer_label = reviewer.display_label().to_string();
            handles.push(tokio::spawn(async move {
                // Held across all attempts, so the concurrency budget counts
                // reviewers, not raw requests.
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return ReviewOutput::failure("Concurrency limiter closed", 0),
                };
                let adapter = match registry.get(&provider) {
                    Ok(adapter) => adapter,
                    Err(e) => return ReviewOutput::failure(e.to_string(), 0),
                };
                let mut output = ReviewOutput::failure("no attempts made", 0);
                for attempt in 1..=REVIEW_ATTEMPTS {
                    output = adapter
                        .generate_review(
                            &model_name,
                            &prompt,
                            DEFAULT_REVIEW_TEMPERATURE,
                            DEFAULT_REVIEW_MAX_TOKENS,
                        )
                        .await;
                    if output.is_success() {
                        break;
                    }
                    warn!(
                        reviewer = %reviewer_label,
                        attempt,
                        error = output.error.as_deref().unwrap_or(""),
                        "Review attempt failed"
                    );
                }
                output
            }));
            contexts.push(ReviewerContext {
                reviewer,
                shown_labels,
                exclude_label,
            });
        }

        let outputs = join_all(handles).await;
        let mut reviews: Vec<Review> = Vec::new();
        let mut failures: Vec<String> = Vec::new();
        for (context, joined) in contexts.into_iter().zip(outputs) {
            let output = joined.unwrap_or_else(|e| {
                ReviewOutput::failure(format!("Review task panicked: {}", e), 0)
            });
            let reviewer_label = context.reviewer.display_label().to_string();

            if let Some(error) = output.error {
                self.discard_reviewer(&run.id, &reviewer_label, &error, &mut failures);
                continue;
            }

            let mut parsed_reviews = output.parsed_reviews;
            let mut rank_order = output.rank_order;

            // A non-blind reviewer never ranks itself; scrub stragglers in
            // case the model ranked labels it was never shown.
            if let Some(own) = &context.exclude_label {
                parsed_reviews.retain(|r| &r.label != own);
                rank_order.retain(|label| label != own);
            }

            // Missing ranking but usable scores: derive the ballot from them.
            if rank_order.is_empty() && !parsed_reviews.is_empty() {
                let mut scored: Vec<&ParsedReview> = parsed_reviews.iter().collect();
                scored.sort_by(|a, b| {
                    b.scores
                        .overall
                        .partial_cmp(&a.scores.overall)
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| {
                            b.scores
                                .correctness
                                .partial_cmp(&a.scores.correctness)
                                .unwrap_or(Ordering::Equal)
                        })
                });
                rank_order = scored.iter().map(|r| r.label.clone()).collect();
            }

            // Nothing usable at all: rank everything shown as a tie, unless
            // fewer than two candidates were shown.
            if rank_order.is_empty() {
                if context.shown_labels.len() >= 2 {
                    rank_order = context.shown_labels.clone();
                } else {
                    self.discard_reviewer(
                        &run.id,
                        &reviewer_label,
                        "empty rank_order",
                        &mut failures,
                    );
                    continue;
                }
            }

            reviews.push(Review {
                id: Uuid::new_v4().to_string(),
                run_id: run.id.clone(),
                reviewer_model: reviewer_label,
                reviewer_provider: context.reviewer.provider.clone(),
                reviews: parsed_reviews,
                rank_order,
                confidence: output.confidence,
                raw_response: Some(output.raw_response),
            });
        }

        // Surviving verdicts persist even when the evaluation fails below.
        self.store.replace_reviews(&run.id, &reviews)?;
        self.store.delete_aggregation(&run.id)?;

        if !failures.is_empty() || reviews.is_empty() {
            let reason = if failures.is_empty() {
                "no reviewers produced usable verdicts".to_string()
            } else {
                failures.join("; ")
            };
            return self.fail_run(
                run,
                reason.clone(),
                OrchestratorError::EvaluationFailed(reason),
            );
        }

        let outcome = aggregate_votes(&reviews, &candidate_labels);
        let aggregation =
            AggregationResult::new(&run.id, outcome.final_ranking, outcome.breakdown);
        self.store.put_aggregation(&aggregation)?;

        run.transition(RunStatus::Complete, "aggregation complete")?;
        self.store.put_run(&run)?;
        self.publish(CouncilEvent::RunCompleted {
            run_id: run.id.clone(),
            final_ranking: aggregation.final_ranking.clone(),
            timestamp: Utc::now(),
        });
        info!(
            run_id = %run.id,
            winner = aggregation.final_ranking.first().map(String::as_str).unwrap_or(""),
            reviewers = reviews.len(),
            "Run complete"
        );

        self.load_snapshot(&run.id)
    }

    /// Create a run, generate answers, and evaluate, in one call
    pub async fn run_full_pipeline(
        &self,
        question: &str,
        specs: Vec<ModelSpec>,
        blind_review: bool,
        reviewer_specs: Option<Vec<ModelSpec>>,
    ) -> OrchestratorResult<RunSnapshot> {
        let snapshot = self.create_run(question, specs, blind_review)?;
        self.generate_answers(&snapshot.run.id).await?;
        self.run_evaluation(&snapshot.run.id, reviewer_specs).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn load_snapshot(&self, run_id: &str) -> OrchestratorResult<RunSnapshot> {
        self.store
            .load_run(run_id)?
            .ok_or_else(|| OrchestratorError::NotFound(run_id.to_string()))
    }

    fn discard_reviewer(
        &self,
        run_id: &str,
        reviewer: &str,
        reason: &str,
        failures: &mut Vec<String>,
    ) {
        warn!(run_id, reviewer, reason, "Reviewer discarded");
        failures.push(format!("reviewer '{}': {}", reviewer, reason));
        self.publish(CouncilEvent::ReviewerDiscarded {
            run_id: run_id.to_string(),
            reviewer: reviewer.to_string(),
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn fail_run(
        &self,
        mut run: Run,
        reason: String,
        error: OrchestratorError,
    ) -> OrchestratorResult<RunSnapshot> {
        run.transition(RunStatus::Failed, &reason)?;
        self.store.put_run(&run)?;
        self.publish(CouncilEvent::RunFailed {
            run_id: run.id.clone(),
            reason,
            timestamp: Utc::now(),
        });
        Err(error)
    }

    fn publish(&self, event: CouncilEvent) {
        if let Err(e) = self.event_bus.publish(event) {
            warn!("Event publish failed: {}", e);
        }
    }
}
