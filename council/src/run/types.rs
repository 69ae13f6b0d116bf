//! Core entities for a council run and its children.
//!
//! A `Run` owns its `SelectedModel`, `Answer`, and `Review` rows plus at most
//! one `AggregationResult`; deleting a run cascades to all of them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::{RunStatus, StatusTransition, TransitionError};

/// Per-model generation settings, with the back-filled instance label.
///
/// All fields are optional; generation falls back to the configured defaults
/// when a field is unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Sampling temperature for answer generation.
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Token budget for answer generation.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Optional system prompt prepended to the question.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Disambiguated display label for this instance, unique within the run.
    #[serde(default)]
    pub instance_label: Option<String>,
}

impl ModelParams {
    /// Params carrying only an explicit instance label.
    pub fn with_instance_label(label: impl Into<String>) -> Self {
        Self {
            instance_label: Some(label.into()),
            ..Self::default()
        }
    }
}

/// Caller-supplied description of one council member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Adapter registry key ("anthropic", "openai", "google", "lmstudio").
    pub provider: String,
    /// Vendor model identifier.
    pub model_name: String,
    /// Generation settings and optional explicit instance label.
    #[serde(default)]
    pub params: ModelParams,
}

impl ModelSpec {
    pub fn new(provider: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model_name: model_name.into(),
            params: ModelParams::default(),
        }
    }

    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }
}

/// One model instance selected for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedModel {
    /// Unique identifier.
    pub id: String,
    /// Owning run.
    pub run_id: String,
    /// Adapter registry key.
    pub provider: String,
    /// Vendor model identifier.
    pub model_name: String,
    /// Generation settings; `instance_label` is back-filled by labeling.
    pub params: ModelParams,
}

impl SelectedModel {
    /// Build a selected-model row from a caller spec.
    pub fn from_spec(run_id: &str, spec: ModelSpec) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            run_id: run_id.to_string(),
            provider: spec.provider,
            model_name: spec.model_name,
            params: spec.params,
        }
    }

    /// Resolved display label: the instance label once assigned, otherwise
    /// the raw model name.
    pub fn display_label(&self) -> &str {
        self.params
            .instance_label
            .as_deref()
            .unwrap_or(&self.model_name)
    }
}

/// One model's answer to the run's question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// Unique identifier.
    pub id: String,
    /// Owning run.
    pub run_id: String,
    /// Resolved instance label of the producer (not the raw model name).
    pub producer_model: String,
    /// Adapter registry key of the producer.
    pub provider: String,
    /// Blind label (A, B, C, ... then Z1, Z2, ...), unique within the run.
    pub label: String,
    /// Answer text; empty when `error` is set.
    pub text: String,
    /// Wall-clock milliseconds for the generation round trip.
    pub latency_ms: u64,
    /// Prompt tokens, when the vendor reports them.
    pub tokens_in: Option<u32>,
    /// Completion tokens, when the vendor reports them.
    pub tokens_out: Option<u32>,
    /// Generation failure, captured instead of raised.
    pub error: Option<String>,
}

impl Answer {
    /// Whether generation succeeded for this answer.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Scores one reviewer gave one answer, each dimension 0-10.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewScores {
    #[serde(default)]
    pub correctness: f64,
    #[serde(default)]
    pub completeness: f64,
    #[serde(default)]
    pub clarity: f64,
    #[serde(default)]
    pub helpfulness: f64,
    #[serde(default)]
    pub safety: f64,
    #[serde(default)]
    pub overall: f64,
}

/// One reviewer's parsed judgment of one answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedReview {
    /// Blind label of the reviewed answer.
    #[serde(default)]
    pub label: String,
    /// Dimension scores.
    #[serde(default)]
    pub scores: ReviewScores,
    /// Short free-text critique.
    #[serde(default)]
    pub critique: String,
}

/// One reviewer's judgment over the whole answer set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    /// Unique identifier.
    pub id: String,
    /// Owning run.
    pub run_id: String,
    /// Resolved instance label of the reviewer.
    pub reviewer_model: String,
    /// Adapter registry key of the reviewer.
    pub reviewer_provider: String,
    /// Per-answer score records, in the order the reviewer emitted them.
    pub reviews: Vec<ParsedReview>,
    /// Blind labels best-to-worst.
    pub rank_order: Vec<String>,
    /// Reviewer's self-reported confidence in [0, 1].
    pub confidence: f64,
    /// Unparsed model output, kept for audit.
    pub raw_response: Option<String>,
}

/// Auditable per-label tallies behind a final ranking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoteBreakdown {
    /// Borda points per blind label.
    pub borda_totals: BTreeMap<String, i64>,
    /// Times each label was ranked first.
    pub first_place_votes: BTreeMap<String, i64>,
    /// Mean `overall` score per label (0.0 when never scored).
    pub score_averages: BTreeMap<String, f64>,
}

/// The single consensus result of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationResult {
    /// Unique identifier.
    pub id: String,
    /// Owning run; at most one aggregation per run.
    pub run_id: String,
    /// Blind labels best-to-worst.
    pub final_ranking: Vec<String>,
    /// Per-label tallies.
    pub vote_breakdown: VoteBreakdown,
    /// Versions the aggregation algorithm.
    pub method_version: String,
}

impl AggregationResult {
    pub fn new(run_id: &str, final_ranking: Vec<String>, vote_breakdown: VoteBreakdown) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            run_id: run_id.to_string(),
            final_ranking,
            vote_breakdown,
            method_version: "borda_v1".to_string(),
        }
    }
}

/// One council evaluation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Unique identifier.
    pub id: String,
    /// When the run was created.
    pub created_at: DateTime<Utc>,
    /// The question put to the council.
    pub question: String,
    /// Current lifecycle status.
    pub status: RunStatus,
    /// Whether reviewers see all answers, their own included.
    pub blind_review: bool,
    /// Status transition history.
    pub transitions: Vec<StatusTransition>,
}

impl Run {
    /// Create a new run in `Pending`.
    pub fn new(question: &str, blind_review: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            question: question.to_string(),
            status: RunStatus::Pending,
            blind_review,
            transitions: Vec::new(),
        }
    }

    /// Transition to a new status with a reason, recording history.
    pub fn transition(&mut self, to: RunStatus, reason: &str) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(TransitionError {
                from: self.status,
                to,
                reason: format!(
                    "not a valid transition (allowed: {:?})",
                    self.status.valid_transitions()
                ),
            });
        }

        self.transitions.push(StatusTransition {
            from: self.status,
            to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.status = to;
        Ok(())
    }

    /// Whether the automatic lifecycle has ended.
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Condensed run row for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub question: String,
    pub status: RunStatus,
}

impl RunSummary {
    pub fn from_run(run: &Run) -> Self {
        Self {
            id: run.id.clone(),
            created_at: run.created_at,
            question: run.question.clone(),
            status: run.status,
        }
    }
}

/// A run with all of its children eagerly loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub run: Run,
    pub selected_models: Vec<SelectedModel>,
    pub answers: Vec<Answer>,
    pub reviews: Vec<Review>,
    pub aggregation: Option<AggregationResult>,
}

impl RunSnapshot {
    /// Answers that generated successfully, in blind-label order.
    pub fn successful_answers(&self) -> Vec<&Answer> {
        self.answers.iter().filter(|a| a.is_success()).collect()
    }
}
