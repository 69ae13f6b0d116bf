//! Event types for council runs
//!
//! These events drive the pub/sub system and are persisted for replay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for events
pub type EventId = String;

/// All council run events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouncilEvent {
    /// A new run was created
    RunCreated {
        run_id: String,
        question_preview: String,
        model_count: usize,
        blind_review: bool,
        timestamp: DateTime<Utc>,
    },

    /// The answer phase started fanning out to providers
    AnswerPhaseStarted {
        run_id: String,
        model_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// All answer attempts finished
    AnswersComplete {
        run_id: String,
        succeeded: usize,
        failed: usize,
        timestamp: DateTime<Utc>,
    },

    /// The evaluation phase started fanning out to reviewers
    EvaluationStarted {
        run_id: String,
        reviewer_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A reviewer's verdict was discarded
    ReviewerDiscarded {
        run_id: String,
        reviewer: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A run reached a final ranking
    RunCompleted {
        run_id: String,
        final_ranking: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A run failed
    RunFailed {
        run_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl CouncilEvent {
    /// Get the timestamp of this event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            CouncilEvent::RunCreated { timestamp, .. } => *timestamp,
            CouncilEvent::AnswerPhaseStarted { timestamp, .. } => *timestamp,
            CouncilEvent::AnswersComplete { timestamp, .. } => *timestamp,
            CouncilEvent::EvaluationStarted { timestamp, .. } => *timestamp,
            CouncilEvent::ReviewerDiscarded { timestamp, .. } => *timestamp,
            CouncilEvent::RunCompleted { timestamp, .. } => *timestamp,
            CouncilEvent::RunFailed { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            CouncilEvent::RunCreated { .. } => "run_created",
            CouncilEvent::AnswerPhaseStarted { .. } => "answer_phase_started",
            CouncilEvent::AnswersComplete { .. } => "answers_complete",
            CouncilEvent::EvaluationStarted { .. } => "evaluation_started",
            CouncilEvent::ReviewerDiscarded { .. } => "reviewer_discarded",
            CouncilEvent::RunCompleted { .. } => "run_completed",
            CouncilEvent::RunFailed { .. } => "run_failed",
        }
    }

    /// Get the run this event belongs to
    pub fn run_id(&self) -> &str {
        match self {
            CouncilEvent::RunCreated { run_id, .. } => run_id,
            CouncilEvent::AnswerPhaseStarted { run_id, .. } => run_id,
            CouncilEvent::AnswersComplete { run_id, .. } => run_id,
            CouncilEvent::EvaluationStarted { run_id, .. } => run_id,
            CouncilEvent::ReviewerDiscarded { run_id, .. } => run_id,
            CouncilEvent::RunCompleted { run_id, .. } => run_id,
            CouncilEvent::RunFailed { run_id, .. } => run_id,
        }
    }

    /// Create a new unique event ID
    pub fn new_id() -> EventId {
        uuid::Uuid::new_v4().to_string()
    }
}
