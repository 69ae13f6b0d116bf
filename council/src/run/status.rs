//! Run status state machine: phases, transitions, and history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a council run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run created but no phase started.
    Pending,
    /// Answer fan-out in progress.
    GeneratingAnswers,
    /// All answer tasks finished (individual failures allowed).
    AnswersComplete,
    /// Review fan-out and aggregation in progress.
    Evaluating,
    /// Every reviewer produced a usable review and aggregation succeeded.
    Complete,
    /// Not enough answers, or at least one reviewer was discarded.
    Failed,
}

impl RunStatus {
    /// Whether this status ends the automatic lifecycle.
    ///
    /// Terminal statuses still allow explicit re-run entries (see
    /// `valid_transitions`); nothing transitions out of them on its own.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Valid transitions from this status.
    ///
    /// `AnswersComplete`, `Complete`, and `Failed` permit re-entering the
    /// generation or evaluation phase: a re-run replaces the phase's rows
    /// rather than appending to them.
    pub fn valid_transitions(self) -> &'static [RunStatus] {
        match self {
            Self::Pending => &[Self::GeneratingAnswers],
            Self::GeneratingAnswers => &[Self::AnswersComplete],
            Self::AnswersComplete => &[Self::GeneratingAnswers, Self::Evaluating],
            Self::Evaluating => &[Self::Complete, Self::Failed],
            Self::Complete => &[Self::GeneratingAnswers, Self::Evaluating],
            Self::Failed => &[Self::GeneratingAnswers, Self::Evaluating],
        }
    }

    /// Whether `to` is a legal next status.
    pub fn can_transition_to(self, to: RunStatus) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::GeneratingAnswers => write!(f, "generating_answers"),
            Self::AnswersComplete => write!(f, "answers_complete"),
            Self::Evaluating => write!(f, "evaluating"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A status transition record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransition {
    /// Previous status.
    pub from: RunStatus,
    /// New status.
    pub to: RunStatus,
    /// When the transition occurred.
    pub timestamp: DateTime<Utc>,
    /// Reason for the transition.
    pub reason: String,
}

/// Error for invalid status transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: RunStatus,
    pub to: RunStatus,
    pub reason: String,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid transition {} -> {}: {}",
            self.from, self.to, self.reason
        )
    }
}

impl std::error::Error for TransitionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(RunStatus::Pending.can_transition_to(RunStatus::GeneratingAnswers));
        assert!(RunStatus::GeneratingAnswers.can_transition_to(RunStatus::AnswersComplete));
        assert!(RunStatus::AnswersComplete.can_transition_to(RunStatus::Evaluating));
        assert!(RunStatus::Evaluating.can_transition_to(RunStatus::Complete));
        assert!(RunStatus::Evaluating.can_transition_to(RunStatus::Failed));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!RunStatus::Pending.can_transition_to(RunStatus::Evaluating));
        assert!(!RunStatus::Pending.can_transition_to(RunStatus::Complete));
        assert!(!RunStatus::GeneratingAnswers.can_transition_to(RunStatus::Evaluating));
        assert!(!RunStatus::Evaluating.can_transition_to(RunStatus::GeneratingAnswers));
        assert!(!RunStatus::Complete.can_transition_to(RunStatus::Failed));
    }

    #[test]
    fn test_rerun_entries() {
        // Re-driving a finished run is allowed; the phase replaces its rows.
        assert!(RunStatus::AnswersComplete.can_transition_to(RunStatus::GeneratingAnswers));
        assert!(RunStatus::Complete.can_transition_to(RunStatus::GeneratingAnswers));
        assert!(RunStatus::Complete.can_transition_to(RunStatus::Evaluating));
        assert!(RunStatus::Failed.can_transition_to(RunStatus::Evaluating));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(RunStatus::Complete.is_terminal());
        assert!(RunStatus::Failed.is_terminal());
        assert!(!RunStatus::Pending.is_terminal());
        assert!(!RunStatus::Evaluating.is_terminal());
    }

    #[test]
    fn test_serialized_values() {
        assert_eq!(
            serde_json::to_string(&RunStatus::GeneratingAnswers).unwrap(),
            "\"generating_answers\""
        );
        assert_eq!(
            serde_json::to_string(&RunStatus::AnswersComplete).unwrap(),
            "\"answers_complete\""
        );
        let status: RunStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(status, RunStatus::Failed);
    }

    #[test]
    fn test_display_matches_serde() {
        for status in [
            RunStatus::Pending,
            RunStatus::GeneratingAnswers,
            RunStatus::AnswersComplete,
            RunStatus::Evaluating,
            RunStatus::Complete,
            RunStatus::Failed,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json.trim_matches('"'), status.to_string());
        }
    }
}
