//! Run lifecycle: entities and the status state machine.
//!
//! A run moves through generation and evaluation phases, driven exclusively
//! by the orchestrator:
//!
//! ```text
//! Pending → GeneratingAnswers → AnswersComplete → Evaluating → Complete
//!                 ▲                    │               │
//!                 │                    │               └─ Failed
//!                 └────────────────────┘
//!             (explicit re-run: delete-and-replace,
//!              also reachable from Complete/Failed)
//! ```
//!
//! Partial answer failure is tolerated (recorded per-answer); evaluation is
//! all-or-nothing across attempted reviewers.

pub mod status;
pub mod types;

pub use status::{RunStatus, StatusTransition, TransitionError};
pub use types::{
    AggregationResult, Answer, ModelParams, ModelSpec, ParsedReview, Review, ReviewScores, Run,
    RunSnapshot, RunSummary, SelectedModel, VoteBreakdown,
};
