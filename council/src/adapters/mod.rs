//! Provider adapters for the council.
//!
//! ```text
//!                    +--------------------+
//!                    |  ProviderAdapter   |
//!                    |  (trait)           |
//!                    +---------+----------+
//!                              |
//!        +----------------+----+-----------+----------------+
//!        |                |                |                |
//!  +-----v-----+   +------v-----+   +------v-----+   +------v------+
//!  | Anthropic |   |   OpenAI   |   |   Google   |   |  LM Studio  |
//!  +-----------+   +------------+   +------------+   +-------------+
//! ```
//!
//! Adapter methods never return `Err`: transport failures, non-2xx statuses,
//! and missing credentials all come back as an output with `error` set, so
//! one dead provider degrades a run instead of aborting it.

pub mod anthropic;
pub mod google;
pub mod lmstudio;
pub mod openai;
pub mod registry;

pub use anthropic::AnthropicAdapter;
pub use google::GoogleAdapter;
pub use lmstudio::LmStudioAdapter;
pub use openai::OpenAiAdapter;
pub use registry::{AdapterRegistry, RegistryError, SharedAdapterRegistry};

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::run::ParsedReview;

/// A model a provider can serve, as shown in listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: String,
    pub display_name: String,
}

impl ModelInfo {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Result of one answer attempt.
#[derive(Debug, Clone)]
pub struct AnswerOutput {
    pub text: String,
    pub latency_ms: u64,
    pub tokens_in: Option<u32>,
    pub tokens_out: Option<u32>,
    pub error: Option<String>,
}

impl AnswerOutput {
    pub fn failure(error: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            text: String::new(),
            latency_ms,
            tokens_in: None,
            tokens_out: None,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of one review attempt, with the model's raw text preserved for
/// audit alongside whatever structure could be parsed out of it.
#[derive(Debug, Clone)]
pub struct ReviewOutput {
    pub raw_response: String,
    pub parsed_reviews: Vec<ParsedReview>,
    pub rank_order: Vec<String>,
    pub confidence: f64,
    pub latency_ms: u64,
    pub error: Option<String>,
}

impl ReviewOutput {
    /// Parse a raw model response into a review output. Unparseable text is
    /// not an error here; it yields empty structure at neutral confidence
    /// and the caller decides whether a fallback ranking applies.
    pub fn from_raw(raw_response: String, latency_ms: u64) -> Self {
        let parsed = parse_review_response(&raw_response);
        Self {
            raw_response,
            parsed_reviews: parsed.reviews,
            rank_order: parsed.rank_order,
            confidence: parsed.confidence,
            latency_ms,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            raw_response: String::new(),
            parsed_reviews: Vec::new(),
            rank_order: Vec::new(),
            confidence: 0.0,
            latency_ms,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Uniform interface over LLM providers.
///
/// `generate_answer` and `generate_review` are infallible by contract; see
/// the module docs.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable provider name used in model specs and persisted rows.
    fn name(&self) -> &'static str;

    /// Whether the adapter has the credentials or endpoint it needs.
    fn is_available(&self) -> bool;

    /// Models this provider can serve right now.
    async fn list_models(&self) -> Vec<ModelInfo>;

    async fn generate_answer(
        &self,
        model: &str,
        question: &str,
        temperature: f64,
        max_tokens: u32,
        system_prompt: Option<&str>,
    ) -> AnswerOutput;

    async fn generate_review(
        &self,
        model: &str,
        review_prompt: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> ReviewOutput;
}

impl std::fmt::Debug for dyn ProviderAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderAdapter")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

/// Shared handle to a provider adapter.
pub type SharedProviderAdapter = Arc<dyn ProviderAdapter>;

#[derive(Debug, Deserialize)]
struct ReviewResponseBody {
    #[serde(default)]
    reviews: Vec<ParsedReview>,
    #[serde(default)]
    rank_order: Vec<String>,
    #[serde(default = "neutral_confidence")]
    confidence: f64,
}

fn neutral_confidence() -> f64 {
    0.5
}

impl Default for ReviewResponseBody {
    fn default() -> Self {
        Self {
            reviews: Vec::new(),
            rank_order: Vec::new(),
            confidence: neutral_confidence(),
        }
    }
}

/// Pull the reviewer's JSON object out of a raw model response.
///
/// Tolerates fenced code blocks and prose around the object; anything that
/// still fails to parse collapses to the neutral default rather than an
/// error, since a malformed review is a quality problem, not a transport one.
fn parse_review_response(raw: &str) -> ReviewResponseBody {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        text = match rest.rfind("```") {
            Some(end) => &rest[..end],
            None => rest,
        };
        text = text.trim();
    }

    let Some(start) = text.find('{') else {
        return ReviewResponseBody::default();
    };
    let Some(end) = text.rfind('}') else {
        return ReviewResponseBody::default();
    };
    if end < start {
        return ReviewResponseBody::default();
    }

    serde_json::from_str(&text[start..=end]).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = r#"{
        "reviews": [
            {
                "label": "A",
                "scores": {
                    "correctness": 8,
                    "completeness": 7,
                    "clarity": 9,
                    "helpfulness": 8,
                    "safety": 10,
                    "overall": 8
                },
                "critique": "Solid answer."
            }
        ],
        "rank_order": ["A", "B"],
        "confidence": 0.9
    }"#;

    #[test]
    fn test_parse_plain_json() {
        let parsed = parse_review_response(WELL_FORMED);

        assert_eq!(parsed.reviews.len(), 1);
        assert_eq!(parsed.reviews[0].label, "A");
        assert_eq!(parsed.reviews[0].scores.overall, 8.0);
        assert_eq!(parsed.rank_order, vec!["A", "B"]);
        assert_eq!(parsed.confidence, 0.9);
    }

    #[test]
    fn test_parse_fenced_json() {
        let fenced = format!("```json\n{}\n```", WELL_FORMED);
        let parsed = parse_review_response(&fenced);

        assert_eq!(parsed.rank_order, vec!["A", "B"]);
    }

    #[test]
    fn test_parse_fence_without_language_tag() {
        let fenced = format!("```\n{}\n```", WELL_FORMED);
        let parsed = parse_review_response(&fenced);

        assert_eq!(parsed.rank_order, vec!["A", "B"]);
    }

    #[test]
    fn test_parse_json_wrapped_in_prose() {
        let wrapped = format!("Here is my evaluation:\n{}\nHope that helps!", WELL_FORMED);
        let parsed = parse_review_response(&wrapped);

        assert_eq!(parsed.rank_order, vec!["A", "B"]);
        assert_eq!(parsed.confidence, 0.9);
    }

    #[test]
    fn test_parse_garbage_is_neutral() {
        let parsed = parse_review_response("I refuse to rank these answers.");

        assert!(parsed.reviews.is_empty());
        assert!(parsed.rank_order.is_empty());
        assert_eq!(parsed.confidence, 0.5);
    }

    #[test]
    fn test_parse_malformed_object_is_neutral() {
        let parsed = parse_review_response(r#"{"rank_order": ["A", }"#);

        assert!(parsed.rank_order.is_empty());
        assert_eq!(parsed.confidence, 0.5);
    }

    #[test]
    fn test_parse_missing_fields_take_defaults() {
        let parsed = parse_review_response(r#"{"rank_order": ["B", "A"]}"#);

        assert!(parsed.reviews.is_empty());
        assert_eq!(parsed.rank_order, vec!["B", "A"]);
        assert_eq!(parsed.confidence, 0.5);
    }

    #[test]
    fn test_parse_partial_scores_default_to_zero() {
        let parsed = parse_review_response(
            r#"{"reviews": [{"label": "A", "scores": {"overall": 6}}], "rank_order": ["A"]}"#,
        );

        assert_eq!(parsed.reviews[0].scores.overall, 6.0);
        assert_eq!(parsed.reviews[0].scores.clarity, 0.0);
        assert_eq!(parsed.reviews[0].critique, "");
    }

    #[test]
    fn test_review_output_from_raw() {
        let output = ReviewOutput::from_raw(WELL_FORMED.to_string(), 42);

        assert!(output.is_success());
        assert_eq!(output.latency_ms, 42);
        assert_eq!(output.rank_order, vec!["A", "B"]);
        assert_eq!(output.raw_response, WELL_FORMED);
    }

    #[test]
    fn test_failure_outputs() {
        let answer = AnswerOutput::failure("boom", 7);
        assert!(!answer.is_success());
        assert_eq!(answer.error.as_deref(), Some("boom"));
        assert!(answer.text.is_empty());

        let review = ReviewOutput::failure("boom", 7);
        assert!(!review.is_success());
        assert!(review.rank_order.is_empty());
    }
}
