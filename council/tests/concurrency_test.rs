//! Concurrency behavior of the answer and review fan-outs.
//!
//! A slow in-memory provider records how many requests are in flight at
//! once, verifying that the per-phase semaphore enforces its cap and that
//! outputs re-join their models positionally no matter which requests
//! finish first.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use council::{
    AdapterRegistry, AnswerOutput, CouncilConfig, CouncilOrchestrator, EventBus, ModelInfo,
    ModelSpec, ProviderAdapter, ReviewOutput, RunStatus, RunStore, SharedOrchestrator,
};

/// Provider that sleeps per model and tracks peak in-flight counts.
struct DelayedProvider {
    delays: BTreeMap<String, u64>,
    answers_in_flight: AtomicUsize,
    answers_peak: AtomicUsize,
    reviews_in_flight: AtomicUsize,
    reviews_peak: AtomicUsize,
}

impl DelayedProvider {
    fn new(delays: &[(&str, u64)]) -> Self {
        Self {
            delays: delays.iter().map(|(m, d)| (m.to_string(), *d)).collect(),
            answers_in_flight: AtomicUsize::new(0),
            answers_peak: AtomicUsize::new(0),
            reviews_in_flight: AtomicUsize::new(0),
            reviews_peak: AtomicUsize::new(0),
        }
    }

    fn delay_for(&self, model: &str) -> Duration {
        Duration::from_millis(*self.delays.get(model).unwrap_or(&0))
    }
}

#[async_trait]
impl ProviderAdapter for DelayedProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn list_models(&self) -> Vec<ModelInfo> {
        self.delays
            .keys()
            .map(|id| ModelInfo::new(id.clone(), id.clone()))
            .collect()
    }

    async fn generate_answer(
        &self,
        model: &str,
        _question: &str,
        _temperature: f64,
        _max_tokens: u32,
        _system_prompt: Option<&str>,
    ) -> AnswerOutput {
        let now = self.answers_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.answers_peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay_for(model)).await;
        self.answers_in_flight.fetch_sub(1, Ordering::SeqCst);
        AnswerOutput {
            text: format!("reply from {}", model),
            latency_ms: 1,
            tokens_in: None,
            tokens_out: None,
            error: None,
        }
    }

    async fn generate_review(
        &self,
        _model: &str,
        _review_prompt: &str,
        _temperature: f64,
        _max_tokens: u32,
    ) -> ReviewOutput {
        let now = self.reviews_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.reviews_peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.reviews_in_flight.fetch_sub(1, Ordering::SeqCst);
        // No structure at all; every reviewer degrades to a shown-order ballot.
        ReviewOutput::from_raw("no structured verdict".to_string(), 20)
    }
}

fn setup(
    provider: Arc<DelayedProvider>,
    max_concurrency: usize,
) -> (tempfile::TempDir, SharedOrchestrator) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let store = RunStore::open(dir.path()).expect("store open failed").shared();
    let mut registry = AdapterRegistry::empty();
    registry.register("stub", provider);
    let event_bus = EventBus::new().shared();
    let config = CouncilConfig {
        max_concurrency,
        ..Default::default()
    };
    let orchestrator =
        CouncilOrchestrator::new(store, registry.shared(), event_bus, config).shared();
    (dir, orchestrator)
}

fn stub_specs(models: &[&str]) -> Vec<ModelSpec> {
    models.iter().map(|m| ModelSpec::new("stub", *m)).collect()
}

#[tokio::test]
async fn test_answer_fanout_respects_concurrency_cap() {
    let names = ["m1", "m2", "m3", "m4", "m5"];
    let provider = Arc::new(DelayedProvider::new(&[
        ("m1", 30),
        ("m2", 30),
        ("m3", 30),
        ("m4", 30),
        ("m5", 30),
    ]));
    let (_dir, orchestrator) = setup(provider.clone(), 2);

    let created = orchestrator
        .create_run("How should retries back off?", stub_specs(&names), true)
        .expect("create should succeed");
    let snapshot = orchestrator
        .generate_answers(&created.run.id)
        .await
        .expect("answer phase should succeed");

    assert_eq!(snapshot.run.status, RunStatus::AnswersComplete);
    assert_eq!(snapshot.successful_answers().len(), 5);

    let peak = provider.answers_peak.load(Ordering::SeqCst);
    assert_eq!(peak, 2, "cap of 2 should both bound and saturate the fan-out");
}

#[tokio::test]
async fn test_answers_rejoin_in_selection_order() {
    // Earlier selections sleep longer, so completion order is reversed.
    let names = ["m1", "m2", "m3", "m4", "m5"];
    let provider = Arc::new(DelayedProvider::new(&[
        ("m1", 80),
        ("m2", 60),
        ("m3", 40),
        ("m4", 20),
        ("m5", 10),
    ]));
    let (_dir, orchestrator) = setup(provider.clone(), 8);

    let created = orchestrator
        .create_run("How should retries back off?", stub_specs(&names), true)
        .expect("create should succeed");
    let snapshot = orchestrator
        .generate_answers(&created.run.id)
        .await
        .expect("answer phase should succeed");

    let producers: Vec<&str> = snapshot
        .answers
        .iter()
        .map(|a| a.producer_model.as_str())
        .collect();
    assert_eq!(producers, names.to_vec());

    let labels: Vec<&str> = snapshot.answers.iter().map(|a| a.label.as_str()).collect();
    assert_eq!(labels, vec!["A", "B", "C", "D", "E"]);

    for (answer, name) in snapshot.answers.iter().zip(names) {
        assert_eq!(answer.text, format!("reply from {}", name));
    }

    let peak = provider.answers_peak.load(Ordering::SeqCst);
    assert_eq!(peak, 5, "an uncontended cap should let all five run at once");
}

#[tokio::test]
async fn test_review_fanout_respects_concurrency_cap() {
    let names = ["m1", "m2", "m3", "m4"];
    let provider = Arc::new(DelayedProvider::new(&[
        ("m1", 5),
        ("m2", 5),
        ("m3", 5),
        ("m4", 5),
    ]));
    let (_dir, orchestrator) = setup(provider.clone(), 2);

    let snapshot = orchestrator
        .run_full_pipeline("How should retries back off?", stub_specs(&names), true, None)
        .await
        .expect("pipeline should complete");

    assert_eq!(snapshot.run.status, RunStatus::Complete);
    assert_eq!(snapshot.reviews.len(), 4);
    let aggregation = snapshot.aggregation.expect("aggregation should exist");
    assert_eq!(aggregation.final_ranking, vec!["A", "B", "C", "D"]);

    let peak = provider.reviews_peak.load(Ordering::SeqCst);
    assert_eq!(peak, 2, "review fan-out should hold the same cap as answers");
}
