//! Council CLI: ask a question, watch the rankings, inspect stored runs.

use anyhow::Result;
use clap::Parser;

use council::adapters::AdapterRegistry;
use council::config::CouncilConfig;
use council::evaluation::label_mapping;
use council::events::EventBus;
use council::orchestrator::CouncilOrchestrator;
use council::run::{ModelSpec, RunSnapshot};
use council::state::RunStore;

#[derive(Parser, Debug)]
#[command(name = "council", about = "Put one question to a council of LLMs and rank the answers")]
struct Args {
    /// Question to put to the council (runs the full pipeline)
    #[arg(long)]
    ask: Option<String>,

    /// Answering model as provider:model, repeatable
    #[arg(long = "model")]
    models: Vec<String>,

    /// Reviewer model as provider:model, repeatable (defaults to the answering models)
    #[arg(long = "reviewer")]
    reviewers: Vec<String>,

    /// Tell reviewers which answer is their own instead of reviewing blind
    #[arg(long, default_value_t = false)]
    no_blind: bool,

    /// List registered providers and their availability
    #[arg(long, default_value_t = false)]
    list_providers: bool,

    /// List models for every available provider
    #[arg(long, default_value_t = false)]
    list_models: bool,

    /// Show a stored run by ID
    #[arg(long)]
    show: Option<String>,

    /// Print the persisted event history for a run
    #[arg(long)]
    events: Option<String>,

    /// List stored runs, newest first
    #[arg(long, default_value_t = false)]
    runs: bool,

    /// Delete a stored run and all its artifacts
    #[arg(long)]
    delete: Option<String>,

    /// Path to RocksDB state directory (overrides COUNCIL_STATE_PATH)
    #[arg(long)]
    state_path: Option<std::path::PathBuf>,

    /// Maximum concurrent provider calls (overrides COUNCIL_MAX_CONCURRENCY)
    #[arg(long)]
    max_concurrency: Option<usize>,
}

fn parse_spec(raw: &str) -> Result<ModelSpec> {
    let (provider, model) = raw
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("Model spec '{}' must be provider:model", raw))?;
    if provider.is_empty() || model.is_empty() {
        anyhow::bail!("Model spec '{}' must be provider:model", raw);
    }
    Ok(ModelSpec::new(provider, model))
}

fn print_snapshot(snapshot: &RunSnapshot) {
    let run = &snapshot.run;
    println!("Run {}  [{}]", run.id, run.status);
    println!("Question: {}", run.question);

    if !snapshot.answers.is_empty() {
        println!();
        println!("Answers:");
        for answer in &snapshot.answers {
            match &answer.error {
                Some(error) => println!(
                    "  {}  {}:{}  FAILED: {}",
                    answer.label, answer.provider, answer.producer_model, error
                ),
                None => println!(
                    "  {}  {}:{}  {} ms",
                    answer.label, answer.provider, answer.producer_model, answer.latency_ms
                ),
            }
        }
    }

    if let Some(aggregation) = &snapshot.aggregation {
        let mapping = label_mapping(&snapshot.answers);
        println!();
        println!("Final ranking ({}):", aggregation.method_version);
        for (position, label) in aggregation.final_ranking.iter().enumerate() {
            let breakdown = &aggregation.vote_breakdown;
            println!(
                "  {}. {}  {}  ({} pts, {} first-place, avg {:.2})",
                position + 1,
                label,
                mapping.get(label).map(String::as_str).unwrap_or("?"),
                breakdown.borda_totals.get(label).copied().unwrap_or(0),
                breakdown.first_place_votes.get(label).copied().unwrap_or(0),
                breakdown.score_averages.get(label).copied().unwrap_or(0.0),
            );
        }

        if !snapshot.reviews.is_empty() {
            let reviewers: Vec<&str> = snapshot
                .reviews
                .iter()
                .map(|r| r.reviewer_model.as_str())
                .collect();
            println!();
            println!("Reviewers: {}", reviewers.join(", "));
        }

        if let Some(answer) = aggregation
            .final_ranking
            .first()
            .and_then(|winner| snapshot.answers.iter().find(|a| &a.label == winner))
        {
            println!();
            println!("Top answer ({}):", answer.label);
            println!("{}", answer.text);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("council=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = CouncilConfig::from_env();
    if let Some(path) = args.state_path {
        config.state_path = path;
    }
    if let Some(limit) = args.max_concurrency {
        if limit > 0 {
            config.max_concurrency = limit;
        }
    }

    let registry = AdapterRegistry::from_config(&config)
        .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?
        .shared();

    if args.list_providers {
        for (name, adapter) in registry.iter() {
            let status = if adapter.is_available() {
                "available"
            } else {
                "not configured"
            };
            println!("{:<12} {}", name, status);
        }
        return Ok(());
    }

    if args.list_models {
        for (name, adapter) in registry.iter() {
            if !adapter.is_available() {
                continue;
            }
            for model in adapter.list_models().await {
                println!("{:<12} {:<36} {}", name, model.id, model.display_name);
            }
        }
        return Ok(());
    }

    let store = RunStore::open(&config.state_path)
        .map_err(|e| anyhow::anyhow!("Failed to open state store: {}", e))?
        .shared();
    let bus = EventBus::with_persistence(store.clone()).shared();
    let orchestrator = CouncilOrchestrator::new(store, registry, bus, config).shared();

    if args.runs {
        for summary in orchestrator.list_runs(50, 0)? {
            println!(
                "{}  {:<18} {}  {}",
                summary.id,
                summary.status.to_string(),
                summary.created_at.format("%Y-%m-%d %H:%M:%S"),
                summary.question.chars().take(60).collect::<String>(),
            );
        }
        return Ok(());
    }

    if let Some(run_id) = args.show {
        let snapshot = orchestrator.get_run(&run_id)?;
        print_snapshot(&snapshot);
        return Ok(());
    }

    if let Some(run_id) = args.events {
        for event in orchestrator.run_events(&run_id)? {
            println!(
                "{}  {}",
                event.timestamp().format("%Y-%m-%d %H:%M:%S%.3f"),
                serde_json::to_string(&event)?,
            );
        }
        return Ok(());
    }

    if let Some(run_id) = args.delete {
        orchestrator.delete_run(&run_id)?;
        println!("Deleted run {}", run_id);
        return Ok(());
    }

    if let Some(question) = args.ask {
        if args.models.len() < 2 {
            anyhow::bail!("Provide at least 2 --model specs (provider:model)");
        }
        let specs = args
            .models
            .iter()
            .map(|raw| parse_spec(raw))
            .collect::<Result<Vec<_>>>()?;
        let reviewer_specs = if args.reviewers.is_empty() {
            None
        } else {
            Some(
                args.reviewers
                    .iter()
                    .map(|raw| parse_spec(raw))
                    .collect::<Result<Vec<_>>>()?,
            )
        };

        let snapshot = orchestrator
            .run_full_pipeline(&question, specs, !args.no_blind, reviewer_specs)
            .await?;
        print_snapshot(&snapshot);
        return Ok(());
    }

    anyhow::bail!("Nothing to do; try --ask with --model specs, or --runs (see --help)")
}
