//! Runs a matrix experiment end to end and prints the cells as JSON.
//!
//! ```text
//! OPENAI_API_KEY=... cargo run -p matrix-experiment -- \
//!     --prompt "write an email announcing our spring sale" \
//!     --tones professional,casual --lengths short --formats email \
//!     --architect gpt-4o-mini --executor gpt-4o-mini
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use blueprint::adapters::{Credentials, LlmGateway, RetryPolicy};
use blueprint::config::BlueprintConfig;
use blueprint::pipeline::{
    JudgeSettings, MatrixConfig, MatrixExperiment, MatrixRunner, ModelSelection,
};
use blueprint::primitives::{ExperimentId, OutputType, RubricEnforcement};
use blueprint::prompts::{PromptAssembler, Toggles};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "matrix-experiment", version, about = "Sweep a prompt across tones, lengths, and formats")]
struct Args {
    /// The user brief.
    #[arg(long)]
    prompt: String,

    /// Comma-separated tone ids.
    #[arg(long, value_delimiter = ',', default_value = "professional")]
    tones: Vec<String>,

    /// Comma-separated length ids.
    #[arg(long, value_delimiter = ',', default_value = "medium")]
    lengths: Vec<String>,

    /// Comma-separated format ids.
    #[arg(long, value_delimiter = ',', default_value = "paragraph")]
    formats: Vec<String>,

    /// Output type; inferred from the brief when omitted.
    #[arg(long)]
    output_type: Option<OutputType>,

    /// Model that writes the blueprint.
    #[arg(long, default_value = "gpt-4o-mini")]
    architect: String,

    /// Model that runs the blueprint.
    #[arg(long)]
    executor: Option<String>,

    /// Model that scores the output; defaults to the architect.
    #[arg(long)]
    judge: Option<String>,

    /// Use two judges per cell.
    #[arg(long)]
    dual_judge: bool,

    /// Skip the judge phase.
    #[arg(long)]
    no_judge: bool,

    /// Judge scoring discipline: lenient, standard, or strict.
    #[arg(long)]
    rubric: Option<RubricEnforcement>,

    /// Ask the architect to restate vague briefs first.
    #[arg(long)]
    reverse_prompting: bool,

    /// Ask the architect to fill in implied context.
    #[arg(long)]
    enrichment: bool,

    /// JSON configuration file; `BLUEPRINT_*` variables still apply on top.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => BlueprintConfig::from_json_file(path)?
            .with_overrides(|key| std::env::var(key).ok())?,
        None => BlueprintConfig::from_env()?,
    };
    blueprint::telemetry::init_tracing(&config.telemetry)?;

    let credentials = Credentials::from_env();
    if !blueprint::adapters::Provider::ALL
        .into_iter()
        .any(|provider| credentials.has(provider))
    {
        bail!("no provider key found; set OPENAI_API_KEY, ANTHROPIC_API_KEY, or GEMINI_API_KEY");
    }

    let retry = RetryPolicy {
        unavailable_retries: config.gateway.unavailable_retries,
        transient_retries: config.gateway.transient_retries,
        delays: config.gateway.backoff(),
    };
    let gateway = LlmGateway::standard(config.gateway.timeout(), retry)
        .context("failed to build the model gateway")?;
    let models = gateway.catalog().clone();

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; finishing the current cell");
            on_ctrl_c.cancel();
        }
    });

    let experiment = MatrixExperiment {
        id: ExperimentId::random(),
        prompt: args.prompt,
        matrix: MatrixConfig {
            tones: args.tones,
            lengths: args.lengths,
            formats: args.formats,
        },
        output_type: args.output_type,
        toggles: Toggles {
            reverse_prompting: args.reverse_prompting,
            enrichment: args.enrichment,
            ..Toggles::default()
        },
        type_specific: None,
        models: ModelSelection {
            architect: args.architect,
            executor: args.executor,
            judge: args.judge,
        },
        credentials,
        judge: JudgeSettings {
            enabled: config.matrix.judge_enabled && !args.no_judge,
            dual: config.matrix.dual_judge || args.dual_judge,
            rubric: args.rubric.unwrap_or(config.matrix.rubric),
            baselines: Vec::new(),
        },
        cancel,
    };

    let runner = MatrixRunner::new(Arc::new(gateway), PromptAssembler::standard())
        .with_max_cells(config.matrix.max_cells)
        .with_model_catalog(models);
    let results = runner.run(&experiment).await?;

    info!(experiment = %experiment.id, cells = results.len(), "experiment finished");
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
