//! Intake CLI
//!
//! Replays a scripted sequence of submissions against one new application
//! and prints each result plus the final summary as JSON.
//!
//! Usage:
//!   cargo run --features cli --bin intake -- --input ops.json
//!   cargo run --features cli --bin intake -- --input ops.json \
//!     --config config/intake.yaml --store-dir ./records
//!
//! The input file is a JSON array of operations:
//!   [
//!     {"op": "submit", "step": "personal_details", "full_name": "Alice Wonderland", ...},
//!     {"op": "contact", "name": "White Rabbit", "relationship": "friend", ...},
//!     {"op": "submit", "step": "id_verification", "primary_id_document": {...}, ...}
//!   ]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

use ob_intake::{
    ContactInput, InMemoryRecordStore, IntakeConfig, IntakeWorkflow, JsonFileRecordStore,
    RecordStore, StepSubmission,
};

/// Scripted onboarding intake runner
#[derive(Parser, Debug)]
#[command(name = "intake")]
#[command(about = "Run a scripted intake application and print the results")]
struct Args {
    /// JSON file holding the operations to replay
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// YAML config file (defaults to $OB_INTAKE_CONFIG, then built-in defaults)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Persist records as JSON files under this directory instead of in memory
    #[arg(long)]
    store_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Op {
    Submit(StepSubmission),
    Contact(ContactInput),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ob_intake=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => IntakeConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => IntakeConfig::from_env().context("Failed to load config from environment")?,
    };

    let store: Arc<dyn RecordStore> = match &args.store_dir {
        Some(dir) => Arc::new(JsonFileRecordStore::new(dir)),
        None => Arc::new(InMemoryRecordStore::new()),
    };

    let body = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let ops: Vec<Op> = serde_json::from_str(&body)
        .with_context(|| format!("Failed to parse operations in {}", args.input.display()))?;

    let workflow = IntakeWorkflow::builder(config).store(store).build()?;
    let mut instance = workflow.start();

    let mut results = Vec::with_capacity(ops.len());
    for op in ops {
        let result = match op {
            Op::Submit(submission) => workflow.submit(&mut instance, submission).await?,
            Op::Contact(contact) => workflow.attach_contact(&mut instance, contact).await?,
        };
        results.push(result);
    }

    let output = serde_json::json!({
        "results": results,
        "summary": instance.summary(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
