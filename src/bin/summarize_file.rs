//! Run the summarization pipeline on a local document and print the result as JSON.
//!
//! Shares configuration with the HTTP server (`GOOGLE_API_KEY`, model overrides, ...).
use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use councellorx::{config, genai::GeminiClient, logging, pipeline::PipelineOrchestrator};

#[derive(Parser)]
#[command(
    name = "summarize-file",
    about = "Extract a structured legal summary from a PDF, JPEG, or PNG"
)]
struct Cli {
    /// Document to summarize.
    path: PathBuf,
    /// Emit compact JSON instead of pretty-printed output.
    #[arg(long)]
    compact: bool,
    /// Override the extraction model.
    #[arg(long)]
    extraction_model: Option<String>,
    /// Override the structuring model.
    #[arg(long)]
    structuring_model: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing();

    let mut config = config::init_config().context("failed to load configuration")?;
    if let Some(model) = cli.extraction_model {
        config.extraction_model = model;
    }
    if let Some(model) = cli.structuring_model {
        config.structuring_model = model;
    }

    let client = Arc::new(GeminiClient::from_config(&config)?);
    let pipeline = PipelineOrchestrator::from_config(client, &config);
    let summary = pipeline
        .run(&cli.path)
        .await
        .with_context(|| format!("failed to summarize {}", cli.path.display()))?;

    let output = if cli.compact {
        serde_json::to_string(&summary)?
    } else {
        serde_json::to_string_pretty(&summary)?
    };
    println!("{output}");
    Ok(())
}
