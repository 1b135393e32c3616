//! One-shot CLI for exercising the RAG pipeline from a terminal

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use counsel_rag::{RagConfig, RagPipeline, UserProfile};

#[derive(Parser)]
#[command(name = "counsel-ask", about = "Ask the counseling knowledge base a question")]
struct Args {
    /// The question to answer
    question: String,

    /// Path to a TOML configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to a JSON file holding the requester profile
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Number of documents to retrieve
    #[arg(short = 'k', long)]
    top_k: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "counsel_rag=info".into()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => RagConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => RagConfig::default(),
    };

    let profile: Option<UserProfile> = match &args.profile {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading profile from {}", path.display()))?;
            Some(serde_json::from_str(&content).context("parsing profile JSON")?)
        }
        None => None,
    };

    let pipeline = RagPipeline::from_config(config)
        .await
        .context("initializing pipeline")?;

    let answer = pipeline
        .answer_query(&args.question, profile, args.top_k)
        .await;

    println!("{answer}");
    Ok(())
}
