//! CLI entry point for the use case generator

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use use_case_generator::config::RawUseCaseConfig;
use use_case_generator::pipeline::{run_pipeline, PipelineOptions, Providers};
use use_case_generator::provider::HttpProvider;

/// Generate an instructional use case document with a multi-stage LLM pipeline
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to a JSON submission with the use case fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use case title
    #[arg(long)]
    title: Option<String>,

    /// Use case family (e.g. "Core Skills", "Coding")
    #[arg(long)]
    family: Option<String>,

    /// AI tool the use case teaches
    #[arg(long)]
    ai_tool: Option<String>,

    /// Use case objective
    #[arg(long)]
    objective: Option<String>,

    /// Use case description
    #[arg(long)]
    description: Option<String>,

    /// Comma-separated list of prerequisites
    #[arg(long)]
    prerequisites: Option<String>,

    /// Time estimate (e.g. "20 minutes")
    #[arg(long)]
    time_estimate: Option<String>,

    /// Comma-separated list of steps
    #[arg(long)]
    steps: Option<String>,

    /// Comma-separated list of departments
    #[arg(long)]
    department: Option<String>,

    /// Comma-separated list of roles
    #[arg(long)]
    role: Option<String>,

    /// Interaction mode (e.g. "inline chat")
    #[arg(long)]
    mode: Option<String>,

    /// Model the use case targets (e.g. "GPT-4o")
    #[arg(long)]
    model: Option<String>,

    /// Coding language for the examples
    #[arg(long)]
    coding_language: Option<String>,

    /// Base directory for job artifacts
    #[arg(long, default_value = "partial_results")]
    work_dir: PathBuf,

    /// Concurrent research requests (1-10)
    #[arg(long, default_value = "4")]
    concurrency: usize,

    /// Overall job timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Existing job directory to resume
    #[arg(long)]
    resume: Option<PathBuf>,
}

impl Args {
    /// Merge the JSON submission (if any) with flag overrides
    fn into_raw_config(self) -> anyhow::Result<(RawUseCaseConfig, PipelineOptions)> {
        let mut raw: RawUseCaseConfig = match &self.config {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("invalid JSON in {}", path.display()))?
            }
            None => RawUseCaseConfig::default(),
        };

        // Individual flags win over the file
        merge_text(&mut raw.title, self.title);
        merge_text(&mut raw.family, self.family);
        merge_text(&mut raw.ai_tool, self.ai_tool);
        merge_text(&mut raw.objective, self.objective);
        merge_text(&mut raw.description, self.description);
        merge_text(&mut raw.time_estimate, self.time_estimate);
        merge_text(&mut raw.mode, self.mode);
        merge_text(&mut raw.model, self.model);
        merge_text(&mut raw.coding_language, self.coding_language);
        merge_list(&mut raw.prerequisites, self.prerequisites);
        merge_list(&mut raw.steps, self.steps);
        merge_list(&mut raw.department, self.department);
        merge_list(&mut raw.role, self.role);

        let options = PipelineOptions {
            work_dir: self.work_dir,
            concurrency: self.concurrency.clamp(1, 10),
            timeout: self.timeout_secs.map(Duration::from_secs),
            resume: self.resume,
            ..Default::default()
        };
        Ok((raw, options))
    }
}

fn merge_text(slot: &mut Option<String>, flag: Option<String>) {
    if flag.is_some() {
        *slot = flag;
    }
}

fn merge_list(
    slot: &mut Option<use_case_generator::config::StringOrList>,
    flag: Option<String>,
) {
    if let Some(text) = flag {
        *slot = Some(use_case_generator::config::StringOrList::Text(text));
    }
}

/// API credentials for both providers, or a descriptive error naming every
/// missing variable
fn load_credentials() -> anyhow::Result<(String, String)> {
    let mut missing = Vec::new();
    let openai = std::env::var("OPENAI_API_KEY").ok();
    let perplexity = std::env::var("PERPLEXITY_API_KEY").ok();
    if openai.is_none() {
        missing.push("OPENAI_API_KEY");
    }
    if perplexity.is_none() {
        missing.push("PERPLEXITY_API_KEY");
    }
    if !missing.is_empty() {
        bail!(
            "missing required environment variables: {}",
            missing.join(", ")
        );
    }
    Ok((openai.unwrap(), perplexity.unwrap()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let (openai_key, perplexity_key) = load_credentials()?;
    let (raw, options) = args.into_raw_config()?;

    // An invalid submission fails before any job directory is created
    let config = raw.validate()?;

    let providers = Providers {
        reasoning: Arc::new(HttpProvider::openai(openai_key)),
        research: Arc::new(HttpProvider::perplexity(perplexity_key)),
    };

    let outcome = run_pipeline(config, providers, options).await?;

    println!("Use case generation complete ({})", outcome.state);
    println!("Job directory: {}", outcome.job_dir.display());
    println!("JSON output:   {}", outcome.outputs.json_path.display());
    println!("Markdown:      {}", outcome.outputs.markdown_path.display());
    for record in &outcome.stage_report {
        match &record.detail {
            Some(detail) => {
                println!("  {:<10} {} ({})", record.stage.to_string(), record.status, detail)
            }
            None => println!("  {:<10} {}", record.stage.to_string(), record.status),
        }
    }
    Ok(())
}
