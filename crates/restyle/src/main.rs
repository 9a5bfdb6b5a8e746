//! restyle: preview new hairstyles from a single photo.
//!
//! Analyzes the photo, suggests several hairstyles, renders a front-view
//! preview of each, then renders the chosen style from the back and both
//! sides. Previews and views are written to the output directory.
//!
//! # Usage
//!
//! ```text
//! GEMINI_API_KEY=... cargo run --release --bin restyle -- [OPTIONS] <PHOTO>
//! ```
//!
//! Logs go to stderr (`RUST_LOG` overrides the default `restyle=info`);
//! stdout carries only the final summary or `--json` state.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod output;

use std::io::{self, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use restyle_gemini::{GeminiClient, GeminiConfig};
use restyle_pipeline::{
    CodecError, Orchestrator, OrchestratorConfig, SourcePhoto, StyleCandidate, TransitionError,
    WorkflowStage, WorkflowState,
};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Preview new hairstyles from a single photo.
#[derive(Parser)]
#[command(name = "restyle", version)]
struct Cli {
    /// Path to the photo (PNG, JPEG, BMP, WebP, GIF).
    photo: PathBuf,

    /// Directory for previews and rendered views.
    #[arg(long, short, default_value = "restyle-out")]
    out_dir: PathBuf,

    /// Style to render, by name or 1-based position. Prompts on stdin
    /// when omitted.
    #[arg(long)]
    select: Option<String>,

    /// Gemini API key. Defaults to GEMINI_API_KEY, GOOGLE_API_KEY, or
    /// API_KEY from the environment.
    #[arg(long)]
    api_key: Option<String>,

    /// Gemini REST endpoint root.
    #[arg(long)]
    base_url: Option<String>,

    /// Number of hairstyles to suggest.
    #[arg(long, default_value_t = OrchestratorConfig::DEFAULT_CANDIDATE_COUNT, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    count: usize,

    /// Timeout for each model call, in seconds.
    #[arg(long, default_value_t = OrchestratorConfig::DEFAULT_CALL_TIMEOUT_SECS, value_parser = clap::builder::RangedU64ValueParser::<u64>::new().range(1..))]
    timeout_secs: u64,

    /// Full orchestrator config as a JSON string.
    ///
    /// When provided, `--count` and `--timeout-secs` are ignored.
    #[arg(long)]
    config_json: Option<String>,

    /// Print the final workflow state as JSON instead of a summary.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("error parsing --config-json: {0}")]
    ConfigJson(#[source] serde_json::Error),

    #[error("error serializing state: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error(transparent)]
    Orchestrator(#[from] restyle_pipeline::ConfigError),

    #[error(transparent)]
    Gemini(#[from] restyle_gemini::ConfigError),

    #[error("error reading {path}: {source}", path = path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("error writing {path}: {source}", path = path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("unusable photo: {0}")]
    Codec(#[from] CodecError),

    #[error("invalid image data for {path}: {source}", path = path.display())]
    Payload { path: PathBuf, source: CodecError },

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("stage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Generation(String),

    #[error("no style matches {0:?}")]
    NoSuchStyle(String),

    #[error("error reading selection: {0}")]
    Prompt(#[source] io::Error),
}

/// Build an [`OrchestratorConfig`] from CLI arguments.
///
/// `--config-json` wins over the individual flags.
fn config_from_cli(cli: &Cli) -> Result<OrchestratorConfig, CliError> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(CliError::ConfigJson);
    }
    Ok(OrchestratorConfig {
        candidate_count: cli.count,
        call_timeout_secs: cli.timeout_secs,
    })
}

fn gemini_config(cli: &Cli) -> Result<GeminiConfig, CliError> {
    let config = match cli.api_key {
        Some(ref key) => GeminiConfig::new(key.clone()),
        None => GeminiConfig::from_env()?,
    };
    Ok(match cli.base_url {
        Some(ref url) => config.with_base_url(url.clone()),
        None => config,
    })
}

/// Resolve a selection, given by 1-based position or case-insensitive name.
fn resolve_choice(choice: &str, candidates: &[StyleCandidate]) -> Result<String, CliError> {
    let choice = choice.trim();
    let found = match choice.parse::<usize>() {
        Ok(n) => n.checked_sub(1).and_then(|i| candidates.get(i)),
        Err(_) => candidates
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(choice)),
    };
    found
        .map(|c| c.name.clone())
        .ok_or_else(|| CliError::NoSuchStyle(choice.to_owned()))
}

fn prompt_choice(candidates: &[StyleCandidate]) -> Result<String, CliError> {
    eprint!("Select a style [1-{}]: ", candidates.len());
    io::stderr().flush().map_err(CliError::Prompt)?;
    let mut line = String::new();
    io::stdin().read_line(&mut line).map_err(CliError::Prompt)?;
    resolve_choice(&line, candidates)
}

/// Echo each new progress label to stderr until the orchestrator is dropped.
fn spawn_progress(mut rx: watch::Receiver<WorkflowState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut last = String::new();
        while rx.changed().await.is_ok() {
            let label = rx.borrow_and_update().progress_label().to_owned();
            if !label.is_empty() && label != last {
                eprintln!("{label}");
            }
            last = label;
        }
    })
}

/// Fail unless the finished stage reached `expected`.
fn settled(state: WorkflowState, expected: WorkflowStage) -> Result<WorkflowState, CliError> {
    if let Some(error) = state.error() {
        return Err(CliError::Generation(error.message.clone()));
    }
    if state.stage() == expected {
        Ok(state)
    } else {
        Err(CliError::Generation(format!(
            "workflow stopped while {}",
            state.stage()
        )))
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = config_from_cli(&cli)?;
    let client = GeminiClient::new(gemini_config(&cli)?)?;
    tracing::debug!(
        analysis_model = %client.config().analysis_model,
        suggestion_model = %client.config().suggestion_model,
        image_model = %client.config().image_model,
        "gemini client ready"
    );

    let bytes = std::fs::read(&cli.photo).map_err(|source| CliError::Read {
        path: cli.photo.clone(),
        source,
    })?;
    let photo = SourcePhoto::capture(bytes)?;
    tracing::info!(
        path = %cli.photo.display(),
        mime_type = photo.encoded().mime_type(),
        bytes = photo.bytes().len(),
        "photo loaded"
    );

    let orchestrator = Orchestrator::new(client, config)?;
    tracing::info!(
        candidates = orchestrator.config().candidate_count,
        timeout_secs = orchestrator.config().call_timeout_secs,
        "starting workflow"
    );
    let progress = spawn_progress(orchestrator.subscribe());

    orchestrator.start_workflow(photo)?.await?;
    let state = settled(orchestrator.snapshot(), WorkflowStage::AwaitingSelection)?;

    let previews = output::write_previews(&cli.out_dir, state.candidates())?;
    for (i, (candidate, path)) in state.candidates().iter().zip(&previews).enumerate() {
        eprintln!("{}. {} ({})", i + 1, candidate.name, path.display());
        eprintln!("   {}", candidate.description);
    }

    let choice = match cli.select {
        Some(ref choice) => resolve_choice(choice, state.candidates())?,
        None => prompt_choice(state.candidates())?,
    };

    orchestrator.select_candidate(&choice)?.await?;
    let state = settled(orchestrator.snapshot(), WorkflowStage::Complete)?;
    progress.abort();

    let mut written = output::write_views(
        &cli.out_dir,
        state.views(),
        state.canonical_description(),
    )?;
    written.push(output::write_gallery(&cli.out_dir, &choice, state.views())?);

    if cli.json {
        let json = serde_json::to_string_pretty(&state).map_err(CliError::Serialize)?;
        println!("{json}");
    } else {
        println!("{choice}");
        for path in written {
            println!("  {}", path.display());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("restyle=info")),
        )
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
