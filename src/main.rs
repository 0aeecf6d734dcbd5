use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use fable_capability::CapabilityRegistry;
use fable_config::FableConfig;
use fable_orchestrator::Orchestrator;
use fable_planner::Planner;
use fable_store::SqliteStore;

/// Fable - personalized children's stories from a child's own words
#[derive(Parser)]
#[command(name = "fable")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.fable)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Path to the config file (default: <data-dir>/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Create a story for a request
  Run {
    /// Path to the request file (JSON); read from stdin when omitted
    #[arg(long)]
    request: Option<PathBuf>,
  },

  /// Print the task batch a request would run, without running it
  Plan {
    /// Path to the request file (JSON); read from stdin when omitted
    #[arg(long)]
    request: Option<PathBuf>,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".fable"),
  };

  match cli.command {
    Some(Commands::Run { request }) => {
      let config = load_config(cli.config.as_deref(), &data_dir)?;
      let request = read_request(request.as_deref())?;
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async { run_story(config, data_dir, request).await })?;
    }
    Some(Commands::Plan { request }) => {
      let request = read_request(request.as_deref())?;
      let tasks = Planner::new()
        .plan_value(request)
        .context("failed to plan request")?;
      println!("{}", serde_json::to_string_pretty(&tasks)?);
    }
    None => {
      println!("fable - use --help to see available commands");
    }
  }

  Ok(())
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .init();
}

fn load_config(path: Option<&Path>, data_dir: &Path) -> Result<FableConfig> {
  let config = match path {
    Some(path) => FableConfig::load(path)
      .with_context(|| format!("failed to load config: {}", path.display()))?,
    None => FableConfig::load_or_default(&data_dir.join("config.json"))
      .context("failed to load config from data directory")?,
  };
  Ok(config.with_env_overrides())
}

async fn run_story(
  config: FableConfig,
  data_dir: PathBuf,
  request: serde_json::Value,
) -> Result<()> {
  tokio::fs::create_dir_all(&data_dir)
    .await
    .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

  let store = SqliteStore::open(&data_dir.join("fable.db"))
    .await
    .context("failed to open story store")?;
  let store = Arc::new(store);

  let generator =
    fable_llm::from_config(&config.generation).context("failed to create text generator")?;
  let registry = CapabilityRegistry::with_defaults(generator, store.clone(), config.story);
  let orchestrator = Orchestrator::new(registry, config.executor, store);

  let cancel = CancellationToken::new();
  let on_interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      tracing::warn!("interrupted, cancelling story");
      on_interrupt.cancel();
    }
  });

  let result = orchestrator
    .create_story_value(request, cancel)
    .await
    .context("story request failed")?;

  if let Some(story_id) = &result.story_id {
    eprintln!("Story created: {}", story_id);
  }
  eprintln!("Processing time: {}ms", result.processing_time_ms);

  println!("{}", serde_json::to_string_pretty(&result.response)?);

  Ok(())
}

fn read_request(path: Option<&Path>) -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  let input = match path {
    Some(path) => std::fs::read_to_string(path)
      .with_context(|| format!("failed to read request file: {}", path.display()))?,
    None if io::stdin().is_terminal() => {
      anyhow::bail!("no request given: pass --request FILE or pipe JSON on stdin");
    }
    None => {
      let mut input = String::new();
      io::stdin()
        .read_to_string(&mut input)
        .context("failed to read request from stdin")?;
      input
    }
  };

  serde_json::from_str(&input).context("failed to parse request JSON")
}
