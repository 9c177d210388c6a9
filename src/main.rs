mod cli;

use anyhow::Context;
use clap::Parser;
use kvtree::{StoreConfig, VectorStore};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_DB: &str = "kvtree.db";

/// KD-tree vector store. Runs an interactive session when no command is given.
#[derive(Parser)]
#[command(name = "kvtree", version)]
struct Cli {
    /// Snapshot file to load and flush to
    #[arg(long, env = "KVTREE_DB")]
    db: Option<PathBuf>,

    /// JSON config file (location, flush_policy, preserve_text_on_update)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log store operations to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Command and arguments, e.g. `insert 1 2 3` or `search 1 2 3 --k_top 2`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_json_file(path)?,
        None => StoreConfig::default(),
    };
    if let Some(db) = cli.db {
        config.location = Some(db);
    } else if config.location.is_none() {
        config.location = Some(PathBuf::from(DEFAULT_DB));
    }

    let location = config.location.clone().unwrap_or_default();
    let mut store = VectorStore::open(config)
        .with_context(|| format!("Error loading '{}'", location.display()))?;

    if cli.command.is_empty() {
        cli::run_repl(&mut store)?;
    } else {
        cli::run_single_command(&mut store, &cli.command)?;
    }

    if store.is_dirty() {
        store
            .flush()
            .with_context(|| format!("Error saving '{}'", location.display()))?;
    }

    Ok(())
}
