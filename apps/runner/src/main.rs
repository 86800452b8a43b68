use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use experiment_core::{ConditionAssigner, ExperimentSession, ExportSink, PersistenceClient};
use storage::{prepare_database_url, SessionStore, Storage};
use tokio::io::BufReader;
use tracing::{error, info};

mod config;
mod terminal;

use config::load_settings;
use terminal::Terminal;

/// Runs the halo-effect study in the terminal.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    database_url: Option<String>,
    /// Base URL of the persistence service.
    #[arg(long)]
    save_endpoint: Option<String>,
    #[arg(long)]
    artifact_dir: Option<PathBuf>,
    /// Milliseconds between playback ticks; 0 plays instantly.
    #[arg(long)]
    tick_ms: Option<u64>,
    /// Fixes the condition draw sequence.
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(v) = args.database_url {
        settings.database_url = v;
    }
    if let Some(v) = args.save_endpoint {
        settings.save_endpoint = Some(v);
    }
    if let Some(v) = args.artifact_dir {
        settings.artifact_dir = Some(v);
    }
    if let Some(v) = args.tick_ms {
        settings.tick_ms = v;
    }

    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(%database_url, %error, "failed to open session store");
        error
    })?;
    let store: Arc<dyn SessionStore> = Arc::new(storage);

    let mut sink = ExportSink::new();
    if let Some(dir) = &settings.artifact_dir {
        sink = sink.with_artifact_dir(dir.clone());
    }
    if let Some(endpoint) = &settings.save_endpoint {
        sink = sink.with_persistence(PersistenceClient::new(endpoint)?);
    }

    let assigner = match args.seed {
        Some(seed) => ConditionAssigner::seeded(seed),
        None => ConditionAssigner::from_entropy(),
    };
    let mut session = ExperimentSession::new(assigner, store, sink);

    let mut terminal = Terminal::new(
        BufReader::new(tokio::io::stdin()),
        std::io::stdout(),
        Duration::from_millis(settings.tick_ms),
    );
    let completed = terminal.run(&mut session).await?;
    info!(completed, "runner finished");
    Ok(())
}
