use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use experiment_core::ResearcherConsole;
use shared::domain::ANONYMOUS_PARTICIPANT;
use storage::{prepare_database_url, Storage, DEFAULT_DATABASE_URL};
use tracing::info;

/// Researcher utilities over the local session store.
#[derive(Parser, Debug)]
struct Cli {
    /// Falls back to `APP__DATABASE_URL`, then the default store location.
    #[arg(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every stored session.
    List,
    /// Write all sessions to one JSON array file.
    ExportAll {
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Delete every stored session.
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Per-condition counts, mean ratings, and the warm-cold difference.
    Analyze {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("warn").init();
    let cli = Cli::parse();

    let raw_url = cli
        .database_url
        .or_else(|| std::env::var("APP__DATABASE_URL").ok())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
    let database_url = prepare_database_url(&raw_url)?;
    let storage = Storage::new(&database_url).await?;
    info!(%database_url, "opened session store");

    match cli.command {
        Command::List => {
            let sessions = storage.list_sessions().await?;
            if sessions.is_empty() {
                println!("no sessions stored");
            }
            for session in sessions {
                let record = &session.record;
                let participant = if record.participant_id.is_empty() {
                    ANONYMOUS_PARTICIPANT
                } else {
                    record.participant_id.as_str()
                };
                println!(
                    "#{} {} participant={} condition={} ratings={} stored_at={}",
                    session.id,
                    record.start_time.to_rfc3339(),
                    participant,
                    record.condition,
                    record.ratings.len(),
                    session.created_at.to_rfc3339(),
                );
            }
        }
        Command::ExportAll { out_dir } => {
            let console = ResearcherConsole::new(Arc::new(storage));
            let path = console.export_all(&out_dir).await?;
            println!("exported to {}", path.display());
        }
        Command::Clear { yes } => {
            if !yes {
                bail!("refusing to clear stored sessions without --yes");
            }
            let console = ResearcherConsole::new(Arc::new(storage));
            let removed = console.clear_all().await?;
            println!("removed {removed} sessions");
        }
        Command::Analyze { json } => {
            let console = ResearcherConsole::new(Arc::new(storage));
            match console.analyze().await? {
                Some(report) if json => println!("{}", serde_json::to_string_pretty(&report)?),
                Some(report) => print!("{}", report.render()),
                None => println!("No data collected yet"),
            }
        }
    }

    Ok(())
}
