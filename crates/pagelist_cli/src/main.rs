//! pagelist CLI
//!
//! Replays scripted gestures against the headless list and reports what it
//! fetched, when, and what it would render.
//!
//! ```text
//! pagelist init                        # write pagelist.toml
//! pagelist replay pagelist.toml -v     # replay with debug logging
//! pagelist paginate --total 100 --start 95 --length 20
//! ```

mod config;
mod dataset;
mod replay;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use pagelist_core::pagination::paginate;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::ReplayScript;
use crate::replay::Replay;

#[derive(Parser, Debug)]
#[command(name = "pagelist")]
#[command(about = "Replay pull-to-refresh and load-more gestures against a headless list")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a gesture script
    Replay {
        /// Script to replay
        script: PathBuf,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a sample script
    Init {
        #[arg(default_value = "pagelist.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print one page of the generated dataset
    Paginate {
        #[arg(long, default_value = "100")]
        total: usize,
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        start: i64,
        #[arg(long, default_value = "20", allow_negative_numbers = true)]
        length: i64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Replay { script, json } => {
            let loaded = ReplayScript::load(&script)?;
            tracing::info!(
                "Replaying {} ({} steps)",
                script.display(),
                loaded.steps.len()
            );
            let summary = Replay::new(loaded)?.run()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", summary.render_text());
            }
        }
        Commands::Init { path, force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            let text = ReplayScript::sample().to_toml()?;
            std::fs::write(&path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        Commands::Paginate {
            total,
            start,
            length,
        } => {
            let users = dataset::generate(total);
            let page = paginate(&users, start, length);
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
    }

    Ok(())
}
