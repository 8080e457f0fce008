//! axwalker - read and mutate the host's accessibility tree
//!
//! Subcommands:
//! - `axwalker check-access` - Print `granted` or `denied`
//! - `axwalker list-tracks` - Print the track list as JSON
//! - `axwalker get-params <track> <slot>` - Print the open plugin window's controls
//! - `axwalker set-param <track> <slot> <name> <value>` - Assign a control value
//! - `axwalker query [depth]` - Print a snapshot of the tree

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use axtree::Extractor;
use axwalker::{run, Command, LiveHost, Reply, SnapshotHost};
use clap::{Parser, Subcommand};
use stageconf::StageConfig;

#[derive(Parser)]
#[command(name = "axwalker")]
#[command(about = "Accessibility walker for Stagehand")]
#[command(version)]
struct Cli {
    /// Config file to use instead of ./stagehand.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Replay against a tree saved by `query` instead of the live host
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report whether this binary holds the accessibility grant
    CheckAccess,

    /// List tracks as JSON
    ListTracks,

    /// List the controls of the open plugin window as JSON
    GetParams {
        /// Track index the caller navigated to
        track: usize,
        /// Plugin slot the caller opened
        slot: usize,
    },

    /// Set a plugin control by its exact label
    SetParam {
        track: usize,
        slot: usize,
        /// Control label, matched case-insensitively
        name: String,
        value: String,
    },

    /// Print the accessibility tree as JSON
    Query {
        /// Levels below the application root
        depth: Option<usize>,
    },
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::CheckAccess => Command::CheckAccess,
            Commands::ListTracks => Command::ListTracks,
            Commands::GetParams { track, slot } => Command::GetParams { track, slot },
            Commands::SetParam {
                track,
                slot,
                name,
                value,
            } => Command::SetParam {
                track,
                slot,
                name,
                value,
            },
            Commands::Query { depth } => Command::Query { depth },
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = StageConfig::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    // stdout carries the reply; logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.telemetry.log_level)),
        )
        .init();

    let extractor = Extractor::from_config(&config.locale, &config.search);
    let command = Command::from(cli.command);
    let query_depth = config.search.query_depth;

    let reply = match cli.snapshot {
        Some(path) => run(&SnapshotHost::new(path), &command, &extractor, query_depth),
        None => {
            let host = LiveHost::new(&config.host.process_name, config.backend.timeout_ms);
            run(&host, &command, &extractor, query_depth)
        }
    };

    Ok(emit(reply))
}

fn emit(reply: Reply) -> ExitCode {
    if let Some(stdout) = reply.stdout {
        println!("{}", stdout);
    }
    if let Some(stderr) = reply.stderr {
        eprintln!("{}", stderr);
    }
    ExitCode::from(u8::try_from(reply.code).unwrap_or(1))
}
