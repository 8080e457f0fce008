//! stagehand - drive a desktop DAW over MCP
//!
//! Subcommands:
//! - `stagehand serve` - Run the MCP server on stdio
//! - `stagehand tracks` - Print the track list with its provenance
//! - `stagehand plugins` - Print installed plugins
//! - `stagehand config` - Print the effective configuration

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stageconf::StageConfig;
use stagehand::catalog::Catalog;
use stagehand::{stdio, telemetry};

#[derive(Parser)]
#[command(name = "stagehand")]
#[command(about = "MCP server that drives a DAW through accessibility, key commands, and MIDI")]
#[command(version)]
struct Cli {
    /// Config file to use instead of ./stagehand.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server over stdin/stdout
    Serve,

    /// List the host's tracks once and exit
    Tracks,

    /// List installed Audio Unit plugins
    Plugins,

    /// Print the effective configuration as TOML
    Config {
        /// Also list the files and environment variables it came from
        #[arg(long)]
        sources: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = StageConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    telemetry::init(&config.telemetry)?;

    match cli.command {
        Commands::Serve => {
            stdio::run(config, cli.config).await?;
        }
        Commands::Tracks => {
            let answer = stagehand::coordinator(&config, cli.config)
                .list_tracks()
                .await?;
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
        Commands::Plugins => {
            let catalog = Catalog::new(
                &config.catalog,
                Duration::from_millis(config.backend.timeout_ms),
            );
            for record in catalog.list().await? {
                println!(
                    "{}  {}  {}  {}",
                    record.kind, record.subtype, record.manufacturer, record.name
                );
            }
        }
        Commands::Config { sources: show_sources } => {
            if show_sources {
                for file in &sources.files {
                    println!("# file: {}", file.display());
                }
                for var in &sources.env_overrides {
                    println!("# env: {}", var);
                }
            }
            print!("{}", config.to_toml());
        }
    }

    telemetry::shutdown();
    Ok(())
}
