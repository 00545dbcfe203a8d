//! ntags-sim - run NFC tag sessions against a simulated radio
//!
//! Subcommands:
//! - `ntags-sim read [--tap ID]...` - scan tags and print what they hold
//! - `ntags-sim write TEXT [--tap ID]` - append a text record to a tag
//! - `ntags-sim config` - print the effective configuration
//!
//! Tags come from `[[sim.tags]]` in the config. Without `--tap`, every
//! configured tag is tapped in order (the first one for `write`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ntags_conf::NtagsConfig;

mod commands;

#[derive(Parser)]
#[command(name = "ntags-sim")]
#[command(about = "Drive NFC tag sessions against a simulated radio")]
#[command(version)]
struct Cli {
    /// Config file to use instead of ./ntags.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print the session view as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a scan session and tap tags against it
    Read {
        /// Tag id to tap (repeatable)
        #[arg(short, long = "tap")]
        taps: Vec<String>,
    },

    /// Append a text record to a tag
    Write {
        /// Text to write
        text: String,

        /// Tag id to tap
        #[arg(short, long)]
        tap: Option<String>,
    },

    /// Print the effective configuration and where it came from
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = NtagsConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.telemetry.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(files = ?sources.files, env = ?sources.env_overrides, "Configuration loaded");

    match cli.command {
        Commands::Read { taps } => {
            commands::read(&config, &taps, cli.json).await?;
        }
        Commands::Write { text, tap } => {
            commands::write(&config, &text, tap.as_deref(), cli.json).await?;
        }
        Commands::Config => {
            for path in &sources.files {
                println!("# loaded: {}", path.display());
            }
            for var in &sources.env_overrides {
                println!("# env: {}", var);
            }
            print!("{}", config.to_toml());
        }
    }

    Ok(())
}
