//! ChainStatus CLI: serve and inspect omnichain indexing status.
//!
//! # Commands
//! ```text
//! chainstatus serve  [--config <path.yaml>] [--listen <addr>] [--runtime-url <url>]
//! chainstatus check  --runtime-url <url> [--max-distance <secs>]
//! chainstatus info
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd_check;
mod cmd_serve;
mod config;

use config::{Overrides, ServerConfig};

#[derive(Parser)]
#[command(
    name = "chainstatus",
    about = "Omnichain indexing status and realtime-distance API",
    long_about = "
ChainStatus CLI: derives per-chain and omnichain indexing status from an
indexing runtime, and serves it over HTTP.

ENVIRONMENT VARIABLES:
  CHAINSTATUS_CONFIG        Path to a YAML config file
  CHAINSTATUS_LISTEN        Listen address (default 0.0.0.0:4334)
  CHAINSTATUS_RUNTIME_URL   Indexing runtime facts URL
  CHAINSTATUS_LOG_LEVEL     Global log level
  RUST_LOG                  Full filter directives (wins over everything)
",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve(Overrides),

    /// Build one snapshot, print its projection and exit non-zero if the
    /// indexer errored or the distance is not met
    Check {
        /// URL of the indexing runtime's facts endpoint
        #[arg(long, env = "CHAINSTATUS_RUNTIME_URL")]
        runtime_url: String,
        /// Maximum acceptable worst-case distance, in seconds
        #[arg(long)]
        max_distance: Option<String>,
        /// Request timeout in milliseconds
        #[arg(long, default_value_t = 5_000)]
        timeout_ms: u64,
    },

    /// Show version and default configuration
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(overrides) => {
            let config = ServerConfig::load(overrides.config.as_deref())?.apply(&overrides);
            cmd_serve::run(config).await
        }

        Commands::Check {
            runtime_url,
            max_distance,
            timeout_ms,
        } => cmd_check::run(&runtime_url, max_distance.as_deref(), timeout_ms).await,

        Commands::Info => cmd_info(),
    }
}

fn cmd_info() -> Result<()> {
    println!("ChainStatus v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Routes:");
    println!("  GET /health");
    println!("  GET /config");
    println!("  GET /indexing-status   [?maxRealtimeDistance=<secs>]   200 | 512 | 513");
    println!("  GET /realtime          ?maxWorstCaseDistance=<secs>    200 | 400 | 503");
    println!();
    println!(
        "Protocol acceleration threshold: {}s",
        chainstatus_core::ACCELERATION_MAX_WORST_CASE_DISTANCE
    );
    println!();
    println!("Default configuration:");
    print!("{}", serde_yaml::to_string(&ServerConfig::default())?);
    Ok(())
}
