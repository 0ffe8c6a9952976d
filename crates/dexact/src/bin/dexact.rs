//! `dexact` binary: run a demo action taker.
//!
//! Environment:
//!
//! - `DEXACT_CONFIG` - config file when `--config` is absent
//! - `DEXACT_HOST`, `DEXACT_PORT`, `DEXACT_PATH` - endpoint overrides
//! - `RUST_LOG` - tracing filter (default `info`)

use std::path::PathBuf;

use anyhow::Context;
use clap::builder::PossibleValuesParser;
use clap::Parser;
use dexact::demos::{self, DEMOS};
use dexact::{launch_with, LaunchConfig};

/// Serve or dial a simulation with one of the demo action takers.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// TOML config file.
    #[arg(short, long, env = "DEXACT_CONFIG")]
    config: Option<PathBuf>,

    /// Demo action taker to run.
    #[arg(
        short,
        long,
        default_value = "example",
        value_parser = PossibleValuesParser::new(DEMOS.iter().copied())
    )]
    demo: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = LaunchConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let factory = demos::factory(&cli.demo)
        .ok_or_else(|| dexact::LaunchError::UnknownDemo(cli.demo.clone()))?;

    tracing::info!(
        demo = %cli.demo,
        role = ?config.role,
        "starting dexact {}",
        env!("CARGO_PKG_VERSION")
    );
    launch_with(&config, factory).await?;
    Ok(())
}
