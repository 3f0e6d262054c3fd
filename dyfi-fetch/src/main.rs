//! dyfi-fetch - DYFI data retrieval for the South Carolina swarm
//!
//! Queries the USGS event search for the swarm's box and window, resolves
//! each event's DYFI product and saves the response summaries and JSON
//! resources under the data directory.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for dyfi-fetch
#[derive(Parser, Debug)]
#[command(name = "dyfi-fetch")]
#[command(about = "Retrieve USGS DYFI data for South Carolina earthquakes")]
#[command(version)]
struct Args {
    /// Also save the raw event search response (SC_Earthquake.geojson)
    #[arg(short = 'f')]
    save_raw: bool,

    /// Show progress logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "dyfi_fetch=info,dyfi_common=info"
    } else {
        "dyfi_fetch=warn,dyfi_common=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .init();

    info!("Starting dyfi-fetch {}", dyfi_fetch::build_id());

    let mut config =
        dyfi_common::config::resolve_pipeline_config().context("Failed to resolve configuration")?;
    if args.save_raw {
        config.save_raw_discovery = true;
    }

    let report = dyfi_fetch::run_pipeline(&config)
        .await
        .context("DYFI retrieval failed")?;

    info!(
        files = report.files_written(),
        events = report.resolved,
        "dyfi-fetch done"
    );
    Ok(())
}
