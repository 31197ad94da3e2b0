//! terraform-provider-geoserver
//!
//! Plugin binary launched by the orchestrator. It announces itself with a
//! handshake line on stdout, then answers JSON requests on stdin until the
//! orchestrator closes the stream. Logs go to stderr.

mod protocol;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tokio::io::{AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use geotf_core::provider::Provider;
use geotf_provider_geoserver::GeoserverProvider;

/// Environment variable holding the log filter (e.g. `debug`, `geotf_provider_geoserver=trace`)
const LOG_ENV: &str = "GEOTF_LOG";

#[derive(Parser)]
#[command(name = "terraform-provider-geoserver", version)]
#[command(about = "GeoServer and GeoWebCache provider plugin", long_about = None)]
struct Cli {}

#[tokio::main]
async fn main() {
    let _cli = Cli::parse();
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

async fn run() -> anyhow::Result<()> {
    let provider = GeoserverProvider::new();
    info!(
        "Starting {} provider with {} resource types",
        provider.name(),
        provider.resource_types().len()
    );

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("{}\n", protocol::HANDSHAKE).as_bytes())
        .await
        .context("Failed to write handshake")?;
    stdout.flush().await.context("Failed to write handshake")?;

    let stdin = BufReader::new(tokio::io::stdin());
    protocol::serve(&provider, stdin, stdout)
        .await
        .context("Plugin protocol stream failed")?;

    info!("Orchestrator closed the connection, exiting");
    Ok(())
}
