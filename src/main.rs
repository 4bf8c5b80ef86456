//! http-loadgen - drive an HTTP API at a fixed request rate

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use http_loadgen_client::HttpApiClient;
use http_loadgen_core::{ApiClientConfig, OrchestratorBuilder, PayloadFactory, Shutdown};

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = cli::Cli::parse();

    let settings = ApiClientConfig::settings_path();
    let config = ApiClientConfig::from_file(&settings)
        .with_context(|| format!("failed to load settings from {}", settings.display()))?;
    let client = HttpApiClient::new(&config).context("invalid API client configuration")?;

    tracing::info!(endpoint = %client.endpoint(), target_rate = cli.target_rate, "http-loadgen starting");

    let (trigger, signal) = Shutdown::new();
    let orchestrator = OrchestratorBuilder::new()
        .target_rate(cli.target_rate)
        .client(Arc::new(client))
        .payloads(Arc::new(PayloadFactory::new(config.request_name())))
        .shutdown(signal)
        .build()
        .context("failed to start load generator")?;

    let signal_handle = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                if trigger.trigger() {
                    println!("\nProgram interruption signal captured: stopping...");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            }
        }
    });

    let report = orchestrator.run().await?;
    signal_handle.abort();

    println!("{report}");

    Ok(())
}
