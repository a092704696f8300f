//! Afrikunle command-line client.

mod cli;

use std::process::ExitCode;

use afrikunle_app::{AfrikunleClient, AppConfig, AppError, telemetry};
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    match start(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn start(cli: cli::Cli) -> Result<(), AppError> {
    let config = AppConfig::from_sources(cli.config.as_deref(), |key| std::env::var(key).ok())?;
    let telemetry = telemetry::init()?;
    tracing::debug!(api_url = %config.api_url, backend = ?config.speech_backend, "configuration loaded");

    let client = AfrikunleClient::start(config).await?;
    let result = cli::run(&client, cli.command).await;
    client.shutdown().await;
    telemetry.shutdown();
    result
}
