// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Roster API Server
//!
//! Serves `GET /health` on top of a MongoDB connection.

use std::process::ExitCode;

use api::{ExitStatus, Server, ServerConfig, ShutdownConfig, log_exit};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "loaded environment file");
    }

    let status = run().await;
    log_exit(status);
    status.into()
}

async fn run() -> ExitStatus {
    info!("Starting roster API server");

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            return ExitStatus::Failure;
        }
    };

    let server = Server::new(config, ShutdownConfig::default());

    // NOTE: the `#[tokio::main]` task does not run a worker future, we must spawn
    match tokio::spawn(server.run()).await {
        Ok(status) => status,
        Err(e) => {
            error!(error = %e, "server task failed");
            ExitStatus::Failure
        }
    }
}
