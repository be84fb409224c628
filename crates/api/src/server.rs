// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server implementation module
//!
//! This module provides the main server struct: router configuration and the
//! wiring between OS signals, the panic hook and the [`LifecycleController`].

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{Router, http::HeaderName};
use database::{ConnectionManager, DatabaseDriver, MongoDriver};
use hyper::Request;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, info_span};

use crate::{
    config::ServerConfig,
    error::ServerResult,
    lifecycle::{ExitStatus, LifecycleController, ShutdownConfig},
    routes::create_routes,
    shutdown::{ShutdownHandle, install_panic_hook, install_signal_handlers},
};

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Main server struct
#[derive(Debug)]
pub struct Server<D = MongoDriver> {
    /// Server configuration
    config: ServerConfig,
    /// Application router
    router: Router,
    /// Owner of the database connection and the lifecycle phase
    controller: LifecycleController<D>,
}

impl Server<MongoDriver> {
    /// Create a server backed by MongoDB
    pub fn new(config: ServerConfig, shutdown_config: ShutdownConfig) -> Self {
        Self::with_driver(config, shutdown_config, MongoDriver::new())
    }
}

impl<D: DatabaseDriver> Server<D> {
    /// Create a server with a custom database driver
    pub fn with_driver(config: ServerConfig, shutdown_config: ShutdownConfig, driver: D) -> Self {
        let database = Arc::new(ConnectionManager::new(driver, config.database_config()));
        let controller = LifecycleController::new(database, shutdown_config);
        let router = Self::create_router(config.timeout_seconds.value());

        Self {
            config,
            router,
            controller,
        }
    }

    /// Create application router with middleware
    fn create_router(timeout_duration: Duration) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http().make_span_with(|req: &Request<_>| {
                    if let Some(request_id) = req.headers().get(REQUEST_ID_HEADER) {
                        info_span!("http_request", ?request_id)
                    } else {
                        error!("failed to extract id from request");
                        info_span!("http_request", request_id = "unknown")
                    }
                }),
            )
            .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
            .layer(CorsLayer::permissive())
            .layer(TimeoutLayer::new(timeout_duration));

        create_routes().layer(middleware)
    }

    /// Connect the database and start serving
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Database` if the connection cannot be opened and
    /// `ServerError::Bind` if unable to bind to the configured address. In both
    /// cases nothing is left listening.
    pub async fn start(&mut self) -> ServerResult<SocketAddr> {
        let addr = self.config.socket_addr();
        let address = self.controller.start(self.router.clone(), addr).await?;
        info!(
            address = %address,
            environment = %self.config.environment,
            "roster API server started",
        );
        Ok(address)
    }

    /// Wait for the first shutdown trigger and shut down
    pub async fn wait(&mut self) -> ExitStatus {
        self.controller.run().await
    }

    /// Run the server until a signal, panic or task failure shuts it down
    pub async fn run(mut self) -> ExitStatus {
        let handle = self.shutdown_handle();
        install_panic_hook(handle.clone());
        let signals = match install_signal_handlers(handle) {
            Ok(signals) => signals,
            Err(e) => {
                error!(error = %e, "failed to install signal handlers");
                return ExitStatus::Failure;
            }
        };

        if self.start().await.is_err() {
            signals.abort();
            return ExitStatus::Failure;
        }

        let status = self.wait().await;
        signals.abort();
        status
    }

    /// Handle for sending shutdown triggers
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.controller.shutdown_handle()
    }

    /// Initiates graceful shutdown
    pub fn shutdown(&self) {
        info!("programmatic shutdown requested");
        self.controller.shutdown_handle().request();
    }

    /// Lifecycle controller, for inspecting phase and journal
    pub fn controller(&self) -> &LifecycleController<D> {
        &self.controller
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Environment, lifecycle::LifecyclePhase};

    #[test]
    fn server_creation() {
        let config = ServerConfig::for_testing();
        let server = Server::new(config, ShutdownConfig::default());
        assert_eq!(server.config().environment, Environment::Testing);
        assert_eq!(server.controller().phase(), LifecyclePhase::Starting);
    }

    #[tokio::test]
    async fn start_without_uri_fails() {
        let mut server = Server::new(ServerConfig::for_testing(), ShutdownConfig::default());

        assert!(server.start().await.is_err());
        assert_eq!(server.controller().phase(), LifecyclePhase::Exited);
        assert_eq!(server.wait().await, ExitStatus::Failure);
    }
}
