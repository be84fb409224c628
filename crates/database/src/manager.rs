// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Connection manager
//!
//! Wraps a [`DatabaseDriver`] with idempotent, single-attempt `connect` and
//! `disconnect` operations. A cached `connected` flag short-circuits redundant
//! calls; the driver's readiness state remains authoritative.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::driver::{ConnectOptions, DatabaseDriver, ReadyState};

/// Name of the configuration value holding the connection string
pub const MONGODB_URI: &str = "MONGODB_URI";

/// Connection settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Connection string; an empty value counts as missing
    pub uri: Option<String>,
    /// Options applied on connect
    pub connect_options: ConnectOptions,
}

impl DatabaseConfig {
    /// Create a configuration for the given connection string
    pub fn with_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            connect_options: ConnectOptions::default(),
        }
    }
}

/// Errors raised by the connection manager
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatabaseError {
    /// A required configuration value is absent
    #[error("Missing env var: {name}")]
    MissingConfig {
        /// Name of the missing value
        name: &'static str,
    },

    /// The connection attempt failed
    #[error("{message}")]
    Connect {
        /// Message of the underlying driver error
        message: String,
    },

    /// Closing the connection failed
    #[error("{message}")]
    Disconnect {
        /// Message of the underlying driver error
        message: String,
    },
}

/// Idempotent connect/disconnect over a single database driver
#[derive(Debug)]
pub struct ConnectionManager<D> {
    driver: D,
    config: DatabaseConfig,
    is_connected: AtomicBool,
    // serializes connect/disconnect so concurrent callers observe each other
    operation: Mutex<()>,
}

impl<D: DatabaseDriver> ConnectionManager<D> {
    /// Create a manager; nothing is connected yet
    pub fn new(driver: D, config: DatabaseConfig) -> Self {
        Self {
            driver,
            config,
            is_connected: AtomicBool::new(false),
            operation: Mutex::new(()),
        }
    }

    /// The wrapped driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Cached connection flag
    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::SeqCst)
    }

    /// Connect unless already connected
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::MissingConfig`] when no connection string is
    /// configured and [`DatabaseError::Connect`] when the driver fails. The
    /// attempt is never retried.
    pub async fn connect(&self) -> Result<(), DatabaseError> {
        let _guard = self.operation.lock().await;

        if self.is_connected() || self.driver.ready_state() == ReadyState::Connected {
            info!("database is already connected");
            self.is_connected.store(true, Ordering::SeqCst);
            return Ok(());
        }

        let Some(uri) = self.config.uri.as_deref().filter(|uri| !uri.is_empty()) else {
            let missing = DatabaseError::MissingConfig { name: MONGODB_URI };
            error!(error = %missing, "failed to connect to the database");
            return Err(missing);
        };

        if let Err(e) = self.driver.connect(uri, self.config.connect_options).await {
            error!(error = %e, "failed to connect to the database");
            return Err(DatabaseError::Connect {
                message: e.message().to_string(),
            });
        }

        let connected = self.driver.ready_state() == ReadyState::Connected;
        self.is_connected.store(connected, Ordering::SeqCst);
        info!(
            strict_query = self.config.connect_options.strict_query,
            "database connected successfully"
        );
        Ok(())
    }

    /// Disconnect unless the driver already reports disconnected
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Disconnect`] when the driver fails to close.
    pub async fn disconnect(&self) -> Result<(), DatabaseError> {
        let _guard = self.operation.lock().await;

        if self.driver.ready_state() == ReadyState::Disconnected {
            info!("database already disconnected");
            self.is_connected.store(false, Ordering::SeqCst);
            return Ok(());
        }

        if let Err(e) = self.driver.disconnect().await {
            error!(error = %e, "error disconnecting from the database");
            return Err(DatabaseError::Disconnect {
                message: e.message().to_string(),
            });
        }

        self.is_connected.store(false, Ordering::SeqCst);
        info!("database disconnected");
        Ok(())
    }
}
