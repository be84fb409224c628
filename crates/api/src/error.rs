// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Error handling module
//!
//! Errors raised while starting, running and shutting down the server. They are
//! never rendered as HTTP responses; operators observe them through logs and the
//! process exit code.

use std::net::SocketAddr;

use database::DatabaseError;
use thiserror::Error;

/// Error types for server operations
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration validation errors
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Network binding errors
    #[error("Failed to bind to {address}: {source}")]
    Bind {
        /// Socket address that failed to bind
        address: SocketAddr,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server startup errors
    #[error("Server startup failed: {source}")]
    Startup {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Server shutdown errors
    #[error("Server shutdown failed: {source}")]
    Shutdown {
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Database connect or disconnect failures
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Task join errors for async operations
    #[error("Task join error: {source}")]
    TaskJoin {
        /// Underlying tokio join error
        #[source]
        source: tokio::task::JoinError,
    },

    /// Timeout errors for operations that exceed time limits
    #[error("{operation} timed out after {timeout_seconds} seconds")]
    Timeout {
        /// Operation that did not finish in time
        operation: &'static str,
        /// Timeout duration in seconds
        timeout_seconds: u64,
    },

    /// Signal handling errors
    #[error("Signal handling error: {message}")]
    Signal {
        /// Error message
        message: String,
    },
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

impl From<tokio::task::JoinError> for ServerError {
    fn from(source: tokio::task::JoinError) -> Self {
        Self::TaskJoin { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_errors_keep_their_message() {
        let error = ServerError::from(DatabaseError::MissingConfig {
            name: database::MONGODB_URI,
        });
        assert_eq!(error.to_string(), "Missing env var: MONGODB_URI");
    }

    #[test]
    fn timeout_names_the_operation() {
        let error = ServerError::Timeout {
            operation: "database disconnect",
            timeout_seconds: 5,
        };
        assert_eq!(
            error.to_string(),
            "database disconnect timed out after 5 seconds"
        );
    }
}
