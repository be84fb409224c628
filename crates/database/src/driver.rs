// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Database driver abstraction
//!
//! The driver's own readiness state is the source of truth for whether the
//! process is connected. Everything above it only caches that answer.

use std::fmt;

use thiserror::Error;

/// Readiness state reported by a database driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ReadyState {
    /// No connection is open
    Disconnected = 0,
    /// A connection is open and verified
    Connected = 1,
    /// A connection attempt is in flight
    Connecting = 2,
    /// The connection is being closed
    Disconnecting = 3,
}

impl ReadyState {
    /// Decode a state stored as its discriminant
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connected,
            2 => Self::Connecting,
            3 => Self::Disconnecting,
            _ => Self::Disconnected,
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connected => write!(f, "connected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Disconnecting => write!(f, "disconnecting"),
        }
    }
}

/// Settings applied when a connection is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    /// Drop query filter keys that are not schema paths
    pub strict_query: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self { strict_query: true }
    }
}

/// Error reported by a database driver, reduced to its message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DriverError {
    message: String,
}

impl DriverError {
    /// Create a driver error from a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The underlying error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<mongodb::error::Error> for DriverError {
    fn from(error: mongodb::error::Error) -> Self {
        Self::new(error.to_string())
    }
}

/// A connection driver for a document database
pub trait DatabaseDriver: Send + Sync {
    /// Current readiness state, read without suspending
    fn ready_state(&self) -> ReadyState;

    /// Open a connection to the database at `uri`
    ///
    /// # Errors
    ///
    /// Returns an error if the URI is invalid or the server cannot be reached.
    fn connect(
        &self,
        uri: &str,
        options: ConnectOptions,
    ) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Close the open connection
    ///
    /// # Errors
    ///
    /// Returns an error if the connection could not be closed cleanly.
    fn disconnect(&self) -> impl Future<Output = Result<(), DriverError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_state_round_trips_through_discriminant() {
        for state in [
            ReadyState::Disconnected,
            ReadyState::Connected,
            ReadyState::Connecting,
            ReadyState::Disconnecting,
        ] {
            assert_eq!(ReadyState::from_u8(state as u8), state);
        }
        assert_eq!(ReadyState::from_u8(99), ReadyState::Disconnected);
    }

    #[test]
    fn strict_query_is_on_by_default() {
        assert!(ConnectOptions::default().strict_query);
    }

    #[test]
    fn driver_error_preserves_message() {
        let error = DriverError::new("connection refused");
        assert_eq!(error.message(), "connection refused");
        assert_eq!(error.to_string(), "connection refused");
    }
}
