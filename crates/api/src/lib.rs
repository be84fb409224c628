// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Roster API Server
//!
//! HTTP shell around the roster database: a health check endpoint plus the
//! process lifecycle that connects the database before serving and releases it
//! in order on shutdown.
//!
//! # Module Structure
//!
//! - [`config`]: Server configuration with hierarchical loading
//! - [`error`]: Error types for startup and shutdown
//! - [`lifecycle`]: Lifecycle controller, phases and the shutdown sequence
//! - [`shutdown`]: Shutdown triggers from signals, panics and failed tasks
//! - [`server`]: Router configuration and the server entry points
//! - [`routes`]: Route configuration and HTTP request handlers
//!
//! # Shutdown
//!
//! `SIGTERM`, `SIGINT`, a panic on any thread, or a failed serve task each send
//! a trigger to the controller. The first trigger closes the listener, then
//! disconnects the database, then flushes output; the rest are ignored. The
//! exit code is 0 only if every step succeeded.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod routes;
pub mod server;
pub mod shutdown;

pub use config::{Environment, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use lifecycle::{
    ExitStatus, LifecycleController, LifecycleEvent, LifecyclePhase, ShutdownConfig, log_exit,
};
pub use routes::handlers::HealthResponse;
pub use server::Server;
pub use shutdown::{ShutdownHandle, ShutdownTrigger};
