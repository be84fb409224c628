// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Routes module
//!
//! Only the health check is mounted. Person persistence lives in the `database`
//! crate and is not exposed over HTTP.

pub mod handlers;

use axum::{Router, routing::get};
use handlers::health_handler;

/// Create application routes
pub fn create_routes() -> Router {
    Router::new().route("/health", get(health_handler))
}
