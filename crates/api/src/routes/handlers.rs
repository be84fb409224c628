// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP request handlers

use axum::Json;
use serde::{Deserialize, Serialize};

/// Body of the health check response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always true while the process is serving
    pub ok: bool,
}

/// Health check endpoint handler
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}
