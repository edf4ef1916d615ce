// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::AppState;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Configured (address, chain) pairs
    pub targets: usize,
    /// Polling cycles finished since startup
    pub cycles_completed: u64,
}

/// Liveness probe handler.
///
/// Always returns 200 while the process is serving. Freshness of individual
/// balances is exposed through `evm_balance_last_update_timestamp`.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        targets: state.targets,
        cycles_completed: state.metrics.cycles_completed(),
    })
}
