// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::metrics::MetricsSink;

/// Shared state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<MetricsSink>,
    /// Number of (address, chain) pairs polled per cycle
    pub targets: usize,
}

impl AppState {
    pub fn new(metrics: Arc<MetricsSink>, targets: usize) -> Self {
        Self { metrics, targets }
    }
}
