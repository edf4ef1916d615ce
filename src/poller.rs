// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Balance Poller
//!
//! Background task that periodically refreshes the native balance of every
//! poll target and writes the results into the [`MetricsSink`].
//!
//! ## Strategy
//!
//! The first cycle runs as soon as the poller starts, then one cycle every
//! `interval` (default 60 s). Within a cycle:
//! 1. Every target is spawned as its own task; a semaphore caps the number of
//!    requests in flight (default 8).
//! 2. Each task queries `eth_getBalance`, converts the hex quantity and
//!    records the outcome. A failing target is counted and logged, then the
//!    remaining targets proceed.
//! 3. The cycle ends once every task has resolved. RPC timeouts bound how long
//!    that can take.
//!
//! Cycles never overlap. If a cycle outlasts the interval, the ticks it
//! covered are dropped, counted in `evm_balance_cycles_skipped_total`, and the
//! next cycle starts one full interval after the overrunning one finished.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`. Cancelling during a cycle
//! aborts the outstanding requests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::blockchain::{
    hex_to_decimal, BalanceResult, ConversionError, PollTarget, RpcClient, RpcClientError,
};
use crate::metrics::MetricsSink;

/// Default interval between polling cycles.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(60);

/// Default cap on concurrent RPC requests within a cycle.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 8;

/// Coarse error taxonomy for per-target failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Connection failures, timeouts and non-2xx responses
    Network,
    /// JSON-RPC error object returned by the node
    Rpc,
    /// Malformed body, missing result or malformed hex quantity
    Parse,
}

/// Fine-grained failure kind, used as the `error_type` metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    RequestFailed,
    Timeout,
    HttpStatus,
    JsonDecode,
    RpcError,
    NoResult,
    InvalidResult,
    InvalidHex,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::RequestFailed => "request_failed",
            ErrorKind::Timeout => "timeout",
            ErrorKind::HttpStatus => "http_status",
            ErrorKind::JsonDecode => "json_decode",
            ErrorKind::RpcError => "rpc_error",
            ErrorKind::NoResult => "no_result",
            ErrorKind::InvalidResult => "invalid_result",
            ErrorKind::InvalidHex => "invalid_hex",
        }
    }

    pub fn class(self) -> ErrorClass {
        match self {
            ErrorKind::RequestFailed | ErrorKind::Timeout | ErrorKind::HttpStatus => {
                ErrorClass::Network
            }
            ErrorKind::RpcError => ErrorClass::Rpc,
            ErrorKind::JsonDecode
            | ErrorKind::NoResult
            | ErrorKind::InvalidResult
            | ErrorKind::InvalidHex => ErrorClass::Parse,
        }
    }
}

/// Failure of a single poll target, at either the RPC or conversion stage.
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error(transparent)]
    Rpc(#[from] RpcClientError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl PollError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PollError::Rpc(e) => match e {
                RpcClientError::Build(_) | RpcClientError::Network(_) => ErrorKind::RequestFailed,
                RpcClientError::Timeout(_) => ErrorKind::Timeout,
                RpcClientError::HttpStatus { .. } => ErrorKind::HttpStatus,
                RpcClientError::JsonDecode(_) => ErrorKind::JsonDecode,
                RpcClientError::Rpc { .. } => ErrorKind::RpcError,
                RpcClientError::MissingResult => ErrorKind::NoResult,
                RpcClientError::InvalidResult(_) => ErrorKind::InvalidResult,
            },
            PollError::Conversion(_) => ErrorKind::InvalidHex,
        }
    }
}

/// Outcome counts of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub duration: Duration,
}

/// Periodic balance poller over a fixed set of targets.
pub struct BalancePoller {
    client: RpcClient,
    targets: Arc<[PollTarget]>,
    metrics: Arc<MetricsSink>,
    interval: Duration,
    max_concurrency: usize,
}

impl BalancePoller {
    /// Create a poller with the default interval and concurrency cap.
    pub fn new(client: RpcClient, targets: Vec<PollTarget>, metrics: Arc<MetricsSink>) -> Self {
        Self {
            client,
            targets: targets.into(),
            metrics,
            interval: DEFAULT_UPDATE_INTERVAL,
            max_concurrency: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }

    /// Set the cycle interval. Zero is raised to one millisecond.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Cap concurrent requests per cycle. Values below 1 are raised to 1.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Run the poller loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(poller.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_ms = self.interval.as_millis() as u64,
            targets = self.targets.len(),
            max_concurrency = self.max_concurrency,
            "Balance poller starting"
        );

        // The first tick completes immediately.
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {},
                _ = shutdown.cancelled() => {
                    info!("Balance poller shutting down");
                    return;
                }
            }

            let summary = tokio::select! {
                summary = self.run_cycle() => summary,
                _ = shutdown.cancelled() => {
                    info!("Balance poller shutting down, abandoning in-flight cycle");
                    return;
                }
            };

            let skipped = skipped_ticks(summary.duration, self.interval);
            if skipped > 0 {
                warn!(
                    duration_ms = summary.duration.as_millis() as u64,
                    interval_ms = self.interval.as_millis() as u64,
                    skipped,
                    "Balance cycle overran the update interval, skipping ticks"
                );
                ticker.reset();
            }
            self.metrics.record_cycle(summary.duration, skipped);
        }
    }

    /// Execute one cycle over every target and wait for all of them.
    pub async fn run_cycle(&self) -> CycleSummary {
        let started = Instant::now();
        info!(targets = self.targets.len(), "Starting balance update cycle");

        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for target in self.targets.iter().cloned() {
            let permits = Arc::clone(&permits);
            let client = self.client.clone();
            let metrics = Arc::clone(&self.metrics);

            tasks.spawn(async move {
                // Held until the request resolves; the semaphore is never closed.
                let _permit = permits.acquire_owned().await.ok();
                poll_target(&client, &metrics, &target).await.is_ok()
            });
        }

        let mut succeeded = 0;
        let mut failed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => succeeded += 1,
                Ok(false) => failed += 1,
                Err(e) => {
                    warn!(error = %e, "Balance poll task did not complete");
                    failed += 1;
                }
            }
        }

        let summary = CycleSummary {
            succeeded,
            failed,
            duration: started.elapsed(),
        };
        info!(
            succeeded,
            failed,
            duration_ms = summary.duration.as_millis() as u64,
            "Balance update cycle completed"
        );
        summary
    }
}

/// Poll one target and record the outcome in `metrics`.
///
/// Errors are returned for the caller's bookkeeping only; they are already
/// counted and logged.
pub async fn poll_target(
    client: &RpcClient,
    metrics: &MetricsSink,
    target: &PollTarget,
) -> Result<BalanceResult, PollError> {
    match fetch_balance(client, target).await {
        Ok(result) => {
            metrics.record_success(&result);
            info!(
                chain = %target.chain_name(),
                label = %target.label(),
                address = %target.address(),
                balance = %result.amount,
                symbol = %target.symbol(),
                "Updated balance"
            );
            Ok(result)
        }
        Err(e) => {
            let kind = e.kind();
            metrics.record_failure(target, kind);
            warn!(
                chain = %target.chain_name(),
                label = %target.label(),
                address = %target.address(),
                error_type = kind.as_str(),
                error_class = ?kind.class(),
                error = %e,
                "Failed to get balance"
            );
            Err(e)
        }
    }
}

async fn fetch_balance(client: &RpcClient, target: &PollTarget) -> Result<BalanceResult, PollError> {
    let hex = client
        .fetch_balance(&target.chain.rpc_url, target.address())
        .await?;
    debug!(chain = %target.chain_name(), label = %target.label(), %hex, "Raw balance");

    let (wei, amount) = hex_to_decimal(&hex, target.chain.decimals)?;

    Ok(BalanceResult {
        target: target.clone(),
        wei,
        amount,
        timestamp: Utc::now(),
    })
}

/// Number of ticks that fell inside a cycle of length `duration`.
fn skipped_ticks(duration: Duration, interval: Duration) -> u64 {
    if interval.is_zero() {
        return 0;
    }
    (duration.as_nanos() / interval.as_nanos()) as u64
}
