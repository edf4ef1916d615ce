// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Balance Metrics
//!
//! Owned Prometheus registry holding every series the exporter publishes.
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `evm_balance_wei` | gauge | chain, address, label, token_symbol |
//! | `evm_balance_decimal` | gauge | chain, address, label, token_symbol |
//! | `evm_balance_requests_total` | counter | chain, label, status |
//! | `evm_balance_errors_total` | counter | chain, label, error_type |
//! | `evm_balance_last_update_timestamp` | gauge | chain, address, label |
//! | `evm_balance_cycles_total` | counter | |
//! | `evm_balance_cycles_skipped_total` | counter | |
//! | `evm_balance_cycle_duration_seconds` | gauge | |
//!
//! Failures never clear a balance gauge: the last good value stays exported
//! and `evm_balance_last_update_timestamp` tells consumers how stale it is.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use prometheus::{Encoder, Gauge, GaugeVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::blockchain::{BalanceResult, PollTarget};
use crate::poller::ErrorKind;

const STATUS_SUCCESS: &str = "success";
const STATUS_FAILED: &str = "failed";

/// Process-wide balance metrics.
///
/// Writers and the encode path share one lock so a scrape never observes a
/// label set with its wei, decimal and timestamp values from different polls.
pub struct MetricsSink {
    registry: Registry,
    write_lock: Mutex<()>,
    pub(crate) balance_wei: GaugeVec,
    pub(crate) balance_decimal: GaugeVec,
    pub(crate) requests: IntCounterVec,
    pub(crate) errors: IntCounterVec,
    pub(crate) last_update: GaugeVec,
    pub(crate) cycles: IntCounter,
    pub(crate) cycles_skipped: IntCounter,
    pub(crate) cycle_duration: Gauge,
}

impl MetricsSink {
    /// Create a sink with a fresh registry and all series registered.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let balance_wei = GaugeVec::new(
            Opts::new("evm_balance_wei", "Native token balance in wei"),
            &["chain", "address", "label", "token_symbol"],
        )?;
        let balance_decimal = GaugeVec::new(
            Opts::new("evm_balance_decimal", "Native token balance in decimal form"),
            &["chain", "address", "label", "token_symbol"],
        )?;
        let requests = IntCounterVec::new(
            Opts::new("evm_balance_requests_total", "Total number of balance requests"),
            &["chain", "label", "status"],
        )?;
        let errors = IntCounterVec::new(
            Opts::new(
                "evm_balance_errors_total",
                "Total number of balance request errors",
            ),
            &["chain", "label", "error_type"],
        )?;
        let last_update = GaugeVec::new(
            Opts::new(
                "evm_balance_last_update_timestamp",
                "Timestamp of last successful balance update",
            ),
            &["chain", "address", "label"],
        )?;
        let cycles = IntCounter::new("evm_balance_cycles_total", "Completed polling cycles")?;
        let cycles_skipped = IntCounter::new(
            "evm_balance_cycles_skipped_total",
            "Ticks skipped because the previous cycle was still running",
        )?;
        let cycle_duration = Gauge::new(
            "evm_balance_cycle_duration_seconds",
            "Duration of the last polling cycle",
        )?;

        registry.register(Box::new(balance_wei.clone()))?;
        registry.register(Box::new(balance_decimal.clone()))?;
        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(errors.clone()))?;
        registry.register(Box::new(last_update.clone()))?;
        registry.register(Box::new(cycles.clone()))?;
        registry.register(Box::new(cycles_skipped.clone()))?;
        registry.register(Box::new(cycle_duration.clone()))?;

        Ok(Self {
            registry,
            write_lock: Mutex::new(()),
            balance_wei,
            balance_decimal,
            requests,
            errors,
            last_update,
            cycles,
            cycles_skipped,
            cycle_duration,
        })
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded data is `()`, so a poisoned lock carries no broken state.
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a successful balance read: both balance gauges, the success
    /// counter and the last-update timestamp move together.
    pub fn record_success(&self, result: &BalanceResult) {
        let target = &result.target;
        let balance_labels = [
            target.chain_name(),
            target.address(),
            target.label(),
            target.symbol(),
        ];
        let updated_at = result.timestamp.timestamp_millis() as f64 / 1000.0;

        let _guard = self.lock();
        self.balance_wei
            .with_label_values(&balance_labels)
            .set(result.amount.wei_f64());
        self.balance_decimal
            .with_label_values(&balance_labels)
            .set(result.amount.to_f64());
        self.last_update
            .with_label_values(&[target.chain_name(), target.address(), target.label()])
            .set(updated_at);
        self.requests
            .with_label_values(&[target.chain_name(), target.label(), STATUS_SUCCESS])
            .inc();
    }

    /// Record a failed poll. Balance gauges keep their previous values.
    pub fn record_failure(&self, target: &PollTarget, kind: ErrorKind) {
        let _guard = self.lock();
        self.requests
            .with_label_values(&[target.chain_name(), target.label(), STATUS_FAILED])
            .inc();
        self.errors
            .with_label_values(&[target.chain_name(), target.label(), kind.as_str()])
            .inc();
    }

    /// Record the completion of a polling cycle.
    pub fn record_cycle(&self, duration: Duration, skipped_ticks: u64) {
        let _guard = self.lock();
        self.cycles.inc();
        self.cycle_duration.set(duration.as_secs_f64());
        if skipped_ticks > 0 {
            self.cycles_skipped.inc_by(skipped_ticks);
        }
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles.get()
    }

    /// Render every series in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let families = {
            let _guard = self.lock();
            self.registry.gather()
        };

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{AddressConfig, ChainConfig, TokenAmount};
    use alloy::primitives::{Address, U256};
    use chrono::Utc;
    use std::sync::Arc;

    fn target() -> PollTarget {
        let address: Address = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e".parse().unwrap();
        PollTarget {
            address: Arc::new(AddressConfig {
                address,
                checksummed: address.to_checksum(None),
                label: "treasury".to_string(),
                chains: vec!["ethereum".to_string()],
            }),
            chain: Arc::new(ChainConfig {
                name: "ethereum".to_string(),
                rpc_url: "https://eth.example".to_string(),
                native_token_symbol: "ETH".to_string(),
                decimals: 18,
            }),
        }
    }

    fn result(t: &PollTarget, wei: u64, decimals: u8) -> BalanceResult {
        BalanceResult {
            target: t.clone(),
            wei: U256::from(wei),
            amount: TokenAmount::new(U256::from(wei), decimals),
            timestamp: Utc::now(),
        }
    }

    fn balance_labels(t: &PollTarget) -> [&str; 4] {
        [t.chain_name(), t.address(), t.label(), t.symbol()]
    }

    #[test]
    fn success_sets_gauges_and_counts_request() {
        let sink = MetricsSink::new().unwrap();
        let t = target();
        sink.record_success(&result(&t, 1_500_000_000_000_000_000, 18));

        assert_eq!(
            sink.balance_wei.with_label_values(&balance_labels(&t)).get(),
            1.5e18
        );
        assert_eq!(
            sink.balance_decimal.with_label_values(&balance_labels(&t)).get(),
            1.5
        );
        assert!(
            sink.last_update
                .with_label_values(&[t.chain_name(), t.address(), t.label()])
                .get()
                > 0.0
        );
        assert_eq!(
            sink.requests
                .with_label_values(&["ethereum", "treasury", "success"])
                .get(),
            1
        );
    }

    #[test]
    fn failure_keeps_previous_balance() {
        let sink = MetricsSink::new().unwrap();
        let t = target();
        sink.record_success(&result(&t, 42, 0));
        let stamp = sink
            .last_update
            .with_label_values(&[t.chain_name(), t.address(), t.label()])
            .get();

        sink.record_failure(&t, ErrorKind::Timeout);
        sink.record_failure(&t, ErrorKind::Timeout);

        assert_eq!(
            sink.balance_decimal.with_label_values(&balance_labels(&t)).get(),
            42.0
        );
        assert_eq!(
            sink.last_update
                .with_label_values(&[t.chain_name(), t.address(), t.label()])
                .get(),
            stamp
        );
        assert_eq!(
            sink.errors
                .with_label_values(&["ethereum", "treasury", "timeout"])
                .get(),
            2
        );
        assert_eq!(
            sink.requests
                .with_label_values(&["ethereum", "treasury", "failed"])
                .get(),
            2
        );
    }

    #[test]
    fn failure_without_prior_success_exports_no_balance() {
        let sink = MetricsSink::new().unwrap();
        sink.record_failure(&target(), ErrorKind::RpcError);

        let text = sink.encode().unwrap();
        assert!(text.contains(r#"error_type="rpc_error""#));
        assert!(!text.contains("evm_balance_wei{"));
        assert!(!text.contains("evm_balance_last_update_timestamp{"));
    }

    #[test]
    fn cycle_bookkeeping() {
        let sink = MetricsSink::new().unwrap();
        sink.record_cycle(Duration::from_millis(1500), 0);
        sink.record_cycle(Duration::from_millis(250), 3);

        assert_eq!(sink.cycles_completed(), 2);
        assert_eq!(sink.cycles_skipped.get(), 3);
        assert_eq!(sink.cycle_duration.get(), 0.25);
    }

    #[test]
    fn encode_renders_text_format() {
        let sink = MetricsSink::new().unwrap();
        let t = target();
        sink.record_success(&result(&t, 7, 0));

        let text = sink.encode().unwrap();
        assert!(text.contains("# TYPE evm_balance_wei gauge"));
        assert!(text.contains("# TYPE evm_balance_requests_total counter"));
        assert!(text.contains(
            r#"evm_balance_decimal{address="0x742d35Cc6634C0532925a3b844Bc454e4438f44e",chain="ethereum",label="treasury",token_symbol="ETH"} 7"#
        ));
    }

    #[test]
    fn sinks_are_independent() {
        let a = MetricsSink::new().unwrap();
        let b = MetricsSink::new().unwrap();
        a.record_cycle(Duration::from_secs(1), 0);
        assert_eq!(a.cycles_completed(), 1);
        assert_eq!(b.cycles_completed(), 0);
    }
}
