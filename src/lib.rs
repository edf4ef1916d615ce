// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM Balance Exporter - native balance gauges for Prometheus
//!
//! Periodically reads the native-token balance of configured addresses on
//! one or more EVM chains through `eth_getBalance` and publishes the values
//! as Prometheus metrics.
//!
//! ## Modules
//!
//! - `api` - HTTP handlers (`/metrics`, `/health`)
//! - `blockchain` - JSON-RPC client and wei conversion
//! - `config` - Environment configuration and logging setup
//! - `metrics` - Prometheus registry and series
//! - `poller` - Polling scheduler
//! - `registry` - Validated chain and address registries

pub mod api;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod metrics;
pub mod poller;
pub mod registry;
pub mod state;
