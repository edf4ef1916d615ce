// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! loader that turns them into an [`AppConfig`]. Configuration is loaded from
//! the environment once at startup; any error stops the process before the
//! first poll.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `CHAINS_CONFIG` | JSON array of chain records | Required (or `CHAINS_CONFIG_PATH`) |
//! | `CHAINS_CONFIG_PATH` | File containing the chain JSON array | - |
//! | `ADDRESSES_CONFIG` | JSON array of address records | Required (or `ADDRESSES_CONFIG_PATH`) |
//! | `ADDRESSES_CONFIG_PATH` | File containing the address JSON array | - |
//! | `UPDATE_INTERVAL` | Seconds between polling cycles | `60` |
//! | `PROMETHEUS_PORT` | Metrics server port | `8000` |
//! | `HOST` | Metrics server bind address | `0.0.0.0` |
//! | `RPC_TIMEOUT_SECS` | Per-request RPC timeout in seconds | `30` |
//! | `MAX_CONCURRENT_REQUESTS` | RPC requests in flight per cycle | `8` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |
//!
//! Inline JSON takes precedence over the `_PATH` variant.
//!
//! ## Example
//!
//! ```text
//! CHAINS_CONFIG='[{"name":"ethereum","rpc_url":"https://eth.llamarpc.com","native_token_symbol":"ETH","decimals":18}]'
//! ADDRESSES_CONFIG='[{"address":"0x742d35Cc6634C0532925a3b844Bc454e4438f44e","label":"treasury","chains":["ethereum"]}]'
//! ```

use std::fs;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

use crate::blockchain::{AddressEntry, ChainConfig, DEFAULT_RPC_TIMEOUT};
use crate::error::ConfigError;
use crate::poller::{DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_UPDATE_INTERVAL};

pub const CHAINS_CONFIG_ENV: &str = "CHAINS_CONFIG";
pub const CHAINS_CONFIG_PATH_ENV: &str = "CHAINS_CONFIG_PATH";
pub const ADDRESSES_CONFIG_ENV: &str = "ADDRESSES_CONFIG";
pub const ADDRESSES_CONFIG_PATH_ENV: &str = "ADDRESSES_CONFIG_PATH";
pub const UPDATE_INTERVAL_ENV: &str = "UPDATE_INTERVAL";
pub const PROMETHEUS_PORT_ENV: &str = "PROMETHEUS_PORT";
pub const HOST_ENV: &str = "HOST";
pub const RPC_TIMEOUT_ENV: &str = "RPC_TIMEOUT_SECS";
pub const MAX_CONCURRENT_REQUESTS_ENV: &str = "MAX_CONCURRENT_REQUESTS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_PROMETHEUS_PORT: u16 = 8000;
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected `json` or `pretty`, got `{other}`")),
        }
    }
}

/// Fully parsed process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub chains: Vec<ChainConfig>,
    pub addresses: Vec<AddressEntry>,
    pub update_interval: Duration,
    pub host: String,
    pub port: u16,
    pub rpc_timeout: Duration,
    pub max_concurrent_requests: usize,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let chains = load_json_array(&env, CHAINS_CONFIG_ENV, CHAINS_CONFIG_PATH_ENV)?;
        let addresses = load_json_array(&env, ADDRESSES_CONFIG_ENV, ADDRESSES_CONFIG_PATH_ENV)?;

        let update_interval = parse_secs(&env, UPDATE_INTERVAL_ENV, DEFAULT_UPDATE_INTERVAL)?;
        let rpc_timeout = parse_secs(&env, RPC_TIMEOUT_ENV, DEFAULT_RPC_TIMEOUT)?;
        let port = parse_value(&env, PROMETHEUS_PORT_ENV, DEFAULT_PROMETHEUS_PORT)?;
        let max_concurrent_requests = parse_value(
            &env,
            MAX_CONCURRENT_REQUESTS_ENV,
            DEFAULT_MAX_CONCURRENT_REQUESTS,
        )?;
        if max_concurrent_requests == 0 {
            return Err(ConfigError::InvalidValue {
                var: MAX_CONCURRENT_REQUESTS_ENV.to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        let log_format = parse_value(&env, LOG_FORMAT_ENV, LogFormat::default())?;
        let host = env(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());

        Ok(Self {
            chains,
            addresses,
            update_interval,
            host,
            port,
            rpc_timeout,
            max_concurrent_requests,
            log_format,
        })
    }

    /// Socket address for the metrics server.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidValue {
                var: HOST_ENV.to_string(),
                message: e.to_string(),
            })
    }
}

/// Read a JSON array from `var`, falling back to the file named by `path_var`.
fn load_json_array<T, F>(env: &F, var: &str, path_var: &str) -> Result<Vec<T>, ConfigError>
where
    T: DeserializeOwned,
    F: Fn(&str) -> Option<String>,
{
    let (raw, origin) = match env(var) {
        Some(inline) => (inline, var.to_string()),
        None => {
            let path = env(path_var).ok_or_else(|| ConfigError::MissingVar(var.to_string()))?;
            let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            (contents, format!("{path_var} ({path})"))
        }
    };

    serde_json::from_str(&raw).map_err(|source| ConfigError::InvalidJson {
        var: origin,
        source,
    })
}

/// Parse a whole number of seconds (at least 1).
fn parse_secs<F>(env: &F, var: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: u64 = parse_value(env, var, default.as_secs())?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            var: var.to_string(),
            message: "must be at least 1 second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn parse_value<T, F>(env: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match env(var) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var: var.to_string(),
            message: format!("{raw:?}: {e}"),
        }),
        None => Ok(default),
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` controls filtering (default `info`); `format` picks between
/// human-readable and JSON output.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
