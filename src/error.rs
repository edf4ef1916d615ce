// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Startup configuration errors. Any of these stops the process before the
/// first poll cycle.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingVar(String),

    #[error("invalid JSON in {var}: {source}")]
    InvalidJson {
        var: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("invalid chain name {0:?}: expected a non-empty lowercase identifier")]
    InvalidChainName(String),

    #[error("duplicate chain {0:?}")]
    DuplicateChain(String),

    #[error("chain {chain:?} has an invalid RPC URL: {message}")]
    InvalidRpcUrl { chain: String, message: String },

    #[error("chain {0:?} has an empty native token symbol")]
    EmptySymbol(String),

    #[error("address {address:?} is not a valid EVM address: {message}")]
    InvalidAddress { address: String, message: String },

    #[error("address {0:?} has an empty label")]
    EmptyLabel(String),

    #[error("address {0:?} does not list any chains")]
    NoChains(String),

    #[error("address {label:?} references unknown chain {chain:?}. Available chains: {available:?}")]
    UnknownChain {
        label: String,
        chain: String,
        available: Vec<String>,
    },

    #[error("address {label:?} lists chain {chain:?} more than once")]
    DuplicateChainReference { label: String, chain: String },
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    /// 500 response for failures on the exposition path.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
