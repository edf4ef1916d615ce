// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain and address configuration types.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::convert::TokenAmount;

/// Default precision for a chain's native token when `decimals` is omitted.
pub const DEFAULT_DECIMALS: u8 = 18;

fn default_decimals() -> u8 {
    DEFAULT_DECIMALS
}

/// EVM chain configuration, as loaded from `CHAINS_CONFIG`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    /// Unique lowercase identifier (e.g. `ethereum`, `polygon`)
    pub name: String,
    /// JSON-RPC endpoint URL
    pub rpc_url: String,
    /// Native token symbol (e.g. `ETH`, `POL`)
    pub native_token_symbol: String,
    /// Number of decimals of the native token
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

/// Raw address record, as loaded from `ADDRESSES_CONFIG`.
///
/// Validated into an [`AddressConfig`] by the address registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddressEntry {
    pub address: String,
    pub label: String,
    pub chains: Vec<String>,
}

/// A monitored address bound to the chains it opted into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressConfig {
    /// Parsed address
    pub address: Address,
    /// EIP-55 checksummed form, used for RPC params and metric labels
    pub checksummed: String,
    /// Human-readable identifier
    pub label: String,
    /// Chain names, in configured order
    pub chains: Vec<String>,
}

/// One (address, chain) pair polled in every cycle.
#[derive(Debug, Clone)]
pub struct PollTarget {
    pub address: Arc<AddressConfig>,
    pub chain: Arc<ChainConfig>,
}

impl PollTarget {
    pub fn chain_name(&self) -> &str {
        &self.chain.name
    }

    pub fn label(&self) -> &str {
        &self.address.label
    }

    pub fn address(&self) -> &str {
        &self.address.checksummed
    }

    pub fn symbol(&self) -> &str {
        &self.chain.native_token_symbol
    }
}

/// Outcome of one successful balance read. Only its projection into the
/// metrics sink outlives the cycle.
#[derive(Debug, Clone)]
pub struct BalanceResult {
    pub target: PollTarget,
    pub wei: U256,
    pub amount: TokenAmount,
    pub timestamp: DateTime<Utc>,
}
