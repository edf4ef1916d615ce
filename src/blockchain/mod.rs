// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM chain integration.
//!
//! This module provides functionality for:
//! - Querying native balances over JSON-RPC (`eth_getBalance`)
//! - Converting hex wei quantities into exact decimal amounts
//! - Chain, address and poll target types

pub mod client;
pub mod convert;
pub mod types;

pub use client::{RpcClient, RpcClientError, DEFAULT_RPC_TIMEOUT};
pub use convert::{hex_to_decimal, parse_wei, ConversionError, TokenAmount};
pub use types::*;
