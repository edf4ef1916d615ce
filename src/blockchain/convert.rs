// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Hex wei to decimal conversion.
//!
//! `eth_getBalance` returns a `0x`-prefixed hex quantity. Balances are parsed
//! into a 256-bit integer and scaled by `10^-decimals` as a decimal string, so
//! no value goes through binary floating point before it is displayed.

use std::fmt;

use alloy::primitives::U256;

/// Maximum number of significant hex digits in a 256-bit quantity.
const MAX_HEX_DIGITS: usize = 64;

/// Exact token amount: `wei / 10^decimals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAmount {
    wei: U256,
    decimals: u8,
}

impl TokenAmount {
    pub fn new(wei: U256, decimals: u8) -> Self {
        Self { wei, decimals }
    }

    pub fn wei(&self) -> U256 {
        self.wei
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Gauge value of the decimal amount.
    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::MAX)
    }

    /// Gauge value of the raw wei amount.
    pub fn wei_f64(&self) -> f64 {
        self.wei.to_string().parse().unwrap_or(f64::MAX)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.wei.to_string();
        let scale = usize::from(self.decimals);

        if scale == 0 {
            return f.write_str(&digits);
        }

        // Left-pad so there is at least one integer digit.
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (whole, fraction) = padded.split_at(padded.len() - scale);
        let fraction = fraction.trim_end_matches('0');

        if fraction.is_empty() {
            f.write_str(whole)
        } else {
            write!(f, "{whole}.{fraction}")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("hex quantity must start with 0x: {0:?}")]
    MissingPrefix(String),

    #[error("invalid hex digit in quantity: {0:?}")]
    InvalidDigit(String),

    #[error("hex quantity exceeds 256 bits: {0:?}")]
    Overflow(String),
}

/// Parse a `0x`-prefixed hex quantity into wei.
///
/// `0x` and `0x0` both parse as zero.
pub fn parse_wei(hex: &str) -> Result<U256, ConversionError> {
    let digits = hex
        .strip_prefix("0x")
        .ok_or_else(|| ConversionError::MissingPrefix(hex.to_string()))?;

    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ConversionError::InvalidDigit(hex.to_string()));
    }

    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return Ok(U256::ZERO);
    }
    if significant.len() > MAX_HEX_DIGITS {
        return Err(ConversionError::Overflow(hex.to_string()));
    }

    U256::from_str_radix(significant, 16).map_err(|_| ConversionError::Overflow(hex.to_string()))
}

/// Convert a hex wei quantity into `(wei, decimal)` at the given precision.
pub fn hex_to_decimal(hex: &str, decimals: u8) -> Result<(U256, TokenAmount), ConversionError> {
    let wei = parse_wei(hex)?;
    Ok((wei, TokenAmount::new(wei, decimals)))
}
