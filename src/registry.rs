// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Chain and Address Registries
//!
//! Validated, immutable views over the configured chains and addresses.
//! Every reference from an address to a chain is resolved here, once, at
//! startup. The poll target set is the per-address cross-product with the
//! chains that address opted into, never the full chain list.

use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use alloy::primitives::Address;

use crate::blockchain::{AddressConfig, AddressEntry, ChainConfig, PollTarget};
use crate::error::ConfigError;

/// Configured chains, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: BTreeMap<String, Arc<ChainConfig>>,
}

impl ChainRegistry {
    /// Validate and index chain configurations.
    pub fn new(chains: Vec<ChainConfig>) -> Result<Self, ConfigError> {
        let mut indexed = BTreeMap::new();

        for chain in chains {
            validate_chain(&chain)?;
            if indexed.contains_key(&chain.name) {
                return Err(ConfigError::DuplicateChain(chain.name));
            }
            indexed.insert(chain.name.clone(), Arc::new(chain));
        }

        Ok(Self { chains: indexed })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ChainConfig>> {
        self.chains.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.chains.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

fn validate_chain(chain: &ChainConfig) -> Result<(), ConfigError> {
    let valid_name = !chain.name.is_empty()
        && chain
            .name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
    if !valid_name {
        return Err(ConfigError::InvalidChainName(chain.name.clone()));
    }

    let url = url::Url::parse(&chain.rpc_url).map_err(|e| ConfigError::InvalidRpcUrl {
        chain: chain.name.clone(),
        message: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidRpcUrl {
            chain: chain.name.clone(),
            message: format!("unsupported scheme `{}`", url.scheme()),
        });
    }

    if chain.native_token_symbol.trim().is_empty() {
        return Err(ConfigError::EmptySymbol(chain.name.clone()));
    }

    Ok(())
}

/// Monitored addresses with resolved chain references.
#[derive(Debug, Clone, Default)]
pub struct AddressRegistry {
    addresses: Vec<Arc<AddressConfig>>,
}

impl AddressRegistry {
    /// Validate address records against the chain registry.
    ///
    /// Fails on the first malformed address or unresolved chain reference.
    pub fn new(entries: Vec<AddressEntry>, chains: &ChainRegistry) -> Result<Self, ConfigError> {
        let addresses = entries
            .into_iter()
            .map(|entry| resolve_address(entry, chains).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { addresses })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<AddressConfig>> {
        self.addresses.iter()
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

fn resolve_address(entry: AddressEntry, chains: &ChainRegistry) -> Result<AddressConfig, ConfigError> {
    let raw = entry.address.trim();
    if !raw.starts_with("0x") {
        return Err(ConfigError::InvalidAddress {
            address: entry.address.clone(),
            message: "missing 0x prefix".to_string(),
        });
    }
    let address = Address::from_str(raw).map_err(|e| ConfigError::InvalidAddress {
        address: entry.address.clone(),
        message: e.to_string(),
    })?;

    if entry.label.trim().is_empty() {
        return Err(ConfigError::EmptyLabel(entry.address));
    }
    if entry.chains.is_empty() {
        return Err(ConfigError::NoChains(entry.label));
    }

    let mut seen = HashSet::new();
    for chain in &entry.chains {
        if chains.get(chain).is_none() {
            return Err(ConfigError::UnknownChain {
                label: entry.label.clone(),
                chain: chain.clone(),
                available: chains.names(),
            });
        }
        if !seen.insert(chain.as_str()) {
            return Err(ConfigError::DuplicateChainReference {
                label: entry.label.clone(),
                chain: chain.clone(),
            });
        }
    }

    Ok(AddressConfig {
        checksummed: address.to_checksum(None),
        address,
        label: entry.label,
        chains: entry.chains,
    })
}

/// Expand the registries into the poll target set.
///
/// Each address yields one target per chain it lists, in configured order.
pub fn poll_targets(
    addresses: &AddressRegistry,
    chains: &ChainRegistry,
) -> Result<Vec<PollTarget>, ConfigError> {
    let mut targets = Vec::new();

    for address in addresses.iter() {
        for name in &address.chains {
            let chain = chains.get(name).ok_or_else(|| ConfigError::UnknownChain {
                label: address.label.clone(),
                chain: name.clone(),
                available: chains.names(),
            })?;
            targets.push(PollTarget {
                address: Arc::clone(address),
                chain: Arc::clone(chain),
            });
        }
    }

    Ok(targets)
}
