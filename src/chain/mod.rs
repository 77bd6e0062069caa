//! Chain module - configured chains and their balance providers
//!
//! This module provides:
//! - Ordered chain registry loaded once from configuration
//! - From/to chain pairs that can never point at the same chain
//! - Multi-RPC provider with automatic failover
//! - Per-chain balance resolution

pub mod balance;
pub mod provider;

pub use balance::BalanceResolver;
pub use provider::{ChainProvider, GasPrice};

use crate::config::Settings;
use crate::error::{BridgeError, BridgeResult};

use async_trait::async_trait;
use ethers::types::{Address, U256};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Source of an account's balance on one chain
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BalanceProvider: Send + Sync {
    /// Balance in the chain's smallest unit
    async fn get_balance(&self, account: Address) -> BridgeResult<U256>;
}

/// A configured chain
#[derive(Clone)]
pub struct Chain {
    pub key: String,
    pub name: String,
    pub network_id: u64,
    pub balances: Arc<dyn BalanceProvider>,
}

impl Chain {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        network_id: u64,
        balances: Arc<dyn BalanceProvider>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            network_id,
            balances,
        }
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("network_id", &self.network_id)
            .finish()
    }
}

impl PartialEq for Chain {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Chain {}

/// Source and destination of a bridge transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainPair {
    from: Chain,
    to: Chain,
}

impl ChainPair {
    pub fn new(from: Chain, to: Chain) -> BridgeResult<Self> {
        if from.key == to.key {
            return Err(BridgeError::InvalidChainPair {
                from: from.key,
                to: to.key,
            });
        }
        Ok(Self { from, to })
    }

    pub fn from(&self) -> &Chain {
        &self.from
    }

    pub fn to(&self) -> &Chain {
        &self.to
    }

    pub fn swapped(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }
}

/// Chains in configuration order
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: Vec<Chain>,
}

impl ChainRegistry {
    pub fn new(chains: Vec<Chain>) -> BridgeResult<Self> {
        if chains.len() < 2 {
            return Err(BridgeError::Config(
                "At least two chains are required to bridge".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for chain in &chains {
            if !seen.insert(chain.key.as_str()) {
                return Err(BridgeError::Config(format!("Duplicate chain key {}", chain.key)));
            }
        }

        Ok(Self { chains })
    }

    pub fn get(&self, key: &str) -> BridgeResult<&Chain> {
        self.chains
            .iter()
            .find(|c| c.key == key)
            .ok_or_else(|| BridgeError::ChainNotFound {
                chain: key.to_string(),
            })
    }

    pub fn all(&self) -> &[Chain] {
        &self.chains
    }

    /// First two configured chains
    pub fn default_pair(&self) -> BridgeResult<ChainPair> {
        ChainPair::new(self.chains[0].clone(), self.chains[1].clone())
    }

    /// Pair for a newly selected source chain
    ///
    /// The destination stays where it was unless it collides with the new
    /// source, in which case the previous source takes its place.
    pub fn pair_for_source(&self, from_key: &str, current: &ChainPair) -> BridgeResult<ChainPair> {
        let from = self.get(from_key)?.clone();

        let to = if current.to().key != from.key {
            current.to().clone()
        } else if current.from().key != from.key {
            current.from().clone()
        } else {
            self.chains
                .iter()
                .find(|c| c.key != from.key)
                .cloned()
                .ok_or_else(|| BridgeError::Internal("No destination chain available".to_string()))?
        };

        ChainPair::new(from, to)
    }
}

/// Connect every enabled chain, in configuration order
pub async fn connect_chains(settings: &Settings) -> BridgeResult<Vec<(Chain, Arc<ChainProvider>)>> {
    let mut connected = Vec::new();

    for chain_config in settings.enabled_chains() {
        info!(
            "Initializing chain {} (network ID: {})",
            chain_config.name, chain_config.network_id
        );

        let provider = match ChainProvider::new(chain_config.clone()).await {
            Ok(provider) => Arc::new(provider),
            Err(e) => {
                warn!("Skipping chain {}: {}", chain_config.key, e);
                continue;
            }
        };

        let chain = Chain::new(
            chain_config.key.clone(),
            chain_config.name.clone(),
            chain_config.network_id,
            provider.clone(),
        );
        connected.push((chain, provider));
    }

    Ok(connected)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn chain(key: &str, network_id: u64) -> Chain {
        let mut balances = MockBalanceProvider::new();
        balances
            .expect_get_balance()
            .returning(|_| Ok(U256::zero()));
        Chain::new(key, key.to_uppercase(), network_id, Arc::new(balances))
    }

    fn registry() -> ChainRegistry {
        ChainRegistry::new(vec![chain("ethereum", 1), chain("gnosis", 100), chain("base", 8453)])
            .unwrap()
    }

    #[test]
    fn test_pair_rejects_same_chain() {
        let err = ChainPair::new(chain("ethereum", 1), chain("ethereum", 1)).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidChainPair { .. }));
    }

    #[test]
    fn test_default_pair_is_first_two() {
        let pair = registry().default_pair().unwrap();
        assert_eq!(pair.from().key, "ethereum");
        assert_eq!(pair.to().key, "gnosis");
    }

    #[test]
    fn test_selecting_destination_as_source_swaps() {
        let registry = registry();
        let pair = registry.default_pair().unwrap();
        let next = registry.pair_for_source("gnosis", &pair).unwrap();
        assert_eq!(next.from().key, "gnosis");
        assert_eq!(next.to().key, "ethereum");
    }

    #[test]
    fn test_to_never_equals_from() {
        let registry = registry();
        let mut pair = registry.default_pair().unwrap();
        for key in ["gnosis", "gnosis", "base", "ethereum", "base", "gnosis", "ethereum"] {
            pair = registry.pair_for_source(key, &pair).unwrap();
            assert_eq!(pair.from().key, key);
            assert_ne!(pair.from().key, pair.to().key);
        }
    }

    #[test]
    fn test_unknown_chain() {
        let registry = registry();
        let pair = registry.default_pair().unwrap();
        assert!(matches!(
            registry.pair_for_source("solana", &pair),
            Err(BridgeError::ChainNotFound { .. })
        ));
    }

    #[test]
    fn test_registry_needs_two_distinct_chains() {
        assert!(ChainRegistry::new(vec![chain("ethereum", 1)]).is_err());
        assert!(ChainRegistry::new(vec![chain("ethereum", 1), chain("ethereum", 1)]).is_err());
    }
}
