//! Chain provider with multi-RPC support and automatic failover

use super::BalanceProvider;
use crate::config::{ChainConfig, GasPriceStrategy};
use crate::error::{BridgeError, BridgeResult};

use async_trait::async_trait;
use ethers::prelude::*;
use ethers::providers::{Http, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Multi-provider wrapper with automatic failover
pub struct ChainProvider {
    /// Chain configuration
    config: ChainConfig,
    /// HTTP providers (multiple for failover)
    http_providers: Vec<Provider<Http>>,
    /// Current active provider index
    current_provider: AtomicUsize,
}

impl ChainProvider {
    /// Create a new chain provider
    pub async fn new(config: ChainConfig) -> BridgeResult<Self> {
        let mut http_providers = Vec::new();

        for url in &config.rpc_urls {
            match Provider::<Http>::try_from(url.as_str()) {
                Ok(provider) => {
                    let provider = provider.interval(Duration::from_millis(100));
                    http_providers.push(provider);
                    debug!("Added HTTP provider for chain {}: {}", config.key, url);
                }
                Err(e) => {
                    warn!("Failed to create provider for {}: {}", url, e);
                }
            }
        }

        if http_providers.is_empty() {
            return Err(BridgeError::ChainConnection {
                chain: config.key.clone(),
                message: "No valid RPC providers".to_string(),
            });
        }

        Ok(Self {
            config,
            http_providers,
            current_provider: AtomicUsize::new(0),
        })
    }

    /// Get the active HTTP provider
    pub fn http(&self) -> &Provider<Http> {
        let idx = self.current_provider.load(Ordering::Relaxed);
        &self.http_providers[idx % self.http_providers.len()]
    }

    /// Switch to next available provider
    pub fn failover(&self) {
        let current = self.current_provider.load(Ordering::Relaxed);
        let next = (current + 1) % self.http_providers.len();
        self.current_provider.store(next, Ordering::Relaxed);
        warn!("Chain {} failover to provider {}", self.config.key, next);
    }

    /// Get native balance with failover
    pub async fn native_balance(&self, account: Address) -> BridgeResult<U256> {
        let mut last_error = String::new();

        for _ in 0..self.http_providers.len() {
            match self.http().get_balance(account, None).await {
                Ok(balance) => return Ok(balance),
                Err(e) => {
                    warn!("Failed to get balance from chain {}: {}", self.config.key, e);
                    last_error = e.to_string();
                    self.failover();
                }
            }
        }

        Err(BridgeError::Balance {
            chain: self.config.key.clone(),
            message: format!("All providers failed: {}", last_error),
        })
    }

    /// Estimate gas for a transaction
    ///
    /// Node reports of insufficient funds surface as `BridgeError::InsufficientFunds`.
    pub async fn estimate_gas(&self, tx: &TypedTransaction) -> BridgeResult<U256> {
        self.http()
            .estimate_gas(tx, None)
            .await
            .map_err(|e| BridgeError::from_rpc(&self.config.key, e.to_string()))
    }

    /// Get current gas price based on chain strategy
    pub async fn get_gas_price(&self) -> BridgeResult<GasPrice> {
        match self.config.gas_price_strategy {
            GasPriceStrategy::Legacy => {
                let price = self
                    .http()
                    .get_gas_price()
                    .await
                    .map_err(|e| BridgeError::GasEstimation(e.to_string()))?;
                Ok(GasPrice::Legacy(price))
            }
            GasPriceStrategy::Eip1559 => {
                let (max_fee, priority_fee) = self.estimate_eip1559_fees().await?;
                Ok(GasPrice::Eip1559 {
                    max_fee_per_gas: max_fee,
                    max_priority_fee_per_gas: priority_fee,
                })
            }
        }
    }

    /// Estimate EIP-1559 fees
    async fn estimate_eip1559_fees(&self) -> BridgeResult<(U256, U256)> {
        let block = self
            .http()
            .get_block(BlockNumber::Latest)
            .await
            .map_err(|e| BridgeError::GasEstimation(e.to_string()))?
            .ok_or_else(|| BridgeError::GasEstimation("No latest block".to_string()))?;

        let base_fee = block
            .base_fee_per_gas
            .ok_or_else(|| BridgeError::GasEstimation("No base fee in block".to_string()))?;

        let priority_fee = U256::from(2_000_000_000u64); // 2 gwei

        // Max fee = 2 * base_fee + priority_fee
        let max_fee = base_fee * 2 + priority_fee;

        Ok((cap_gas_price(max_fee, self.config.max_gas_price_gwei), priority_fee))
    }

    /// Health check
    pub async fn health_check(&self) -> bool {
        match self.http().get_block_number().await {
            Ok(_) => true,
            Err(e) => {
                error!("Health check failed for chain {}: {}", self.config.key, e);
                false
            }
        }
    }

    /// Get chain key
    pub fn key(&self) -> &str {
        &self.config.key
    }

    /// Get bridge contract address
    pub fn bridge_address(&self) -> &str {
        &self.config.bridge_address
    }

    /// Gas used to claim a transfer on this chain when it is the destination
    pub fn claim_gas_limit(&self) -> u64 {
        self.config.claim_gas_limit
    }
}

#[async_trait]
impl BalanceProvider for ChainProvider {
    async fn get_balance(&self, account: Address) -> BridgeResult<U256> {
        self.native_balance(account).await
    }
}

/// Clamp a gas price to the configured ceiling
pub fn cap_gas_price(price: U256, max_gas_price_gwei: u64) -> U256 {
    let max_wei = U256::from(max_gas_price_gwei) * U256::exp10(9);
    std::cmp::min(price, max_wei)
}

/// Gas price types
#[derive(Debug, Clone, PartialEq)]
pub enum GasPrice {
    Legacy(U256),
    Eip1559 {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
}

impl GasPrice {
    /// Worst-case price paid per unit of gas
    pub fn effective(&self) -> U256 {
        match self {
            GasPrice::Legacy(price) => *price,
            GasPrice::Eip1559 {
                max_fee_per_gas, ..
            } => *max_fee_per_gas,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gas_price_cap() {
        let gwei = U256::exp10(9);
        assert_eq!(cap_gas_price(gwei * 600, 500), gwei * 500);
        assert_eq!(cap_gas_price(gwei * 30, 500), gwei * 30);
    }

    #[test]
    fn test_effective_price_uses_max_fee() {
        let price = GasPrice::Eip1559 {
            max_fee_per_gas: U256::from(50),
            max_priority_fee_per_gas: U256::from(2),
        };
        assert_eq!(price.effective(), U256::from(50));
        assert_eq!(GasPrice::Legacy(U256::from(7)).effective(), U256::from(7));
    }

    #[tokio::test]
    async fn test_provider_requires_rpc_url() {
        let config = ChainConfig {
            key: "ethereum".into(),
            name: "Ethereum".into(),
            network_id: 1,
            rpc_urls: vec!["not a url".into()],
            bridge_address: String::new(),
            claim_gas_limit: 100_000,
            gas_price_strategy: GasPriceStrategy::Legacy,
            max_gas_price_gwei: 100,
            enabled: true,
        };
        let err = ChainProvider::new(config).await.err().unwrap();
        assert!(matches!(err, BridgeError::ChainConnection { .. }));
    }
}
