//! Gas-based fee pricing for bridge transfers

use super::{FeePricing, FeeRequest};
use crate::chain::{ChainProvider, GasPrice};
use crate::error::{BridgeError, BridgeResult};

use async_trait::async_trait;
use dashmap::DashMap;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::abi::{self, Token as AbiToken};
use ethers::types::{Address, TransactionRequest, U256};
use ethers::utils::id;
use std::sync::Arc;
use tracing::debug;

/// Entry point of the bridge contract: `bridge(token, recipient)`
const BRIDGE_SIGNATURE: &str = "bridge(address,address)";

/// Gas estimator applying safety buffers
pub struct GasEstimator {
    /// Buffer percentage for gas limit (e.g., 20 = 20% buffer)
    gas_limit_buffer_percent: u64,
    /// Buffer percentage for gas price
    gas_price_buffer_percent: u64,
}

impl GasEstimator {
    pub fn new(gas_limit_buffer_percent: u64, gas_price_buffer_percent: u64) -> Self {
        Self {
            gas_limit_buffer_percent,
            gas_price_buffer_percent,
        }
    }

    pub fn buffered_gas_limit(&self, gas_limit: U256) -> U256 {
        gas_limit + gas_limit * self.gas_limit_buffer_percent / 100
    }

    /// Get buffered gas price for a chain
    pub async fn get_gas_price(&self, provider: &ChainProvider) -> BridgeResult<GasPrice> {
        let gas_price = self.buffered_gas_price(provider.get_gas_price().await?);
        debug!("Gas price for chain {}: {:?}", provider.key(), gas_price);
        Ok(gas_price)
    }

    pub fn buffered_gas_price(&self, gas_price: GasPrice) -> GasPrice {
        match gas_price {
            GasPrice::Legacy(price) => {
                let buffer = price * self.gas_price_buffer_percent / 100;
                GasPrice::Legacy(price + buffer)
            }
            GasPrice::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                let fee_buffer = max_fee_per_gas * self.gas_price_buffer_percent / 100;
                let priority_buffer =
                    max_priority_fee_per_gas * self.gas_price_buffer_percent / 100;
                GasPrice::Eip1559 {
                    max_fee_per_gas: max_fee_per_gas + fee_buffer,
                    max_priority_fee_per_gas: max_priority_fee_per_gas + priority_buffer,
                }
            }
        }
    }

    /// Calculate total cost in wei
    pub fn calculate_cost(gas_limit: U256, gas_price: &GasPrice) -> U256 {
        gas_limit * gas_price.effective()
    }
}

impl Default for GasEstimator {
    fn default() -> Self {
        Self::new(20, 10)
    }
}

/// Prices a transfer as source-chain execution plus the destination claim
pub struct GasFeePricing {
    providers: DashMap<String, Arc<ChainProvider>>,
    gas_estimator: GasEstimator,
}

impl GasFeePricing {
    pub fn new(gas_estimator: GasEstimator) -> Self {
        Self {
            providers: DashMap::new(),
            gas_estimator,
        }
    }

    pub fn add_provider(&self, provider: Arc<ChainProvider>) {
        self.providers.insert(provider.key().to_string(), provider);
    }

    fn get_provider(&self, key: &str) -> BridgeResult<Arc<ChainProvider>> {
        self.providers
            .get(key)
            .map(|p| p.clone())
            .ok_or_else(|| BridgeError::ChainNotFound {
                chain: key.to_string(),
            })
    }

    /// Call the bridge would receive on the source chain
    ///
    /// The token address is part of the calldata so ERC-20 transfers are
    /// estimated against the token path of the contract.
    fn bridge_call(bridge_address: &str, request: &FeeRequest) -> BridgeResult<TypedTransaction> {
        let to = if bridge_address.is_empty() {
            request.destination
        } else {
            bridge_address
                .parse::<Address>()
                .map_err(|e| BridgeError::Config(format!("Invalid bridge address: {}", e)))?
        };

        let mut data = id(BRIDGE_SIGNATURE).to_vec();
        data.extend(abi::encode(&[
            AbiToken::Address(request.token),
            AbiToken::Address(request.destination),
        ]));

        Ok(TransactionRequest::new()
            .from(request.destination)
            .to(to)
            .value(U256::zero())
            .data(data)
            .into())
    }
}

#[async_trait]
impl FeePricing for GasFeePricing {
    async fn estimate(&self, request: &FeeRequest) -> BridgeResult<U256> {
        let source = self.get_provider(&request.from)?;
        let destination = self.get_provider(&request.to)?;

        let tx = Self::bridge_call(source.bridge_address(), request)?;
        let gas_limit = self
            .gas_estimator
            .buffered_gas_limit(source.estimate_gas(&tx).await?);
        let source_price = self.gas_estimator.get_gas_price(&source).await?;
        let destination_price = self.gas_estimator.get_gas_price(&destination).await?;

        let fee = total_fee(
            gas_limit,
            &source_price,
            U256::from(destination.claim_gas_limit()),
            &destination_price,
        );

        let balance = source.native_balance(request.destination).await?;
        ensure_affordable(&request.from, balance, fee)
    }
}

/// Source execution at the source gas price plus the claim at the destination gas price
pub fn total_fee(
    gas_limit: U256,
    source_price: &GasPrice,
    claim_gas_limit: U256,
    destination_price: &GasPrice,
) -> U256 {
    GasEstimator::calculate_cost(gas_limit, source_price)
        + GasEstimator::calculate_cost(claim_gas_limit, destination_price)
}

/// The fee, or `InsufficientFunds` when `balance` on `chain` cannot cover it
fn ensure_affordable(chain: &str, balance: U256, fee: U256) -> BridgeResult<U256> {
    if balance < fee {
        return Err(BridgeError::InsufficientFunds {
            chain: chain.to_string(),
            message: format!("balance {} below fee {}", balance, fee),
        });
    }
    Ok(fee)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffers() {
        let estimator = GasEstimator::new(20, 10);
        assert_eq!(estimator.buffered_gas_limit(U256::from(100_000)), U256::from(120_000));
        assert_eq!(
            estimator.buffered_gas_price(GasPrice::Legacy(U256::from(1_000))),
            GasPrice::Legacy(U256::from(1_100))
        );
        assert_eq!(
            estimator.buffered_gas_price(GasPrice::Eip1559 {
                max_fee_per_gas: U256::from(200),
                max_priority_fee_per_gas: U256::from(20),
            }),
            GasPrice::Eip1559 {
                max_fee_per_gas: U256::from(220),
                max_priority_fee_per_gas: U256::from(22),
            }
        );
    }

    #[test]
    fn test_total_fee_prices_claim_on_destination() {
        let fee = total_fee(
            U256::from(60_000),
            &GasPrice::Legacy(U256::from(3)),
            U256::from(40_000),
            &GasPrice::Eip1559 {
                max_fee_per_gas: U256::from(5),
                max_priority_fee_per_gas: U256::from(1),
            },
        );
        assert_eq!(fee, U256::from(380_000));
    }

    #[test]
    fn test_fee_above_balance_is_insufficient_funds() {
        let err = ensure_affordable("ethereum", U256::from(99), U256::from(100)).unwrap_err();
        assert!(err.is_insufficient_funds());
        assert!(matches!(err, BridgeError::InsufficientFunds { ref chain, .. } if chain == "ethereum"));

        assert_eq!(
            ensure_affordable("ethereum", U256::from(100), U256::from(100)),
            Ok(U256::from(100))
        );
    }

    #[test]
    fn test_bridge_call_carries_token() {
        let token = Address::repeat_byte(0x11);
        let destination = Address::repeat_byte(0xaa);
        let bridge = Address::repeat_byte(0x42);
        let request = FeeRequest {
            from: "ethereum".into(),
            to: "gnosis".into(),
            token,
            destination,
        };

        let tx = GasFeePricing::bridge_call(&format!("{:?}", bridge), &request).unwrap();
        assert_eq!(tx.to_addr(), Some(&bridge));
        assert_eq!(tx.from(), Some(&destination));

        let data = tx.data().unwrap();
        assert_eq!(data.len(), 4 + 2 * 32);
        assert_eq!(&data[..4], &id(BRIDGE_SIGNATURE)[..]);
        assert_eq!(&data[16..36], token.as_bytes());
        assert_eq!(&data[48..68], destination.as_bytes());
    }

    #[test]
    fn test_bridge_call_rejects_bad_address() {
        let request = FeeRequest {
            from: "ethereum".into(),
            to: "gnosis".into(),
            token: Address::zero(),
            destination: Address::zero(),
        };
        assert!(matches!(
            GasFeePricing::bridge_call("0xnope", &request),
            Err(BridgeError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_chain() {
        let pricing = GasFeePricing::new(GasEstimator::default());
        let request = FeeRequest {
            from: "ethereum".into(),
            to: "gnosis".into(),
            token: Address::zero(),
            destination: Address::zero(),
        };
        assert!(matches!(
            pricing.estimate(&request).await,
            Err(BridgeError::ChainNotFound { .. })
        ));
    }
}
