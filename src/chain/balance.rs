//! Per-chain balance resolution
//!
//! Balances are advisory: a failed fetch leaves the value unresolved and is
//! never escalated or retried.

use super::Chain;

use ethers::types::{Address, U256};
use tracing::{debug, warn};

/// Resolves an account's balance on one chain at a time
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceResolver;

impl BalanceResolver {
    pub fn new() -> Self {
        Self
    }

    /// Fetch the balance, or `None` when it cannot be resolved
    pub async fn resolve(&self, chain: &Chain, account: Address) -> Option<U256> {
        match chain.balances.get_balance(account).await {
            Ok(balance) => {
                debug!("Balance of {:?} on {}: {}", account, chain.key, balance);
                Some(balance)
            }
            Err(e) => {
                warn!("Balance unresolved for {:?} on {}: {}", account, chain.key, e);
                crate::metrics::record_balance_failure(&chain.key);
                None
            }
        }
    }
}
