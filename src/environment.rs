//! Configured chains and tokens, used once to seed a draft

use crate::chain::{ChainPair, ChainRegistry};
use crate::error::BridgeResult;
use crate::token::{Token, TokenRegistry};

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

/// A transaction being edited or resubmitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorTransaction {
    pub from: String,
    pub to: String,
    pub token: Address,
    pub amount: Option<U256>,
}

/// Where the draft starts
#[derive(Debug, Clone)]
pub struct InitialSelection {
    pub chains: ChainPair,
    pub token: Token,
    pub amount: Option<U256>,
}

#[derive(Debug, Clone)]
pub struct Environment {
    pub chains: ChainRegistry,
    pub tokens: TokenRegistry,
}

impl Environment {
    pub fn new(chains: ChainRegistry, tokens: TokenRegistry) -> Self {
        Self { chains, tokens }
    }

    /// First two configured chains and the native token
    pub fn defaults(&self) -> BridgeResult<InitialSelection> {
        Ok(InitialSelection {
            chains: self.chains.default_pair()?,
            token: self.tokens.native().clone(),
            amount: None,
        })
    }

    /// Selection restored from a prior transaction
    pub fn restore(&self, prior: &PriorTransaction) -> BridgeResult<InitialSelection> {
        let from = self.chains.get(&prior.from)?.clone();
        let to = self.chains.get(&prior.to)?.clone();

        Ok(InitialSelection {
            chains: ChainPair::new(from, to)?,
            token: self.tokens.get(&prior.token)?.clone(),
            amount: prior.amount,
        })
    }

    pub fn initial(&self, prior: Option<&PriorTransaction>) -> BridgeResult<InitialSelection> {
        match prior {
            Some(prior) => self.restore(prior),
            None => self.defaults(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::chain::tests::chain;
    use crate::error::BridgeError;

    pub(crate) fn native() -> Token {
        Token {
            address: Address::zero(),
            symbol: "ETH".into(),
            name: "Ether".into(),
            decimals: 18,
            native: true,
            logo_uri: None,
        }
    }

    pub(crate) fn usdc() -> Token {
        Token {
            address: Address::repeat_byte(0x11),
            symbol: "USDC".into(),
            name: "USD Coin".into(),
            decimals: 6,
            native: false,
            logo_uri: None,
        }
    }

    fn environment() -> Environment {
        Environment::new(
            ChainRegistry::new(vec![chain("ethereum", 1), chain("gnosis", 100)]).unwrap(),
            TokenRegistry::new(vec![usdc(), native()]).unwrap(),
        )
    }

    #[test]
    fn test_defaults() {
        let selection = environment().initial(None).unwrap();
        assert_eq!(selection.chains.from().key, "ethereum");
        assert_eq!(selection.chains.to().key, "gnosis");
        assert_eq!(selection.token, native());
        assert_eq!(selection.amount, None);
    }

    #[test]
    fn test_restore_prior() {
        let prior = PriorTransaction {
            from: "gnosis".into(),
            to: "ethereum".into(),
            token: usdc().address,
            amount: Some(U256::from(5_000_000u64)),
        };
        let selection = environment().initial(Some(&prior)).unwrap();
        assert_eq!(selection.chains.from().key, "gnosis");
        assert_eq!(selection.token.symbol, "USDC");
        assert_eq!(selection.amount, Some(U256::from(5_000_000u64)));
    }

    #[test]
    fn test_restore_rejects_same_chain() {
        let prior = PriorTransaction {
            from: "gnosis".into(),
            to: "gnosis".into(),
            token: Address::zero(),
            amount: None,
        };
        assert!(matches!(
            environment().restore(&prior),
            Err(BridgeError::InvalidChainPair { .. })
        ));
    }
}
