//! Token registry and decimal amount handling

use crate::config::{TokenConfig, MAX_TOKEN_DECIMALS};
use crate::error::{BridgeError, BridgeResult};

use ethers::types::{Address, U256};
use ethers::utils::{format_units, parse_units};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

lazy_static! {
    static ref DECIMAL_AMOUNT: Regex = Regex::new(r"^(\d+)(?:\.(\d*))?$").expect("valid regex");
}

/// A bridgeable token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub name: String,
    /// Precision used when parsing and formatting amounts
    pub decimals: u8,
    pub native: bool,
    pub logo_uri: Option<String>,
}

impl Token {
    pub fn from_config(config: &TokenConfig) -> BridgeResult<Self> {
        let address = config.address.parse::<Address>().map_err(|e| {
            BridgeError::Config(format!("Invalid address for token {}: {}", config.symbol, e))
        })?;

        Ok(Self {
            address,
            symbol: config.symbol.clone(),
            name: config.name.clone(),
            decimals: config.decimals,
            native: config.native,
            logo_uri: config.logo_uri.clone(),
        })
    }

    /// Parse user text into the token's smallest unit
    pub fn parse_amount(&self, text: &str) -> Result<U256, AmountError> {
        parse_amount(text, self.decimals)
    }

    /// Human readable amount, for logs
    pub fn format_amount(&self, amount: U256) -> String {
        format_units(amount, self.decimals as u32).unwrap_or_else(|_| amount.to_string())
    }
}

/// Local amount validation failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountError {
    #[error("invalid amount")]
    Invalid,

    #[error("too many decimal places")]
    TooPrecise,

    #[error("amount must be greater than zero")]
    Zero,

    #[error("insufficient balance")]
    ExceedsBalance,
}

/// Parse a non-negative decimal string with at most `decimals` fractional digits
pub fn parse_amount(text: &str, decimals: u8) -> Result<U256, AmountError> {
    let caps = DECIMAL_AMOUNT
        .captures(text.trim())
        .ok_or(AmountError::Invalid)?;

    let whole = caps[1].trim_start_matches('0');
    let fraction = caps.get(2).map(|m| m.as_str()).unwrap_or("");

    if fraction.len() > decimals as usize {
        return Err(AmountError::TooPrecise);
    }
    // Anything wider than 77 digits no longer fits in 256 bits
    if whole.len() + decimals as usize > MAX_TOKEN_DECIMALS as usize {
        return Err(AmountError::Invalid);
    }

    let normalized = if fraction.is_empty() {
        format!("0{}", whole)
    } else {
        format!("0{}.{}", whole, fraction)
    };

    parse_units(normalized, decimals as u32)
        .map(U256::from)
        .map_err(|_| AmountError::Invalid)
}

/// Token registry loaded from configuration
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    tokens: Vec<Token>,
}

impl TokenRegistry {
    pub fn new(tokens: Vec<Token>) -> BridgeResult<Self> {
        if tokens.iter().filter(|t| t.native).count() != 1 {
            return Err(BridgeError::Config(
                "Token registry needs exactly one native token".to_string(),
            ));
        }
        Ok(Self { tokens })
    }

    pub fn from_config(configs: &[TokenConfig]) -> BridgeResult<Self> {
        let tokens = configs
            .iter()
            .map(Token::from_config)
            .collect::<BridgeResult<Vec<_>>>()?;
        Self::new(tokens)
    }

    /// The chain's native token
    pub fn native(&self) -> &Token {
        // Presence is checked in `new`
        self.tokens
            .iter()
            .find(|t| t.native)
            .unwrap_or(&self.tokens[0])
    }

    pub fn get(&self, address: &Address) -> BridgeResult<&Token> {
        self.tokens
            .iter()
            .find(|t| &t.address == address)
            .ok_or_else(|| BridgeError::TokenNotFound {
                token: format!("{:?}", address),
            })
    }

    pub fn all(&self) -> &[Token] {
        &self.tokens
    }
}
