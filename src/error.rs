//! Error types for the bridge composer

use thiserror::Error;

/// Main error type for bridge composition
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Chain connection error for chain {chain}: {message}")]
    ChainConnection { chain: String, message: String },

    #[error("Chain {chain} not found")]
    ChainNotFound { chain: String },

    #[error("Token {token} not found")]
    TokenNotFound { token: String },

    #[error("Invalid chain pair: {from} -> {to}")]
    InvalidChainPair { from: String, to: String },

    #[error("Balance fetch error on chain {chain}: {message}")]
    Balance { chain: String, message: String },

    #[error("Gas estimation error: {0}")]
    GasEstimation(String),

    #[error("Insufficient funds on chain {chain}: {message}")]
    InsufficientFunds { chain: String, message: String },

    #[error("Draft is not submittable: {reason}")]
    NotSubmittable { reason: String },

    #[error("Draft has already been finalized")]
    DraftFinalized,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Check if error is the "cannot cover the fee" condition
    pub fn is_insufficient_funds(&self) -> bool {
        matches!(self, BridgeError::InsufficientFunds { .. })
    }

    /// Check if error should be escalated to the notification sink
    pub fn should_notify(&self) -> bool {
        !matches!(
            self,
            BridgeError::InsufficientFunds { .. }
                | BridgeError::NotSubmittable { .. }
                | BridgeError::DraftFinalized
        )
    }

    /// Map a raw RPC failure, keeping insufficient-funds reports distinguishable
    pub fn from_rpc(chain: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        if message.to_lowercase().contains("insufficient funds") {
            BridgeError::InsufficientFunds {
                chain: chain.to_string(),
                message,
            }
        } else {
            BridgeError::GasEstimation(message)
        }
    }
}

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
