//! Fee estimation for bridge transfers
//!
//! The estimator is keyed on the fee estimation tuple
//! (source chain, destination chain, token, destination address) and
//! classifies failures into the user-actionable insufficient-funds case and
//! everything else.

mod estimator;
mod gas;

pub use estimator::{FeeEstimator, FeeOutcome};
pub use gas::{GasEstimator, GasFeePricing};

use crate::error::BridgeResult;

use async_trait::async_trait;
use ethers::types::{Address, U256};
use serde::Serialize;
use thiserror::Error;

/// Inputs a fee quote is computed for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeRequest {
    pub from: String,
    pub to: String,
    pub token: Address,
    pub destination: Address,
}

/// Underlying fee pricing computation
#[async_trait]
pub trait FeePricing: Send + Sync {
    /// Fee in the source chain's smallest native unit
    async fn estimate(&self, request: &FeeRequest) -> BridgeResult<U256>;
}

/// Why a fee could not be estimated
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeFailure {
    #[error("insufficient balance to cover fees")]
    InsufficientFunds,

    #[error("failed to estimate fees")]
    Generic,
}

impl FeeFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            FeeFailure::InsufficientFunds => "insufficient_funds",
            FeeFailure::Generic => "generic",
        }
    }
}
