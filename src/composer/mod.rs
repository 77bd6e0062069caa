//! Draft composition for cross-chain transfers
//!
//! The composer:
//! 1. Owns the selected chains, token, amount, balances and fee estimate
//! 2. Resets dependent state synchronously whenever an input changes
//! 3. Dispatches balance and fee lookups and applies only current completions
//! 4. Hands a finalized transaction to the caller once the submit gate opens

pub mod draft;
pub mod engine;
pub mod gate;
pub mod picker;


pub use draft::{validate_amount, Draft, FeeTask, FinalizedTransaction};
pub use engine::DraftComposer;
pub use gate::{GateError, SubmitGate};
pub use picker::Picker;

use crate::fee::FeeFailure;

use ethers::types::U256;
use serde::Serialize;
use uuid::Uuid;

/// Independently resolving parts of the draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    BalanceFrom,
    BalanceTo,
    Fee,
}

impl Column {
    pub fn as_str(&self) -> &'static str {
        match self {
            Column::BalanceFrom => "balance_from",
            Column::BalanceTo => "balance_to",
            Column::Fee => "fee",
        }
    }
}

/// Changes published by the composer
#[derive(Debug, Clone, PartialEq)]
pub enum ComposerEvent {
    BalanceResolved { column: Column, balance: U256 },
    BalanceUnresolved { column: Column },
    FeeEstimated { fee: U256 },
    FeeFailed { failure: FeeFailure },
    StaleCompletionDropped { column: Column, request_id: u64 },
    Finalized { id: Uuid },
}
