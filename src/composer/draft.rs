//! Immutable draft value and its transitions
//!
//! Every transition consumes the draft and returns the next one, so the
//! invalidation rules live in one place.

use super::gate::SubmitGate;
use crate::chain::ChainPair;
use crate::environment::InitialSelection;
use crate::error::{BridgeError, BridgeResult};
use crate::fee::FeeFailure;
use crate::task::AsyncTask;
use crate::token::{AmountError, Token};

use chrono::{DateTime, Utc};
use ethers::types::{Address, U256};
use serde::Serialize;
use uuid::Uuid;

pub type FeeTask = AsyncTask<U256, FeeFailure>;

/// In-progress, not yet submitted transfer
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub chains: ChainPair,
    pub token: Token,
    pub amount: Option<U256>,
    pub balance_from: Option<U256>,
    pub balance_to: Option<U256>,
    /// Error reported by the amount entry itself; only `with_input` sets it
    pub entry_error: Option<AmountError>,
    /// Result of local validation against balance and fee
    pub input_error: Option<AmountError>,
    pub estimated_fee: FeeTask,
}

impl Draft {
    pub fn new(selection: InitialSelection) -> Self {
        Self {
            chains: selection.chains,
            token: selection.token,
            amount: selection.amount,
            balance_from: None,
            balance_to: None,
            entry_error: None,
            input_error: None,
            estimated_fee: AsyncTask::pending(),
        }
    }

    /// New chain pair: amount, error, balances and fee all belong to the old pair
    pub fn with_chains(self, chains: ChainPair) -> Self {
        Self {
            chains,
            amount: None,
            entry_error: None,
            input_error: None,
            balance_from: None,
            balance_to: None,
            estimated_fee: AsyncTask::pending(),
            ..self
        }
    }

    /// New token: the amount was in the old token's smallest unit
    pub fn with_token(self, token: Token) -> Self {
        Self {
            token,
            amount: None,
            entry_error: None,
            input_error: None,
            estimated_fee: AsyncTask::pending(),
            ..self
        }
    }

    /// Balances and fee were computed for another account
    pub fn with_account_changed(self) -> Self {
        Self {
            balance_from: None,
            balance_to: None,
            estimated_fee: AsyncTask::pending(),
            ..self
        }
    }

    /// Amount from the entry widget along with the widget's own error
    ///
    /// Local validation is left to `revalidated`.
    pub fn with_input(self, amount: Option<U256>, entry_error: Option<AmountError>) -> Self {
        Self {
            amount,
            entry_error,
            input_error: None,
            ..self
        }
    }

    pub fn with_balance_from(self, balance_from: Option<U256>) -> Self {
        Self {
            balance_from,
            ..self
        }
    }

    pub fn with_balance_to(self, balance_to: Option<U256>) -> Self {
        Self { balance_to, ..self }
    }

    pub fn with_fee(self, estimated_fee: FeeTask) -> Self {
        Self {
            estimated_fee,
            ..self
        }
    }

    /// Re-run local validation of the current amount; `entry_error` is untouched
    pub fn revalidated(self) -> Self {
        let input_error = self.amount.and_then(|amount| {
            validate_amount(amount, &self.token, self.balance_from, &self.estimated_fee)
        });
        Self {
            input_error,
            ..self
        }
    }

    /// Error blocking the current amount, the entry's own error first
    pub fn amount_error(&self) -> Option<AmountError> {
        self.entry_error.or(self.input_error)
    }

    /// Build the record handed to the submission callback
    pub fn finalize(&self, destination: Address) -> BridgeResult<FinalizedTransaction> {
        let gate = SubmitGate::evaluate(self);
        if !gate.enabled {
            return Err(BridgeError::NotSubmittable {
                reason: gate
                    .error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "draft incomplete".to_string()),
            });
        }

        match (self.amount, &self.estimated_fee) {
            (Some(amount), AsyncTask::Successful(fee)) => Ok(FinalizedTransaction {
                id: Uuid::new_v4(),
                token: self.token.clone(),
                from: self.chains.from().key.clone(),
                from_network_id: self.chains.from().network_id,
                to: self.chains.to().key.clone(),
                to_network_id: self.chains.to().network_id,
                amount,
                estimated_fee: *fee,
                destination,
                created_at: Utc::now(),
            }),
            _ => Err(BridgeError::NotSubmittable {
                reason: "draft incomplete".to_string(),
            }),
        }
    }
}

/// Local amount checks
///
/// Balance and fee only bound the native token; balance is skipped while
/// unresolved and the fee while it is not known.
pub fn validate_amount(
    amount: U256,
    token: &Token,
    balance_from: Option<U256>,
    fee: &FeeTask,
) -> Option<AmountError> {
    if amount.is_zero() {
        return Some(AmountError::Zero);
    }

    if !token.native {
        return None;
    }

    let balance = balance_from?;
    let fee = fee.data().copied().unwrap_or_default();
    match amount.checked_add(fee) {
        Some(required) if required <= balance => None,
        _ => Some(AmountError::ExceedsBalance),
    }
}

/// A fully resolved transfer, ready for the submission collaborator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalizedTransaction {
    pub id: Uuid,
    pub token: Token,
    pub from: String,
    pub from_network_id: u64,
    pub to: String,
    pub to_network_id: u64,
    pub amount: U256,
    pub estimated_fee: U256,
    pub destination: Address,
    pub created_at: DateTime<Utc>,
}
