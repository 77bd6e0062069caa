//! Decides whether the draft may be submitted and what to show the user

use super::draft::Draft;
use crate::fee::FeeFailure;
use crate::task::AsyncTask;
use crate::token::AmountError;

use thiserror::Error;

/// Message surfaced next to the submit action
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    #[error(transparent)]
    Fee(#[from] FeeFailure),

    #[error(transparent)]
    Input(#[from] AmountError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitGate {
    pub enabled: bool,
    pub error: Option<GateError>,
}

impl SubmitGate {
    pub fn evaluate(draft: &Draft) -> Self {
        let amount_error = draft.amount_error();
        let amount_ok = matches!(draft.amount, Some(amount) if !amount.is_zero());
        let enabled = amount_ok && amount_error.is_none() && draft.estimated_fee.is_successful();

        // A failed fee dominates any amount error
        let error = match (&draft.estimated_fee, draft.amount, amount_error) {
            (AsyncTask::Failed(failure), _, _) => Some(GateError::Fee(*failure)),
            (_, Some(_), Some(amount_error)) => Some(GateError::Input(amount_error)),
            _ => None,
        };

        Self { enabled, error }
    }
}
