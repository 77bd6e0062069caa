//! Tesseract Bridge - cross-chain transfer composition
//!
//! Reconciles chain balances, an asynchronously computed fee estimate and
//! user input into a single submittable transfer draft.

pub mod chain;
pub mod composer;
pub mod config;
pub mod environment;
pub mod error;
pub mod fee;
pub mod metrics;
pub mod notify;
pub mod task;
pub mod token;

pub use composer::{ComposerEvent, Draft, DraftComposer, FinalizedTransaction, SubmitGate};
pub use error::{BridgeError, BridgeResult};
pub use task::AsyncTask;
