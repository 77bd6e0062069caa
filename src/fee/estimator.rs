//! Fee estimator with failure classification

use super::{FeeFailure, FeePricing, FeeRequest};
use crate::error::BridgeError;
use crate::notify::{ErrorParser, Notification, NotificationSink, Severity};
use crate::task::AsyncTask;

use ethers::types::U256;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Result of one estimation run
#[derive(Debug, Clone, PartialEq)]
pub struct FeeOutcome {
    pub fee: AsyncTask<U256, FeeFailure>,
    /// Failure to report out of band, if any
    pub escalation: Option<BridgeError>,
}

/// Runs the fee pricing computation and classifies its failures
pub struct FeeEstimator {
    pricing: Arc<dyn FeePricing>,
    parser: Arc<dyn ErrorParser>,
    sink: Arc<dyn NotificationSink>,
}

impl FeeEstimator {
    pub fn new(
        pricing: Arc<dyn FeePricing>,
        parser: Arc<dyn ErrorParser>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            pricing,
            parser,
            sink,
        }
    }

    /// Estimate the fee for a request
    ///
    /// Never fails: every error becomes a failed task.
    pub async fn estimate(&self, request: &FeeRequest) -> FeeOutcome {
        match self.pricing.estimate(request).await {
            Ok(fee) => {
                debug!("Fee for {} -> {}: {}", request.from, request.to, fee);
                crate::metrics::record_fee_succeeded(&request.from);
                FeeOutcome {
                    fee: AsyncTask::successful(fee),
                    escalation: None,
                }
            }
            Err(e) => Self::classify(request, e),
        }
    }

    fn classify(request: &FeeRequest, e: BridgeError) -> FeeOutcome {
        let failure = if e.is_insufficient_funds() {
            info!("Insufficient funds to cover fees on {}: {}", request.from, e);
            FeeFailure::InsufficientFunds
        } else {
            error!("Fee estimation failed for {} -> {}: {}", request.from, request.to, e);
            FeeFailure::Generic
        };
        crate::metrics::record_fee_failed(&request.from, failure.kind());

        FeeOutcome {
            fee: AsyncTask::failed(failure),
            escalation: e.should_notify().then_some(e),
        }
    }

    /// Parse the failure and hand it to the notification sink
    pub async fn escalate(&self, e: BridgeError) {
        let message = self.parser.parse(&e).await;
        self.sink.notify(Notification {
            severity: Severity::Error,
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeResult;
    use crate::notify::{ChannelSink, RpcErrorParser};
    use async_trait::async_trait;
    use ethers::types::Address;

    struct FixedPricing(BridgeResult<U256>);

    #[async_trait]
    impl FeePricing for FixedPricing {
        async fn estimate(&self, _request: &FeeRequest) -> BridgeResult<U256> {
            self.0.clone()
        }
    }

    fn request() -> FeeRequest {
        FeeRequest {
            from: "ethereum".into(),
            to: "gnosis".into(),
            token: Address::zero(),
            destination: Address::repeat_byte(0xaa),
        }
    }

    fn estimator(result: BridgeResult<U256>) -> (FeeEstimator, tokio::sync::mpsc::UnboundedReceiver<Notification>) {
        let (sink, rx) = ChannelSink::new();
        let estimator = FeeEstimator::new(
            Arc::new(FixedPricing(result)),
            Arc::new(RpcErrorParser::new()),
            Arc::new(sink),
        );
        (estimator, rx)
    }

    #[tokio::test]
    async fn test_success() {
        let (estimator, _rx) = estimator(Ok(U256::from(1000)));
        let outcome = estimator.estimate(&request()).await;
        assert_eq!(outcome.fee, AsyncTask::Successful(U256::from(1000)));
        assert!(outcome.escalation.is_none());
    }

    #[tokio::test]
    async fn test_insufficient_funds_is_not_escalated() {
        let (estimator, _rx) = estimator(Err(BridgeError::InsufficientFunds {
            chain: "ethereum".into(),
            message: "insufficient funds for gas".into(),
        }));
        let outcome = estimator.estimate(&request()).await;
        assert_eq!(outcome.fee, AsyncTask::Failed(FeeFailure::InsufficientFunds));
        assert_eq!(
            outcome.fee.error().unwrap().to_string(),
            "insufficient balance to cover fees"
        );
        assert!(outcome.escalation.is_none());
    }

    #[tokio::test]
    async fn test_generic_failure_is_escalated() {
        let (estimator, mut rx) = estimator(Err(BridgeError::GasEstimation(
            "execution reverted: bridge paused".into(),
        )));
        let outcome = estimator.estimate(&request()).await;
        assert_eq!(outcome.fee, AsyncTask::Failed(FeeFailure::Generic));

        estimator.escalate(outcome.escalation.unwrap()).await;
        let notification = rx.recv().await.unwrap();
        assert_eq!(notification.severity, Severity::Error);
        assert_eq!(notification.message, "bridge paused");
    }
}
