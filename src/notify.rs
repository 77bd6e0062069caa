//! Out-of-band notifications and error message parsing

use crate::error::BridgeError;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

lazy_static! {
    static ref REVERT_REASON: Regex =
        Regex::new(r"execution reverted:?\s*([^,)\n]+)").expect("valid regex");
    static ref RPC_MESSAGE: Regex = Regex::new(r"message:\s*([^,)\n]+)").expect("valid regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub severity: Severity,
    pub message: String,
}

/// Fire-and-forget notification channel
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Turns an opaque failure into a human readable message
#[async_trait]
pub trait ErrorParser: Send + Sync {
    async fn parse(&self, error: &BridgeError) -> String;
}

/// Extracts revert reasons and JSON-RPC messages from provider errors
#[derive(Debug, Clone, Copy, Default)]
pub struct RpcErrorParser;

impl RpcErrorParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_text(text: &str) -> String {
        if let Some(caps) = REVERT_REASON.captures(text) {
            return caps[1].trim().to_string();
        }
        if let Some(caps) = RPC_MESSAGE.captures(text) {
            return caps[1].trim().to_string();
        }
        text.to_string()
    }
}

#[async_trait]
impl ErrorParser for RpcErrorParser {
    async fn parse(&self, error: &BridgeError) -> String {
        Self::parse_text(&error.to_string())
    }
}

/// Writes notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Info => info!("{}", notification.message),
            Severity::Warning => warn!("{}", notification.message),
            Severity::Error => error!("{}", notification.message),
        }
    }
}

/// Forwards notifications to a receiver, e.g. a UI toast queue
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, notification: Notification) {
        // Receiver gone means nobody is listening any more
        let _ = self.tx.send(notification);
    }
}
