//! Tesseract Bridge - compose a cross-chain transfer from the command line
//!
//! Loads the configured chains, resolves balances and a fee estimate for the
//! default (or `BRIDGE_FROM`) chain pair and prints the finalized transfer
//! when `BRIDGE_AMOUNT` makes the draft submittable.

use anyhow::{Context, Result};
use ethers::types::Address;
use futures::future::join_all;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use tesseract_bridge::chain::{self, ChainRegistry};
use tesseract_bridge::composer::{Column, ComposerEvent, DraftComposer};
use tesseract_bridge::config::Settings;
use tesseract_bridge::environment::Environment;
use tesseract_bridge::fee::{FeeEstimator, GasEstimator, GasFeePricing};
use tesseract_bridge::metrics;
use tesseract_bridge::notify::{RpcErrorParser, TracingSink};
use tesseract_bridge::token::TokenRegistry;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("Starting Tesseract Bridge v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load()?;
    info!(
        "Loaded configuration for {} chains",
        settings.enabled_chains().len()
    );

    let account: Address = settings
        .bridge
        .account
        .parse()
        .context("Invalid bridge account address")?;

    // Connect chains and register them with the fee pricing
    let pricing = GasFeePricing::new(GasEstimator::new(
        settings.bridge.gas_limit_buffer_percent,
        settings.bridge.gas_price_buffer_percent,
    ));
    let connected = chain::connect_chains(&settings).await?;
    let health = join_all(connected.iter().map(|(_, provider)| provider.health_check())).await;

    let mut chains = Vec::new();
    for ((connected_chain, provider), healthy) in connected.into_iter().zip(health) {
        if !healthy {
            warn!("Chain {} is not responding", connected_chain.key);
        }
        pricing.add_provider(provider);
        chains.push(connected_chain);
    }

    let environment = Environment::new(
        ChainRegistry::new(chains)?,
        TokenRegistry::from_config(&settings.tokens)?,
    );
    let estimator = FeeEstimator::new(
        Arc::new(pricing),
        Arc::new(RpcErrorParser::new()),
        Arc::new(TracingSink),
    );

    let composer = DraftComposer::new(
        environment,
        estimator,
        account,
        None,
        settings.bridge.event_capacity,
    )?;
    let mut events = composer.subscribe();
    composer.start().await?;

    if let Ok(from) = env::var("BRIDGE_FROM") {
        composer.select_from_chain(&from).await?;
    }

    tokio::select! {
        settled = wait_until_settled(&mut events) => {
            if !settled {
                warn!("Draft did not settle within {:?}", SETTLE_TIMEOUT);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, stopping...");
            return Ok(());
        }
    }

    if let Ok(amount) = env::var("BRIDGE_AMOUNT") {
        composer.enter_amount(&amount).await?;
    }

    let draft = composer.draft().await;
    info!(
        "Draft {} -> {}: balance {:?} / {:?}, fee {}",
        draft.chains.from().key,
        draft.chains.to().key,
        draft.balance_from,
        draft.balance_to,
        draft.estimated_fee.tag()
    );

    let gate = composer.gate().await;
    if gate.enabled {
        composer
            .submit(|tx| match serde_json::to_string_pretty(&tx) {
                Ok(json) => println!("{}", json),
                Err(e) => error!("Failed to encode transaction: {}", e),
            })
            .await?;
    } else {
        match gate.error {
            Some(reason) => warn!("Cannot submit: {}", reason),
            None => info!("Draft incomplete; set BRIDGE_AMOUNT to submit"),
        }
    }

    debug!("Metrics:\n{}", metrics::render());
    info!("Tesseract Bridge stopped");
    Ok(())
}

/// Wait for the fee and the source balance of the current pair
async fn wait_until_settled(events: &mut broadcast::Receiver<ComposerEvent>) -> bool {
    let mut fee_settled = false;
    let mut balance_settled = false;

    let settle = async {
        while !(fee_settled && balance_settled) {
            match events.recv().await {
                Ok(ComposerEvent::FeeEstimated { .. }) | Ok(ComposerEvent::FeeFailed { .. }) => {
                    fee_settled = true;
                }
                Ok(ComposerEvent::BalanceResolved {
                    column: Column::BalanceFrom,
                    ..
                })
                | Ok(ComposerEvent::BalanceUnresolved {
                    column: Column::BalanceFrom,
                }) => {
                    balance_settled = true;
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Missed {} composer events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    let completed = tokio::time::timeout(SETTLE_TIMEOUT, settle).await.is_ok();
    completed && fee_settled && balance_settled
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tesseract_bridge=debug,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
