//! Async state machine behind the transfer form

use super::draft::Draft;
use super::gate::SubmitGate;
use super::picker::Picker;
use super::{Column, ComposerEvent, FinalizedTransaction};
use crate::chain::{BalanceResolver, Chain};
use crate::environment::{Environment, PriorTransaction};
use crate::error::{BridgeError, BridgeResult};
use crate::fee::{FeeEstimator, FeeOutcome, FeeRequest};
use crate::task::AsyncTask;
use crate::token::{AmountError, Token};

use ethers::types::{Address, U256};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

const ALL_COLUMNS: [Column; 3] = [Column::BalanceFrom, Column::BalanceTo, Column::Fee];

/// Mutable side of the composer, only touched under its lock
struct ComposerState {
    draft: Draft,
    account: Address,
    /// Last issued request id, monotonic across all columns
    last_request_id: u64,
    balance_from_request: u64,
    balance_to_request: u64,
    fee_request: u64,
    finalized: bool,
}

impl ComposerState {
    fn apply(&mut self, transition: impl FnOnce(Draft) -> Draft) {
        self.draft = transition(self.draft.clone());
    }

    fn current_request(&self, column: Column) -> u64 {
        match column {
            Column::BalanceFrom => self.balance_from_request,
            Column::BalanceTo => self.balance_to_request,
            Column::Fee => self.fee_request,
        }
    }

    fn fee_request_params(&self) -> FeeRequest {
        FeeRequest {
            from: self.draft.chains.from().key.clone(),
            to: self.draft.chains.to().key.clone(),
            token: self.draft.token.address,
            destination: self.account,
        }
    }

    /// Supersede in-flight lookups for `columns` and describe their replacements
    fn reissue(&mut self, columns: &[Column]) -> Dispatch {
        let mut dispatch = Dispatch::default();

        for &column in columns {
            self.last_request_id += 1;
            let request_id = self.last_request_id;

            match column {
                Column::BalanceFrom => {
                    self.balance_from_request = request_id;
                    dispatch.balances.push(BalanceLookup {
                        column,
                        request_id,
                        chain: self.draft.chains.from().clone(),
                        account: self.account,
                    });
                }
                Column::BalanceTo => {
                    self.balance_to_request = request_id;
                    dispatch.balances.push(BalanceLookup {
                        column,
                        request_id,
                        chain: self.draft.chains.to().clone(),
                        account: self.account,
                    });
                }
                Column::Fee => {
                    self.fee_request = request_id;
                    dispatch.fee = Some(FeeLookup {
                        request_id,
                        request: self.fee_request_params(),
                    });
                }
            }
        }

        dispatch
    }
}

#[derive(Default)]
struct Dispatch {
    balances: Vec<BalanceLookup>,
    fee: Option<FeeLookup>,
}

struct BalanceLookup {
    column: Column,
    request_id: u64,
    chain: Chain,
    account: Address,
}

struct FeeLookup {
    request_id: u64,
    request: FeeRequest,
}

struct Inner {
    state: RwLock<ComposerState>,
    environment: Environment,
    fee_estimator: FeeEstimator,
    balance_resolver: BalanceResolver,
    events: broadcast::Sender<ComposerEvent>,
}

impl Inner {
    fn publish(&self, event: ComposerEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn drop_stale(&self, column: Column, request_id: u64) {
        debug!("Dropping stale {} completion for request {}", column.as_str(), request_id);
        crate::metrics::record_stale_completion(column.as_str());
        self.publish(ComposerEvent::StaleCompletionDropped { column, request_id });
    }

    async fn complete_balance(&self, column: Column, request_id: u64, balance: Option<U256>) {
        {
            let mut state = self.state.write().await;
            if state.finalized || state.current_request(column) != request_id {
                drop(state);
                self.drop_stale(column, request_id);
                return;
            }

            match column {
                Column::BalanceFrom => {
                    state.apply(|draft| draft.with_balance_from(balance).revalidated())
                }
                _ => state.apply(|draft| draft.with_balance_to(balance)),
            }
        }

        self.publish(match balance {
            Some(balance) => ComposerEvent::BalanceResolved { column, balance },
            None => ComposerEvent::BalanceUnresolved { column },
        });
    }

    async fn complete_fee(&self, request_id: u64, outcome: FeeOutcome) {
        {
            let mut state = self.state.write().await;
            if state.finalized || state.fee_request != request_id {
                drop(state);
                self.drop_stale(Column::Fee, request_id);
                return;
            }

            let fee = outcome.fee.clone();
            state.apply(|draft| draft.with_fee(fee).revalidated());
        }

        match outcome.fee {
            AsyncTask::Successful(fee) => self.publish(ComposerEvent::FeeEstimated { fee }),
            AsyncTask::Failed(failure) => self.publish(ComposerEvent::FeeFailed { failure }),
            AsyncTask::Pending => {}
        }

        if let Some(e) = outcome.escalation {
            self.fee_estimator.escalate(e).await;
        }
    }
}

/// Start the lookups described by `dispatch`; completions report back through `inner`
fn dispatch(inner: &Arc<Inner>, dispatch: Dispatch) {
    for lookup in dispatch.balances {
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            let balance = inner
                .balance_resolver
                .resolve(&lookup.chain, lookup.account)
                .await;
            inner
                .complete_balance(lookup.column, lookup.request_id, balance)
                .await;
        });
    }

    if let Some(lookup) = dispatch.fee {
        crate::metrics::record_fee_started(&lookup.request.from, &lookup.request.to);
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            let outcome = inner.fee_estimator.estimate(&lookup.request).await;
            inner.complete_fee(lookup.request_id, outcome).await;
        });
    }
}

/// Composes a bridge transfer from concurrently resolving inputs
#[derive(Clone)]
pub struct DraftComposer {
    inner: Arc<Inner>,
}

impl DraftComposer {
    /// Create a composer seeded from a prior transaction or environment defaults
    ///
    /// Nothing is fetched until `start` is called.
    pub fn new(
        environment: Environment,
        fee_estimator: FeeEstimator,
        account: Address,
        prior: Option<&PriorTransaction>,
        event_capacity: usize,
    ) -> BridgeResult<Self> {
        let draft = Draft::new(environment.initial(prior)?);
        info!(
            "Composing {} transfer {} -> {} for {:?}",
            draft.token.symbol,
            draft.chains.from().key,
            draft.chains.to().key,
            account
        );

        let (events, _) = broadcast::channel(event_capacity.max(1));

        let state = ComposerState {
            draft,
            account,
            last_request_id: 0,
            balance_from_request: 0,
            balance_to_request: 0,
            fee_request: 0,
            finalized: false,
        };

        Ok(Self {
            inner: Arc::new(Inner {
                state: RwLock::new(state),
                environment,
                fee_estimator,
                balance_resolver: BalanceResolver::new(),
                events,
            }),
        })
    }

    /// Fetch both balances and the first fee estimate
    pub async fn start(&self) -> BridgeResult<()> {
        self.transition(&ALL_COLUMNS, |state| {
            state.apply(|draft| draft.with_account_changed());
            Ok(true)
        })
        .await
    }

    /// Apply a state change and re-dispatch `columns` if it changed anything
    ///
    /// The reset to pending happens under the lock, before any lookup is spawned.
    async fn transition<F>(&self, columns: &[Column], change: F) -> BridgeResult<()>
    where
        F: FnOnce(&mut ComposerState) -> BridgeResult<bool>,
    {
        let pending = {
            let mut state = self.inner.state.write().await;
            if state.finalized {
                return Err(BridgeError::DraftFinalized);
            }
            if !change(&mut state)? {
                return Ok(());
            }
            state.reissue(columns)
        };

        dispatch(&self.inner, pending);
        Ok(())
    }

    /// Select a new source chain; the destination is re-derived to differ from it
    pub async fn select_from_chain(&self, key: &str) -> BridgeResult<()> {
        let registry = &self.inner.environment.chains;
        self.transition(&ALL_COLUMNS, |state| {
            if state.draft.chains.from().key == key {
                return Ok(false);
            }
            let chains = registry.pair_for_source(key, &state.draft.chains)?;
            debug!("Chain pair now {} -> {}", chains.from().key, chains.to().key);
            state.apply(|draft| draft.with_chains(chains));
            Ok(true)
        })
        .await
    }

    /// Exchange source and destination
    pub async fn swap_chains(&self) -> BridgeResult<()> {
        self.transition(&ALL_COLUMNS, |state| {
            let chains = state.draft.chains.swapped();
            debug!("Chain pair swapped to {} -> {}", chains.from().key, chains.to().key);
            state.apply(|draft| draft.with_chains(chains));
            Ok(true)
        })
        .await
    }

    pub async fn select_token(&self, address: Address) -> BridgeResult<()> {
        let token = self.inner.environment.tokens.get(&address)?.clone();
        self.transition(&[Column::Fee], |state| {
            if state.draft.token.address == token.address {
                return Ok(false);
            }
            debug!("Token now {}", token.symbol);
            state.apply(|draft| draft.with_token(token));
            Ok(true)
        })
        .await
    }

    /// Switch the connected account; balances and fee are fetched again
    pub async fn set_account(&self, account: Address) -> BridgeResult<()> {
        self.transition(&ALL_COLUMNS, |state| {
            if state.account == account {
                return Ok(false);
            }
            state.account = account;
            state.apply(|draft| draft.with_account_changed());
            Ok(true)
        })
        .await
    }

    /// Amount-entry callback: a parsed amount and the entry widget's own error
    pub async fn on_input_change(
        &self,
        amount: Option<U256>,
        error: Option<AmountError>,
    ) -> BridgeResult<()> {
        self.transition(&[], |state| {
            state.apply(|draft| draft.with_input(amount, error).revalidated());
            Ok(true)
        })
        .await
    }

    /// Parse typed text with the selected token's decimals, then validate
    ///
    /// Parsed under the state lock, against the token the amount is stored with.
    pub async fn enter_amount(&self, text: &str) -> BridgeResult<()> {
        self.transition(&[], |state| {
            let (amount, error) = match state.draft.token.parse_amount(text) {
                Ok(amount) => (Some(amount), None),
                Err(e) => (None, Some(e)),
            };
            state.apply(|draft| draft.with_input(amount, error).revalidated());
            Ok(true)
        })
        .await
    }

    /// Open the chain picker and apply the chosen source chain
    pub async fn pick_from_chain(&self, picker: &dyn Picker<Chain>) -> BridgeResult<()> {
        let options = self.inner.environment.chains.all().to_vec();
        match picker.pick(&options).await {
            Some(chain) => self.select_from_chain(&chain.key).await,
            None => Ok(()),
        }
    }

    /// Open the token picker and apply the chosen token
    pub async fn pick_token(&self, picker: &dyn Picker<Token>) -> BridgeResult<()> {
        let options = self.inner.environment.tokens.all().to_vec();
        match picker.pick(&options).await {
            Some(token) => self.select_token(token.address).await,
            None => Ok(()),
        }
    }

    /// Finalize the draft and hand it to `on_submit`
    ///
    /// One-shot: afterwards every mutation fails with `DraftFinalized`.
    pub async fn submit<F>(&self, on_submit: F) -> BridgeResult<()>
    where
        F: FnOnce(FinalizedTransaction),
    {
        let finalized = {
            let mut state = self.inner.state.write().await;
            if state.finalized {
                return Err(BridgeError::DraftFinalized);
            }
            let finalized = state.draft.finalize(state.account)?;
            state.finalized = true;
            finalized
        };

        info!(
            "Draft {} finalized: {} {} -> {}",
            finalized.id,
            finalized.token.format_amount(finalized.amount),
            finalized.from,
            finalized.to
        );
        crate::metrics::record_finalized(&finalized.from, &finalized.to);
        self.inner
            .publish(ComposerEvent::Finalized { id: finalized.id });

        on_submit(finalized);
        Ok(())
    }

    /// Snapshot of the current draft
    pub async fn draft(&self) -> Draft {
        self.inner.state.read().await.draft.clone()
    }

    pub async fn gate(&self) -> SubmitGate {
        SubmitGate::evaluate(&self.inner.state.read().await.draft)
    }

    pub async fn account(&self) -> Address {
        self.inner.state.read().await.account
    }

    pub async fn is_finalized(&self) -> bool {
        self.inner.state.read().await.finalized
    }

    pub fn environment(&self) -> &Environment {
        &self.inner.environment
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ComposerEvent> {
        self.inner.events.subscribe()
    }
}
