//! Bridge form controller
//!
//! [`BridgeController`] owns the whole form state. Background work (token
//! list loads, debounced quotes and searches, balance polling, history
//! polling, wallet notifications) reports back as [`AppEvent`]s on a single
//! channel, and the controller applies each one in [`BridgeController::handle_event`].
//! Results from superseded work are recognised by their tags and dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::amount::{from_raw_amount, parse_raw};
use crate::api::AggregatorApi;
use crate::balance::{BalanceCache, BalanceProbe, BalanceUpdate, ProbeTarget};
use crate::catalog::{default_chains, filter_chains, filter_tokens, CatalogLoader, TokenList};
use crate::config::Config;
use crate::error::{BridgeError, CONNECTIVITY_MESSAGE};
use crate::history::{spawn_ticker, HistoryTracker};
use crate::prefs::{SavedRecipients, Settings};
use crate::quote::{QuoteEngine, QuoteInputs, QuoteResult, QuoteState};
use crate::search::{SearchResult, TokenSearch};
use crate::store::KeyValueStore;
use crate::submit::{self, SubmitContext, SubmitOutcome};
use crate::types::{Chain, Side, Token};
use crate::wallet::{self, WalletEvent, WalletProvider, WalletState};

/// Fraction digits kept when a quoted output becomes the new input amount
const REVERSE_AMOUNT_DIGITS: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Bridge,
    History,
}

/// One half of the form.
#[derive(Debug, Clone, Default)]
pub struct SideState {
    pub chain: Option<Chain>,
    pub token: Option<Token>,
    pub tokens: Vec<Token>,
    /// Tag of the token-list load in flight
    pub loading: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub chains: Vec<Chain>,
    pub from: SideState,
    pub to: SideState,
    pub amount: String,
    pub recipient: String,
    pub wallet: WalletState,
    pub view: View,
    /// User-facing error banner
    pub error: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            chains: Vec::new(),
            from: SideState::default(),
            to: SideState::default(),
            amount: String::new(),
            recipient: String::new(),
            wallet: WalletState::default(),
            view: View::Bridge,
            error: None,
        }
    }
}

impl AppState {
    pub fn side(&self, side: Side) -> &SideState {
        match side {
            Side::From => &self.from,
            Side::To => &self.to,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut SideState {
        match side {
            Side::From => &mut self.from,
            Side::To => &mut self.to,
        }
    }

    fn quote_inputs(&self) -> QuoteInputs {
        QuoteInputs {
            from_chain: self.from.chain.as_ref().map(|c| c.id),
            to_chain: self.to.chain.as_ref().map(|c| c.id),
            from_token: self.from.token.clone(),
            to_token: self.to.token.clone(),
            amount: self.amount.clone(),
            wallet: if self.wallet.connected {
                self.wallet.address.clone()
            } else {
                None
            },
            recipient: Some(self.recipient.clone()),
        }
    }
}

/// Results of background work, applied by the controller.
#[derive(Debug)]
pub enum AppEvent {
    Quote(QuoteResult),
    Tokens {
        tag: u64,
        chain_id: u64,
        result: Result<TokenList, BridgeError>,
    },
    Search {
        side: Side,
        result: SearchResult,
    },
    Balance(BalanceUpdate),
    HistoryTick,
    Wallet(WalletEvent),
}

pub struct BridgeController {
    api: Arc<dyn AggregatorApi>,
    provider: Arc<dyn WalletProvider>,
    catalog: CatalogLoader,
    store: Arc<dyn KeyValueStore>,
    state: AppState,
    quotes: QuoteEngine,
    from_search: TokenSearch,
    to_search: TokenSearch,
    balances: BalanceCache,
    probe: BalanceProbe,
    history: HistoryTracker,
    history_poll: Duration,
    history_ticker: Option<JoinHandle<()>>,
    recipients: SavedRecipients,
    settings: Settings,
    wallet_listener: Option<JoinHandle<()>>,
    next_load_tag: u64,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl BridgeController {
    pub fn new(
        config: &Config,
        api: Arc<dyn AggregatorApi>,
        provider: Arc<dyn WalletProvider>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let catalog = CatalogLoader::new(api.clone());

        let tx = events_tx.clone();
        let quotes = QuoteEngine::new(
            api.clone(),
            config.quote_debounce(),
            Arc::new(move |result: QuoteResult| {
                let _ = tx.send(AppEvent::Quote(result));
            }),
        );

        let search = |side: Side| {
            let tx = events_tx.clone();
            TokenSearch::new(
                catalog.clone(),
                config.search_debounce(),
                Arc::new(move |result: SearchResult| {
                    let _ = tx.send(AppEvent::Search { side, result });
                }),
            )
        };
        let from_search = search(Side::From);
        let to_search = search(Side::To);

        let tx = events_tx.clone();
        let probe = BalanceProbe::new(
            api.clone(),
            config.balance_poll_interval(),
            Arc::new(move |update: BalanceUpdate| tx.send(AppEvent::Balance(update)).is_ok()),
        );

        let history = HistoryTracker::load(store.clone());
        let recipients = SavedRecipients::load(store.as_ref());
        let settings = Settings::load(store.as_ref());

        Self {
            api,
            provider,
            catalog,
            store,
            state: AppState::default(),
            quotes,
            from_search,
            to_search,
            balances: BalanceCache::default(),
            probe,
            history,
            history_poll: config.history_poll_interval(),
            history_ticker: None,
            recipients,
            settings,
            wallet_listener: None,
            next_load_tag: 0,
            events_tx,
            events_rx,
        }
    }

    /// Load the chain catalog and preselect the default chains.
    pub async fn init(&mut self) -> Result<(), BridgeError> {
        let chains = match self.catalog.load_chains().await {
            Ok(chains) => chains,
            Err(e) => {
                self.state.error = Some(CONNECTIVITY_MESSAGE.to_string());
                return Err(e);
            }
        };
        let (from, to) = default_chains(&chains);
        self.state.chains = chains;
        self.state.error = None;

        if let Some(chain) = from {
            self.load_side(Side::From, chain);
        }
        if let Some(chain) = to {
            self.load_side(Side::To, chain);
        }
        Ok(())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn quote_state(&self) -> &QuoteState {
        self.quotes.state()
    }

    pub fn history(&self) -> &HistoryTracker {
        &self.history
    }

    pub fn recipients(&self) -> &SavedRecipients {
        &self.recipients
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn balances(&self) -> &BalanceCache {
        &self.balances
    }

    /// Cached raw-unit balance of the selected source token, rendered.
    pub fn source_balance(&self) -> Option<String> {
        let token = self.state.from.token.as_ref()?;
        self.balances
            .get(&token.address)
            .map(|raw| from_raw_amount(raw, token.decimals, REVERSE_AMOUNT_DIGITS))
    }

    /// Chains matching a free-text filter.
    pub fn visible_chains(&self, query: &str) -> Vec<&Chain> {
        filter_chains(&self.state.chains, query)
    }

    /// Token list of `side` narrowed by its search text, with any token found
    /// by address lookup offered first.
    pub fn visible_tokens(&self, side: Side) -> Vec<Token> {
        let search = self.search(side);
        filter_tokens(&self.state.side(side).tokens, search.query(), search.found())
    }

    /// Select a chain by id. Returns false if the chain is not in the catalog.
    pub fn select_chain(&mut self, side: Side, chain_id: u64) -> bool {
        let Some(chain) = self.state.chains.iter().find(|c| c.id == chain_id).cloned() else {
            return false;
        };
        if self.state.side(side).chain.as_ref().map(|c| c.id) == Some(chain_id) {
            return true;
        }
        info!(side = side.as_str(), chain_id = chain_id, chain = %chain.name, "Chain selected");
        self.load_side(side, chain);
        true
    }

    /// Select a token by address or symbol from the side's list or the last
    /// address lookup. Returns false if nothing matches.
    pub fn select_token(&mut self, side: Side, query: &str) -> bool {
        let query = query.trim();
        let side_state = self.state.side(side);
        let found = side_state
            .tokens
            .iter()
            .chain(self.search(side).found())
            .find(|t| t.has_address(query))
            .or_else(|| {
                side_state
                    .tokens
                    .iter()
                    .find(|t| t.symbol.eq_ignore_ascii_case(query))
            })
            .cloned();

        let Some(token) = found else {
            return false;
        };
        info!(side = side.as_str(), symbol = %token.symbol, address = %token.address, "Token selected");
        self.state.side_mut(side).token = Some(token);
        self.search_mut(side).clear();
        self.refresh_quote();
        if side == Side::From {
            self.retarget_probe();
        }
        true
    }

    pub fn set_amount(&mut self, amount: &str) {
        self.state.amount = amount.trim().to_string();
        self.refresh_quote();
    }

    pub fn set_recipient(&mut self, recipient: &str) {
        self.state.recipient = recipient.trim().to_string();
        self.refresh_quote();
    }

    /// Set the amount to `percent` of the cached source balance.
    pub fn set_percent(&mut self, percent: u8) -> Result<(), BridgeError> {
        let token = self
            .state
            .from
            .token
            .as_ref()
            .ok_or_else(|| BridgeError::InvalidAmount("no source token selected".to_string()))?;
        let amount = self
            .balances
            .shortcut_amount(&token.address, token.decimals, percent)
            .ok_or_else(|| BridgeError::InvalidAmount("balance not loaded".to_string()))?;
        self.set_amount(&amount);
        Ok(())
    }

    /// Update the token search text of one side.
    pub fn set_search(&mut self, side: Side, query: &str) {
        let chain_id = self.state.side(side).chain.as_ref().map(|c| c.id);
        let tokens = self.state.side(side).tokens.clone();
        self.search_mut(side).set_query(chain_id, query, &tokens);
    }

    /// Swap source and destination.
    ///
    /// The quoted output becomes the new input amount; without a quote the
    /// amount is kept. Token-list loads in flight follow their side.
    pub fn reverse(&mut self) {
        let new_amount = match (self.quotes.quote(), self.state.to.token.as_ref()) {
            (Some(quote), Some(token)) => parse_raw(&quote.estimate.to_amount)
                .ok()
                .map(|raw| from_raw_amount(raw, token.decimals, REVERSE_AMOUNT_DIGITS)),
            _ => None,
        };

        std::mem::swap(&mut self.state.from, &mut self.state.to);
        if let Some(amount) = new_amount {
            self.state.amount = amount;
        }
        self.from_search.clear();
        self.to_search.clear();
        self.quotes.clear();

        info!(
            from_chain = ?self.state.from.chain.as_ref().map(|c| c.id),
            to_chain = ?self.state.to.chain.as_ref().map(|c| c.id),
            amount = %self.state.amount,
            "Reversed bridge direction"
        );
        self.refresh_quote();
        self.retarget_probe();
    }

    pub async fn connect_wallet(&mut self) -> Result<(), BridgeError> {
        wallet::connect(self.provider.as_ref(), &mut self.state.wallet).await?;
        self.on_connected();
        Ok(())
    }

    /// Submit the current quote.
    ///
    /// On success the pending record is added to history and the view
    /// switches to History.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, BridgeError> {
        let ctx = SubmitContext {
            quote: self.quotes.quote(),
            from_chain: self.state.from.chain.as_ref(),
            to_chain: self.state.to.chain.as_ref(),
            from_token: self.state.from.token.as_ref(),
            to_token: self.state.to.token.as_ref(),
            amount: &self.state.amount,
        };
        let outcome = match submit::submit(self.provider.as_ref(), &mut self.state.wallet, ctx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.state.error = Some(e.to_string());
                return Err(e);
            }
        };

        match &outcome {
            SubmitOutcome::ConnectionRequested => self.on_connected(),
            SubmitOutcome::Submitted(record) => {
                // already broadcast: a failed save is reported, not returned
                self.state.error = match self.history.add(record.clone()) {
                    Ok(()) => None,
                    Err(e) => {
                        warn!(tx_hash = %record.hash, error = %e, "Failed to save history");
                        Some(format!("Transaction sent but not saved to history: {}", e))
                    }
                };
                if !self.state.recipient.is_empty() {
                    self.recipients.remember(&self.state.recipient);
                    if let Err(e) = self.recipients.save(self.store.as_ref()) {
                        warn!(error = %e, "Failed to save recipients");
                    }
                }
                self.set_view(View::History);
            }
        }
        Ok(outcome)
    }

    /// Switch view. Entering History polls immediately and then periodically;
    /// leaving it stops the polling.
    pub fn set_view(&mut self, view: View) {
        if self.state.view == view {
            return;
        }
        self.state.view = view;
        match view {
            View::History => {
                let tx = self.events_tx.clone();
                self.history_ticker = Some(spawn_ticker(self.history_poll, move || {
                    tx.send(AppEvent::HistoryTick).is_ok()
                }));
            }
            View::Bridge => {
                if let Some(ticker) = self.history_ticker.take() {
                    ticker.abort();
                }
            }
        }
    }

    pub fn clear_history(&mut self) -> Result<(), BridgeError> {
        self.history.clear()
    }

    pub fn update_settings(&mut self, settings: Settings) -> Result<(), BridgeError> {
        settings.save(self.store.as_ref())?;
        self.settings = settings;
        Ok(())
    }

    /// Wait for the next background result.
    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.events_rx.recv().await
    }

    /// Receive and apply one event. Returns false if the channel closed.
    pub async fn step(&mut self) -> bool {
        match self.next_event().await {
            Some(event) => {
                self.handle_event(event).await;
                true
            }
            None => false,
        }
    }

    /// Process events until both token lists have settled.
    pub async fn wait_for_tokens(&mut self) {
        while self.state.from.loading.is_some() || self.state.to.loading.is_some() {
            if !self.step().await {
                break;
            }
        }
    }

    /// Process events until the quote is no longer pending.
    pub async fn wait_for_quote(&mut self) -> &QuoteState {
        while self.quotes.state().is_loading() {
            if !self.step().await {
                break;
            }
        }
        self.quotes.state()
    }

    pub async fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Quote(result) => {
                self.quotes.apply(result);
            }
            AppEvent::Tokens {
                tag,
                chain_id,
                result,
            } => self.apply_tokens(tag, chain_id, result),
            AppEvent::Search { side, result } => {
                self.search_mut(side).apply(result);
            }
            AppEvent::Balance(update) => {
                if self.probe.is_current(update.generation) {
                    debug!(token = %update.token, amount = %update.amount, "Balance updated");
                    self.balances.insert(&update.token, update.amount);
                }
            }
            AppEvent::HistoryTick => {
                if self.state.view != View::History {
                    return;
                }
                if let Err(e) = self.history.refresh(self.api.as_ref()).await {
                    warn!(error = %e, "Failed to persist refreshed history");
                }
            }
            AppEvent::Wallet(event) => self.apply_wallet_event(event),
        }
    }

    fn search(&self, side: Side) -> &TokenSearch {
        match side {
            Side::From => &self.from_search,
            Side::To => &self.to_search,
        }
    }

    fn search_mut(&mut self, side: Side) -> &mut TokenSearch {
        match side {
            Side::From => &mut self.from_search,
            Side::To => &mut self.to_search,
        }
    }

    /// Put `chain` on `side`, drop its tokens, and start loading the new list.
    fn load_side(&mut self, side: Side, chain: Chain) {
        self.next_load_tag += 1;
        let tag = self.next_load_tag;
        let chain_id = chain.id;

        *self.state.side_mut(side) = SideState {
            chain: Some(chain),
            token: None,
            tokens: Vec::new(),
            loading: Some(tag),
        };
        self.search_mut(side).clear();

        let catalog = self.catalog.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = catalog.load_tokens(chain_id).await;
            let _ = tx.send(AppEvent::Tokens {
                tag,
                chain_id,
                result,
            });
        });

        self.refresh_quote();
        if side == Side::From {
            self.retarget_probe();
        }
    }

    fn apply_tokens(&mut self, tag: u64, chain_id: u64, result: Result<TokenList, BridgeError>) {
        let side = [Side::From, Side::To]
            .into_iter()
            .find(|s| self.state.side(*s).loading == Some(tag));
        let Some(side) = side else {
            debug!(chain_id = chain_id, tag = tag, "Discarding superseded token list");
            return;
        };

        let side_state = self.state.side_mut(side);
        side_state.loading = None;
        match result {
            Ok(list) => {
                side_state.token = list.default;
                side_state.tokens = list.tokens;
            }
            Err(_) => {
                self.state.error = Some(CONNECTIVITY_MESSAGE.to_string());
                return;
            }
        }

        self.refresh_quote();
        if side == Side::From {
            self.retarget_probe();
        }
    }

    fn apply_wallet_event(&mut self, event: WalletEvent) {
        debug!(event = ?event, "Wallet event");
        self.state.wallet.apply_event(&event);
        if !self.state.wallet.connected {
            info!("Wallet disconnected");
            self.balances.clear();
        }
        if matches!(event, WalletEvent::AccountsChanged(_)) {
            self.refresh_quote();
        }
        self.retarget_probe();
    }

    fn on_connected(&mut self) {
        if self.wallet_listener.is_none() {
            let mut events = self.provider.subscribe();
            let tx = self.events_tx.clone();
            self.wallet_listener = Some(tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    if tx.send(AppEvent::Wallet(event)).is_err() {
                        break;
                    }
                }
            }));
        }
        self.refresh_quote();
        self.retarget_probe();
    }

    fn refresh_quote(&mut self) {
        let inputs = self.state.quote_inputs();
        self.quotes.on_inputs_changed(&inputs);
    }

    fn retarget_probe(&mut self) {
        let wallet = &self.state.wallet;
        let target = match (
            wallet.connected,
            wallet.address.as_ref(),
            self.state.from.chain.as_ref(),
            self.state.from.token.as_ref(),
        ) {
            (true, Some(address), Some(chain), Some(token)) => Some(ProbeTarget {
                wallet: address.clone(),
                chain_id: chain.id,
                token: token.address.clone(),
            }),
            _ => None,
        };
        self.probe.retarget(target);
    }
}

impl Drop for BridgeController {
    fn drop(&mut self) {
        if let Some(ticker) = self.history_ticker.take() {
            ticker.abort();
        }
        if let Some(listener) = self.wallet_listener.take() {
            listener.abort();
        }
    }
}
