//! In-memory fakes shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::U256;
use async_trait::async_trait;
use tokio::sync::mpsc;

use lilixy_bridge::api::{AggregatorApi, QuoteRequest};
use lilixy_bridge::error::{BridgeError, ProviderError};
use lilixy_bridge::store::{JsonFileStore, KeyValueStore};
use lilixy_bridge::types::{
    Chain, Estimate, Quote, StatusResponse, Token, ToolDetails, TransactionRequest,
};
use lilixy_bridge::wallet::{TxParams, WalletEvent, WalletProvider};
use lilixy_bridge::Config;

pub fn chain(id: u64, name: &str) -> Chain {
    Chain {
        id,
        key: None,
        name: name.to_string(),
        logo_uri: None,
        mainnet: true,
        metamask: None,
    }
}

pub fn token(chain_id: u64, symbol: &str, address: &str, decimals: u8) -> Token {
    Token {
        address: address.to_string(),
        chain_id,
        symbol: symbol.to_string(),
        name: symbol.to_string(),
        decimals,
        logo_uri: None,
        price_usd: Some("1.0".to_string()),
    }
}

pub fn addr(n: u64) -> String {
    format!("0x{:040x}", n)
}

pub fn quote(to_amount: &str) -> Quote {
    Quote {
        id: Some("q-1".to_string()),
        estimate: Estimate {
            to_amount: to_amount.to_string(),
            to_amount_min: None,
            gas_costs: vec![],
            fee_costs: vec![],
            execution_duration: Some(60.0),
        },
        tool_details: ToolDetails {
            name: "stargate".to_string(),
            logo_uri: None,
        },
        transaction_request: TransactionRequest {
            to: addr(0xb41d6e),
            data: "0xdeadbeef".to_string(),
            value: Some("0x0".to_string()),
            chain_id: Some(1),
        },
    }
}

/// Config with test-friendly debounce/poll values (times are paused in tests).
pub fn test_config() -> Config {
    Config::default()
}

pub fn temp_store() -> (tempfile::TempDir, Arc<dyn KeyValueStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(dir.path()).unwrap());
    (dir, store)
}

/// Store whose writes always fail; reads see nothing.
pub struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>, BridgeError> {
        Ok(None)
    }

    fn set(&self, key: &str, _value: &str) -> Result<(), BridgeError> {
        Err(BridgeError::Storage(format!("disk full writing {}", key)))
    }

    fn remove(&self, _key: &str) -> Result<(), BridgeError> {
        Ok(())
    }
}

#[derive(Default)]
struct ApiState {
    chains: Option<Vec<Chain>>,
    tokens: HashMap<u64, Vec<Token>>,
    failing_tokens: Vec<u64>,
    token_delay: HashMap<u64, Duration>,
    lookup: HashMap<String, Token>,
    quote: Option<Result<Quote, BridgeError>>,
    statuses: HashMap<String, Result<Option<String>, BridgeError>>,
    balances: HashMap<String, U256>,
    quote_requests: Vec<QuoteRequest>,
    token_lookups: Vec<String>,
    status_calls: HashMap<String, usize>,
    balance_calls: usize,
}

/// Scriptable aggregator.
#[derive(Clone, Default)]
pub struct FakeApi {
    state: Arc<Mutex<ApiState>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ethereum (USDC, ETH), Polygon (USDC), Optimism (USDC), plus a testnet.
    pub fn standard() -> Self {
        let api = Self::new();
        let mut testnet = chain(11155111, "Sepolia");
        testnet.mainnet = false;
        api.set_chains(vec![
            chain(10, "Optimism"),
            testnet,
            chain(137, "Polygon"),
            chain(1, "Ethereum"),
        ]);
        api.set_tokens(
            1,
            vec![
                token(1, "ETH", &addr(0), 18),
                token(1, "USDC", &addr(0xa0b8), 6),
            ],
        );
        api.set_tokens(
            137,
            vec![
                token(137, "MATIC", &addr(0x1010), 18),
                token(137, "USDC", &addr(0x3c49), 6),
            ],
        );
        api.set_tokens(10, vec![token(10, "USDC", &addr(0x0b2c), 6)]);
        api
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ApiState> {
        self.state.lock().unwrap()
    }

    pub fn set_chains(&self, chains: Vec<Chain>) {
        self.lock().chains = Some(chains);
    }

    pub fn set_tokens(&self, chain_id: u64, tokens: Vec<Token>) {
        self.lock().tokens.insert(chain_id, tokens);
    }

    pub fn fail_tokens(&self, chain_id: u64) {
        self.lock().failing_tokens.push(chain_id);
    }

    pub fn delay_tokens(&self, chain_id: u64, delay: Duration) {
        self.lock().token_delay.insert(chain_id, delay);
    }

    pub fn add_lookup(&self, token: Token) {
        self.lock().lookup.insert(token.address.to_lowercase(), token);
    }

    pub fn set_quote(&self, result: Result<Quote, BridgeError>) {
        self.lock().quote = Some(result);
    }

    pub fn set_status(&self, hash: &str, result: Result<Option<String>, BridgeError>) {
        self.lock().statuses.insert(hash.to_string(), result);
    }

    pub fn set_balance(&self, token: &str, amount: U256) {
        self.lock().balances.insert(token.to_lowercase(), amount);
    }

    pub fn quote_requests(&self) -> Vec<QuoteRequest> {
        self.lock().quote_requests.clone()
    }

    pub fn token_lookups(&self) -> Vec<String> {
        self.lock().token_lookups.clone()
    }

    pub fn status_calls(&self, hash: &str) -> usize {
        self.lock().status_calls.get(hash).copied().unwrap_or(0)
    }

    pub fn balance_calls(&self) -> usize {
        self.lock().balance_calls
    }
}

#[async_trait]
impl AggregatorApi for FakeApi {
    async fn chains(&self) -> Result<Vec<Chain>, BridgeError> {
        self.lock()
            .chains
            .clone()
            .ok_or_else(|| BridgeError::Connectivity("offline".into()))
    }

    async fn tokens(&self, chain_id: u64) -> Result<Vec<Token>, BridgeError> {
        let delay = self.lock().token_delay.get(&chain_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.lock();
        if state.failing_tokens.contains(&chain_id) {
            return Err(BridgeError::Connectivity("offline".into()));
        }
        Ok(state.tokens.get(&chain_id).cloned().unwrap_or_default())
    }

    async fn token(&self, _chain_id: u64, address: &str) -> Result<Option<Token>, BridgeError> {
        let mut state = self.lock();
        state.token_lookups.push(address.to_string());
        Ok(state.lookup.get(&address.to_lowercase()).cloned())
    }

    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, BridgeError> {
        let mut state = self.lock();
        state.quote_requests.push(request.clone());
        state
            .quote
            .clone()
            .unwrap_or_else(|| Err(BridgeError::NoRoute("no quote scripted".into())))
    }

    async fn status(
        &self,
        tx_hash: &str,
        _from_chain: u64,
        _to_chain: u64,
    ) -> Result<StatusResponse, BridgeError> {
        let mut state = self.lock();
        *state.status_calls.entry(tx_hash.to_string()).or_default() += 1;
        match state.statuses.get(tx_hash).cloned() {
            Some(Ok(status)) => Ok(StatusResponse {
                status,
                substatus: None,
            }),
            Some(Err(e)) => Err(e),
            None => Err(BridgeError::Connectivity("unknown hash".into())),
        }
    }

    async fn balance(
        &self,
        _chain_id: u64,
        token: &str,
        _wallet: &str,
    ) -> Result<U256, BridgeError> {
        let mut state = self.lock();
        state.balance_calls += 1;
        state
            .balances
            .get(&token.to_lowercase())
            .copied()
            .ok_or_else(|| BridgeError::Connectivity("balance unavailable".into()))
    }
}

#[derive(Default)]
struct WalletInner {
    account: Option<String>,
    chain_id: u64,
    send_error: Option<ProviderError>,
    switch_error: Option<ProviderError>,
    switches: Vec<u64>,
    sent: Vec<TxParams>,
    subscribers: Vec<mpsc::UnboundedSender<WalletEvent>>,
}

/// Scriptable wallet provider.
#[derive(Clone, Default)]
pub struct FakeWallet {
    inner: Arc<Mutex<WalletInner>>,
}

impl FakeWallet {
    pub fn new(account: &str, chain_id: u64) -> Self {
        let wallet = Self::default();
        {
            let mut inner = wallet.inner.lock().unwrap();
            inner.account = Some(account.to_string());
            inner.chain_id = chain_id;
        }
        wallet
    }

    pub fn fail_send(&self, error: ProviderError) {
        self.inner.lock().unwrap().send_error = Some(error);
    }

    pub fn fail_switch(&self, error: ProviderError) {
        self.inner.lock().unwrap().switch_error = Some(error);
    }

    pub fn switches(&self) -> Vec<u64> {
        self.inner.lock().unwrap().switches.clone()
    }

    pub fn sent(&self) -> Vec<TxParams> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Push a notification to every subscriber.
    pub fn emit(&self, event: WalletEvent) {
        let mut inner = self.inner.lock().unwrap();
        inner.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.inner.lock().unwrap().account.iter().cloned().collect())
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        Ok(self.inner.lock().unwrap().chain_id)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        let mut inner = self.inner.lock().unwrap();
        inner.switches.push(chain_id);
        if let Some(e) = inner.switch_error.clone() {
            return Err(e);
        }
        inner.chain_id = chain_id;
        Ok(())
    }

    async fn send_transaction(&self, tx: &TxParams) -> Result<String, ProviderError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(e) = inner.send_error.clone() {
            return Err(e);
        }
        inner.sent.push(tx.clone());
        Ok(format!("0x{:064x}", inner.sent.len()))
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<WalletEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().unwrap().subscribers.push(tx);
        rx
    }
}
