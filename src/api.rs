//! Aggregation service client
//!
//! The core talks to the route aggregator through [`AggregatorApi`] so that it
//! can run against an in-memory fake in tests. [`LifiClient`] is the HTTP
//! implementation: plain GET requests with query strings, JSON responses.

use std::collections::HashMap;

use alloy::primitives::U256;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::amount::parse_raw;
use crate::config::Config;
use crate::error::BridgeError;
use crate::types::{Chain, Quote, StatusResponse, Token};

/// Parameters of a quote request, with the amount already in raw units.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequest {
    pub from_chain: u64,
    pub to_chain: u64,
    pub from_token: String,
    pub to_token: String,
    pub from_amount: String,
    pub from_address: String,
    pub to_address: Option<String>,
}

#[async_trait]
pub trait AggregatorApi: Send + Sync {
    /// All chains known to the service
    async fn chains(&self) -> Result<Vec<Chain>, BridgeError>;

    /// Tradable tokens on one chain
    async fn tokens(&self, chain_id: u64) -> Result<Vec<Token>, BridgeError>;

    /// Metadata for a single token, `None` if the service does not know it
    async fn token(&self, chain_id: u64, address: &str) -> Result<Option<Token>, BridgeError>;

    /// Priced route for a transfer
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, BridgeError>;

    /// Settlement status of a submitted transaction
    async fn status(
        &self,
        tx_hash: &str,
        from_chain: u64,
        to_chain: u64,
    ) -> Result<StatusResponse, BridgeError>;

    /// Raw balance of `token` held by `wallet`
    async fn balance(&self, chain_id: u64, token: &str, wallet: &str)
        -> Result<U256, BridgeError>;
}

#[derive(Deserialize)]
struct ChainsResponse {
    chains: Vec<Chain>,
}

#[derive(Deserialize)]
struct TokensResponse {
    tokens: HashMap<String, Vec<Token>>,
}

#[derive(Deserialize)]
struct BalanceResponse {
    #[serde(default)]
    amount: Option<String>,
}

/// HTTP client for a LI.FI-compatible aggregation API
#[derive(Clone)]
pub struct LifiClient {
    http: reqwest::Client,
    base_url: String,
    integrator: String,
    fee: String,
}

impl LifiClient {
    pub fn new(config: &Config) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| BridgeError::Connectivity(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            integrator: config.integrator.clone(),
            fee: config.fee.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` with `query` and return the body as loose JSON.
    async fn get_value(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, reqwest::Error> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "GET");
        self.http
            .get(&url)
            .query(query)
            .send()
            .await?
            .json::<serde_json::Value>()
            .await
    }

    /// GET and decode, treating an error-shaped body (`message` with no
    /// expected payload) as a failure.
    async fn get_typed<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, String> {
        let value = self
            .get_value(path, query)
            .await
            .map_err(|e| format!("{} request failed: {}", path, e))?;

        match serde_json::from_value::<T>(value.clone()) {
            Ok(t) => Ok(t),
            Err(e) => Err(error_message(&value).unwrap_or_else(|| e.to_string())),
        }
    }
}

/// Extract the service's `message` field from an error body.
fn error_message(value: &serde_json::Value) -> Option<String> {
    value
        .get("message")
        .and_then(|m| m.as_str())
        .map(|s| s.to_string())
}

#[async_trait]
impl AggregatorApi for LifiClient {
    async fn chains(&self) -> Result<Vec<Chain>, BridgeError> {
        let resp: ChainsResponse = self
            .get_typed("/chains", &[])
            .await
            .map_err(BridgeError::Connectivity)?;
        Ok(resp.chains)
    }

    async fn tokens(&self, chain_id: u64) -> Result<Vec<Token>, BridgeError> {
        let mut resp: TokensResponse = self
            .get_typed("/tokens", &[("chains", chain_id.to_string())])
            .await
            .map_err(BridgeError::Connectivity)?;
        Ok(resp.tokens.remove(&chain_id.to_string()).unwrap_or_default())
    }

    async fn token(&self, chain_id: u64, address: &str) -> Result<Option<Token>, BridgeError> {
        let value = self
            .get_value(
                "/token",
                &[("chain", chain_id.to_string()), ("token", address.to_string())],
            )
            .await
            .map_err(|e| BridgeError::Connectivity(e.to_string()))?;

        if value.get("address").is_none() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| BridgeError::Connectivity(format!("Malformed token record: {}", e)))
    }

    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, BridgeError> {
        let mut query = vec![
            ("fromChain", request.from_chain.to_string()),
            ("toChain", request.to_chain.to_string()),
            ("fromToken", request.from_token.clone()),
            ("toToken", request.to_token.clone()),
            ("fromAmount", request.from_amount.clone()),
            ("fromAddress", request.from_address.clone()),
            ("integrator", self.integrator.clone()),
            ("fee", self.fee.clone()),
        ];
        if let Some(to) = &request.to_address {
            query.push(("toAddress", to.clone()));
        }

        let value = self
            .get_value("/quote", &query)
            .await
            .map_err(|e| BridgeError::NoRoute(e.to_string()))?;

        if let Some(message) = error_message(&value) {
            return Err(BridgeError::NoRoute(message));
        }
        serde_json::from_value(value).map_err(|e| BridgeError::NoRoute(e.to_string()))
    }

    async fn status(
        &self,
        tx_hash: &str,
        from_chain: u64,
        to_chain: u64,
    ) -> Result<StatusResponse, BridgeError> {
        self.get_typed(
            "/status",
            &[
                ("txHash", tx_hash.to_string()),
                ("fromChain", from_chain.to_string()),
                ("toChain", to_chain.to_string()),
            ],
        )
        .await
        .map_err(BridgeError::Connectivity)
    }

    async fn balance(
        &self,
        chain_id: u64,
        token: &str,
        wallet: &str,
    ) -> Result<U256, BridgeError> {
        let resp: BalanceResponse = self
            .get_typed(
                "/token",
                &[
                    ("chain", chain_id.to_string()),
                    ("token", token.to_string()),
                    ("walletAddress", wallet.to_string()),
                ],
            )
            .await
            .map_err(BridgeError::Connectivity)?;

        let amount = resp
            .amount
            .ok_or_else(|| BridgeError::Connectivity("Balance missing from response".into()))?;
        parse_raw(&amount)
    }
}
