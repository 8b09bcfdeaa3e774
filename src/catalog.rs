//! Chain and token catalog
//!
//! Loads the supported chains once, orders them by popularity, and loads the
//! token list for whichever chain is selected on each side.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::AggregatorApi;
use crate::error::BridgeError;
use crate::types::{Chain, Token};

/// Well-known chains listed first, in this order
pub const PRIORITY_CHAINS: [u64; 7] = [1, 137, 42161, 10, 8453, 56, 43114];

/// Preferred default source chain (Ethereum)
pub const DEFAULT_FROM_CHAIN: u64 = 1;

/// Preferred default destination chain (Polygon)
pub const DEFAULT_TO_CHAIN: u64 = 137;

/// Symbols eligible as the default token of a freshly loaded list
pub const PREFERRED_SYMBOLS: [&str; 3] = ["USDC", "ETH", "USDT"];

fn priority_rank(chain_id: u64) -> usize {
    PRIORITY_CHAINS
        .iter()
        .position(|&id| id == chain_id)
        .unwrap_or(PRIORITY_CHAINS.len())
}

/// Keep mainnet chains and order them: priority chains first by rank, the
/// rest in their original order.
pub fn sort_chains(chains: Vec<Chain>) -> Vec<Chain> {
    let mut supported: Vec<Chain> = chains.into_iter().filter(|c| c.mainnet).collect();
    // sort_by_key is stable
    supported.sort_by_key(|c| priority_rank(c.id));
    supported
}

/// Default (source, destination) selection for a sorted chain list.
pub fn default_chains(chains: &[Chain]) -> (Option<Chain>, Option<Chain>) {
    let from = chains
        .iter()
        .find(|c| c.id == DEFAULT_FROM_CHAIN)
        .or_else(|| chains.first())
        .cloned();
    let to = chains
        .iter()
        .find(|c| c.id == DEFAULT_TO_CHAIN)
        .or_else(|| chains.get(1))
        .cloned();
    (from, to)
}

/// First token with a preferred symbol, else the first token.
pub fn default_token(tokens: &[Token]) -> Option<Token> {
    tokens
        .iter()
        .find(|t| PREFERRED_SYMBOLS.contains(&t.symbol.as_str()))
        .or_else(|| tokens.first())
        .cloned()
}

/// `0x` followed by exactly 40 hex digits.
pub fn is_evm_address(s: &str) -> bool {
    match s.strip_prefix("0x") {
        Some(rest) => rest.len() == 40 && rest.bytes().all(|b| b.is_ascii_hexdigit()),
        None => false,
    }
}

/// Chains whose name contains `query`, case-insensitively.
pub fn filter_chains<'a>(chains: &'a [Chain], query: &str) -> Vec<&'a Chain> {
    let q = query.to_lowercase();
    chains
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&q))
        .collect()
}

/// Tokens matching `query` by name, symbol, or address. An imported token
/// not already in the result is offered first.
pub fn filter_tokens(tokens: &[Token], query: &str, imported: Option<&Token>) -> Vec<Token> {
    let q = query.to_lowercase();
    let mut list: Vec<Token> = tokens
        .iter()
        .filter(|t| {
            t.name.to_lowercase().contains(&q)
                || t.symbol.to_lowercase().contains(&q)
                || t.address.to_lowercase().contains(&q)
        })
        .cloned()
        .collect();

    if let Some(imported) = imported {
        if !list.iter().any(|t| t.has_address(&imported.address)) {
            list.insert(0, imported.clone());
        }
    }
    list
}

/// A chain's token list together with the token to preselect.
#[derive(Debug, Clone, Default)]
pub struct TokenList {
    pub chain_id: u64,
    pub tokens: Vec<Token>,
    pub default: Option<Token>,
}

#[derive(Clone)]
pub struct CatalogLoader {
    api: Arc<dyn AggregatorApi>,
}

impl CatalogLoader {
    pub fn new(api: Arc<dyn AggregatorApi>) -> Self {
        Self { api }
    }

    /// Fetch, filter, and order the chain list.
    pub async fn load_chains(&self) -> Result<Vec<Chain>, BridgeError> {
        let fetched = self.api.chains().await.map_err(|e| {
            warn!(error = %e, "Failed to load chains");
            e
        })?;
        let total = fetched.len();
        let chains = sort_chains(fetched);
        info!(total = total, mainnet = chains.len(), "Chain catalog loaded");
        Ok(chains)
    }

    /// Fetch the token list of one chain and pick its default token.
    pub async fn load_tokens(&self, chain_id: u64) -> Result<TokenList, BridgeError> {
        let tokens = self.api.tokens(chain_id).await.map_err(|e| {
            warn!(chain_id = chain_id, error = %e, "Failed to load tokens");
            e
        })?;
        let default = default_token(&tokens);
        debug!(
            chain_id = chain_id,
            count = tokens.len(),
            default = ?default.as_ref().map(|t| t.symbol.as_str()),
            "Token list loaded"
        );
        Ok(TokenList {
            chain_id,
            tokens,
            default,
        })
    }

    /// Look up a pasted token address that is not in `existing`.
    ///
    /// Returns `None` for non-address queries, tokens already listed, unknown
    /// tokens, and lookup failures (which are logged).
    pub async fn search_token(
        &self,
        chain_id: u64,
        query: &str,
        existing: &[Token],
    ) -> Option<Token> {
        if !is_evm_address(query) {
            return None;
        }
        if existing.iter().any(|t| t.has_address(query)) {
            return None;
        }

        match self.api.token(chain_id, query).await {
            Ok(found) => found,
            Err(e) => {
                warn!(chain_id = chain_id, address = %query, error = %e, "Token not found");
                None
            }
        }
    }
}
