//! Debounced token lookup by pasted contract address

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::catalog::{is_evm_address, CatalogLoader};
use crate::debounce::Debouncer;
use crate::types::Token;

#[derive(Debug)]
pub struct SearchResult {
    pub generation: u64,
    pub token: Option<Token>,
}

pub type SearchSink = Arc<dyn Fn(SearchResult) + Send + Sync>;

/// Address search for one side of the form. Last write wins.
pub struct TokenSearch {
    catalog: CatalogLoader,
    debouncer: Debouncer,
    sink: SearchSink,
    query: String,
    found: Option<Token>,
}

impl TokenSearch {
    pub fn new(catalog: CatalogLoader, delay: Duration, sink: SearchSink) -> Self {
        Self {
            catalog,
            debouncer: Debouncer::new(delay),
            sink,
            query: String::new(),
            found: None,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Token found for the current query, if any.
    pub fn found(&self) -> Option<&Token> {
        self.found.as_ref()
    }

    /// Update the search text. Schedules a lookup only for an address that
    /// is not already in `existing` on a selected chain.
    pub fn set_query(&mut self, chain_id: Option<u64>, query: &str, existing: &[Token]) -> Option<u64> {
        self.query = query.trim().to_string();
        self.found = None;

        let chain_id = match chain_id {
            Some(id) if is_evm_address(&self.query) => id,
            _ => {
                self.debouncer.cancel();
                return None;
            }
        };
        if existing.iter().any(|t| t.has_address(&self.query)) {
            self.debouncer.cancel();
            return None;
        }

        let catalog = self.catalog.clone();
        let sink = self.sink.clone();
        let query = self.query.clone();
        let existing = existing.to_vec();
        let generation = self.debouncer.schedule(move |generation| async move {
            debug!(chain_id = chain_id, address = %query, "Looking up token");
            let token = catalog.search_token(chain_id, &query, &existing).await;
            sink(SearchResult { generation, token });
        });
        Some(generation)
    }

    pub fn clear(&mut self) {
        self.debouncer.cancel();
        self.query.clear();
        self.found = None;
    }

    /// Apply a finished lookup. Returns false if it was superseded.
    pub fn apply(&mut self, result: SearchResult) -> bool {
        if !self.debouncer.is_current(result.generation) {
            return false;
        }
        self.found = result.token;
        true
    }
}
