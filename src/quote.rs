//! Debounced quote fetching
//!
//! Every change to amount, chains, tokens, wallet, or recipient restarts a
//! debounce timer. When it fires, one quote request goes out tagged with the
//! generation it was scheduled under; responses from older generations are
//! dropped on arrival.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::amount::{is_positive, to_raw_amount};
use crate::api::{AggregatorApi, QuoteRequest};
use crate::config::PLACEHOLDER_ADDRESS;
use crate::debounce::Debouncer;
use crate::error::{BridgeError, NO_ROUTE_MESSAGE};
use crate::types::{Quote, Token};

/// Form state a quote depends on.
#[derive(Debug, Clone, Default)]
pub struct QuoteInputs {
    pub from_chain: Option<u64>,
    pub to_chain: Option<u64>,
    pub from_token: Option<Token>,
    pub to_token: Option<Token>,
    pub amount: String,
    pub wallet: Option<String>,
    pub recipient: Option<String>,
}

/// Build the request for `inputs`, or `None` when no quote should be fetched.
pub fn build_request(inputs: &QuoteInputs) -> Option<QuoteRequest> {
    if !is_positive(&inputs.amount) {
        return None;
    }
    let from_token = inputs.from_token.as_ref()?;
    let to_token = inputs.to_token.as_ref()?;
    let from_chain = inputs.from_chain?;
    let to_chain = inputs.to_chain?;

    let raw = to_raw_amount(&inputs.amount, from_token.decimals).ok()?;
    // below one raw unit
    if raw == "0" {
        return None;
    }

    let from_address = inputs
        .wallet
        .clone()
        .unwrap_or_else(|| PLACEHOLDER_ADDRESS.to_string());
    let to_address = inputs
        .recipient
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    Some(QuoteRequest {
        from_chain,
        to_chain,
        from_token: from_token.address.clone(),
        to_token: to_token.address.clone(),
        from_amount: raw,
        from_address,
        to_address,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuoteState {
    /// Nothing to quote
    Idle,
    /// A request is scheduled or in flight
    Pending,
    Ready(Quote),
    /// Last request failed; carries the user-facing message
    NoRoute(String),
}

impl QuoteState {
    pub fn quote(&self) -> Option<&Quote> {
        match self {
            QuoteState::Ready(q) => Some(q),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, QuoteState::Pending)
    }
}

/// A finished quote request.
#[derive(Debug)]
pub struct QuoteResult {
    pub generation: u64,
    pub result: Result<Quote, BridgeError>,
}

pub type QuoteSink = Arc<dyn Fn(QuoteResult) + Send + Sync>;

pub struct QuoteEngine {
    api: Arc<dyn AggregatorApi>,
    debouncer: Debouncer,
    sink: QuoteSink,
    state: QuoteState,
}

impl QuoteEngine {
    pub fn new(api: Arc<dyn AggregatorApi>, delay: Duration, sink: QuoteSink) -> Self {
        Self {
            api,
            debouncer: Debouncer::new(delay),
            sink,
            state: QuoteState::Idle,
        }
    }

    pub fn state(&self) -> &QuoteState {
        &self.state
    }

    pub fn quote(&self) -> Option<&Quote> {
        self.state.quote()
    }

    /// Drop the current quote and any pending request.
    pub fn clear(&mut self) {
        self.debouncer.cancel();
        self.state = QuoteState::Idle;
    }

    /// Restart the debounce for new inputs. Returns the scheduled generation,
    /// or `None` if the inputs are incomplete and the quote was cleared.
    pub fn on_inputs_changed(&mut self, inputs: &QuoteInputs) -> Option<u64> {
        let Some(request) = build_request(inputs) else {
            self.clear();
            return None;
        };

        self.state = QuoteState::Pending;
        let api = self.api.clone();
        let sink = self.sink.clone();
        let generation = self.debouncer.schedule(move |generation| async move {
            debug!(
                generation = generation,
                from_chain = request.from_chain,
                to_chain = request.to_chain,
                amount = %request.from_amount,
                "Requesting quote"
            );
            let result = api.quote(&request).await;
            sink(QuoteResult { generation, result });
        });
        Some(generation)
    }

    /// Apply a finished request. Returns false if it was superseded.
    pub fn apply(&mut self, result: QuoteResult) -> bool {
        if !self.debouncer.is_current(result.generation) {
            debug!(generation = result.generation, "Discarding stale quote");
            return false;
        }
        self.state = match result.result {
            Ok(quote) => {
                info!(
                    tool = %quote.tool_details.name,
                    to_amount = %quote.estimate.to_amount,
                    "Quote received"
                );
                QuoteState::Ready(quote)
            }
            Err(e) => {
                info!(error = %e, "No route for quote");
                QuoteState::NoRoute(NO_ROUTE_MESSAGE.to_string())
            }
        };
        true
    }
}
