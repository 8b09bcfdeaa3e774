//! Source token balance polling
//!
//! While a wallet is connected and a source chain/token is selected, the probe
//! queries that single balance immediately and then on a fixed interval.
//! Retargeting (token, chain, or wallet change) restarts the loop; clearing
//! the target stops it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::amount::percent_of_balance;
use crate::api::AggregatorApi;

/// Percentages offered as amount shortcuts
pub const PERCENT_SHORTCUTS: [u8; 4] = [25, 50, 75, 100];

/// What to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub wallet: String,
    pub chain_id: u64,
    pub token: String,
}

/// A successful balance read.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceUpdate {
    pub generation: u64,
    /// Lowercased token address
    pub token: String,
    pub amount: U256,
}

pub type BalanceSink = Arc<dyn Fn(BalanceUpdate) -> bool + Send + Sync>;

/// Last known raw balances keyed by lowercased token address.
#[derive(Debug, Clone, Default)]
pub struct BalanceCache {
    balances: HashMap<String, U256>,
}

impl BalanceCache {
    pub fn insert(&mut self, token: &str, amount: U256) {
        self.balances.insert(token.to_lowercase(), amount);
    }

    pub fn get(&self, token: &str) -> Option<U256> {
        self.balances.get(&token.to_lowercase()).copied()
    }

    pub fn clear(&mut self) {
        self.balances.clear();
    }

    /// Amount string for a percentage shortcut, if the balance is known.
    pub fn shortcut_amount(&self, token: &str, decimals: u8, percent: u8) -> Option<String> {
        self.get(token)
            .map(|raw| percent_of_balance(raw, decimals, percent))
    }
}

pub struct BalanceProbe {
    api: Arc<dyn AggregatorApi>,
    period: Duration,
    sink: BalanceSink,
    target: Option<ProbeTarget>,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl BalanceProbe {
    pub fn new(api: Arc<dyn AggregatorApi>, period: Duration, sink: BalanceSink) -> Self {
        Self {
            api,
            period,
            sink,
            target: None,
            generation: 0,
            task: None,
        }
    }

    pub fn target(&self) -> Option<&ProbeTarget> {
        self.target.as_ref()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Point the probe at a new target, or stop it with `None`.
    ///
    /// Retargeting to the same target keeps the running loop.
    pub fn retarget(&mut self, target: Option<ProbeTarget>) {
        if target == self.target && (target.is_none() || self.task.is_some()) {
            return;
        }
        self.stop();
        self.target = target.clone();

        let Some(target) = target else {
            debug!("Balance probe stopped");
            return;
        };

        debug!(
            chain_id = target.chain_id,
            token = %target.token,
            wallet = %target.wallet,
            "Balance probe started"
        );
        let generation = self.generation;
        let api = self.api.clone();
        let sink = self.sink.clone();
        let period = self.period;
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                match api
                    .balance(target.chain_id, &target.token, &target.wallet)
                    .await
                {
                    Ok(amount) => {
                        let update = BalanceUpdate {
                            generation,
                            token: target.token.to_lowercase(),
                            amount,
                        };
                        if !sink(update) {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(chain_id = target.chain_id, token = %target.token, error = %e, "Balance query failed");
                    }
                }
            }
        }));
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.generation += 1;
    }
}

impl Drop for BalanceProbe {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
