//! Transaction history tracking
//!
//! Keeps submitted bridge transactions newest first, persists the whole list
//! on every change, and refreshes non-terminal records against the status
//! endpoint. DONE and FAILED records are never queried again.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::AggregatorApi;
use crate::error::BridgeError;
use crate::store::{load_json, save_json, KeyValueStore, HISTORY_KEY};
use crate::types::{Chain, TransactionRecord, TxStatus};

/// Explorer base URLs used when a chain record carries none.
const FALLBACK_EXPLORERS: [(u64, &str); 7] = [
    (1, "https://etherscan.io"),
    (137, "https://polygonscan.com"),
    (42161, "https://arbiscan.io"),
    (10, "https://optimistic.etherscan.io"),
    (8453, "https://basescan.org"),
    (56, "https://bscscan.com"),
    (43114, "https://snowtrace.io"),
];

/// Explorer link for a transaction hash on `chain`, if an explorer is known.
pub fn explorer_tx_url(chain: &Chain, tx_hash: &str) -> Option<String> {
    let base = chain.explorer_url().or_else(|| {
        FALLBACK_EXPLORERS
            .iter()
            .find(|(id, _)| *id == chain.id)
            .map(|(_, url)| url.to_string())
    })?;
    Some(format!("{}/tx/{}", base, tx_hash))
}

pub struct HistoryTracker {
    records: Vec<TransactionRecord>,
    store: Arc<dyn KeyValueStore>,
}

impl HistoryTracker {
    /// Load persisted history. Malformed data starts an empty history.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let records: Vec<TransactionRecord> =
            load_json(store.as_ref(), HISTORY_KEY).unwrap_or_default();
        debug!(count = records.len(), "History loaded");
        Self { records, store }
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn pending_count(&self) -> usize {
        self.records.iter().filter(|r| !r.status.is_terminal()).count()
    }

    /// Prepend a freshly submitted record and persist.
    pub fn add(&mut self, record: TransactionRecord) -> Result<(), BridgeError> {
        info!(tx_hash = %record.hash, "Recording transaction");
        self.records.insert(0, record);
        self.persist()
    }

    /// Drop every record from memory and storage.
    pub fn clear(&mut self) -> Result<(), BridgeError> {
        info!(count = self.records.len(), "Clearing transaction history");
        self.records.clear();
        self.store.remove(HISTORY_KEY)
    }

    /// Re-check every non-terminal record once.
    ///
    /// Status lookups run concurrently. A failed or status-less response
    /// leaves that record as it was. Returns how many records changed status.
    /// Nothing is queried or written when every record is terminal.
    pub async fn refresh(&mut self, api: &dyn AggregatorApi) -> Result<usize, BridgeError> {
        if self.records.iter().all(|r| r.status.is_terminal()) {
            return Ok(0);
        }
        let checks = self.records.iter().map(|record| async move {
            if record.status.is_terminal() {
                return None;
            }
            match api
                .status(&record.hash, record.from_chain.id, record.to_chain.id)
                .await
            {
                Ok(resp) => resp.status.map(TxStatus::from),
                Err(e) => {
                    warn!(tx_hash = %record.hash, error = %e, "Status check failed");
                    None
                }
            }
        });
        let results = join_all(checks).await;

        let mut changed = 0;
        for (record, status) in self.records.iter_mut().zip(results) {
            if let Some(status) = status {
                if status != record.status {
                    info!(
                        tx_hash = %record.hash,
                        from = %record.status,
                        to = %status,
                        "Transaction status changed"
                    );
                    changed += 1;
                }
                record.status = status;
            }
        }

        self.persist()?;
        Ok(changed)
    }

    /// Refresh now and then every `period` until shutdown.
    pub async fn run(
        &mut self,
        api: &dyn AggregatorApi,
        period: Duration,
        mut shutdown: mpsc::Receiver<()>,
    ) -> Result<(), BridgeError> {
        info!(interval_ms = period.as_millis() as u64, "Watching transaction history");
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("History watch shutdown");
                    return Ok(());
                }
                _ = interval.tick() => {
                    let changed = self.refresh(api).await?;
                    debug!(changed = changed, pending = self.pending_count(), "History refreshed");
                }
            }
        }
    }

    fn persist(&self) -> Result<(), BridgeError> {
        save_json(self.store.as_ref(), HISTORY_KEY, &self.records)
    }
}

/// Call `on_tick` immediately and then every `period`, until it returns false.
///
/// The owner aborts the returned handle to stop polling.
pub fn spawn_ticker<F>(period: Duration, on_tick: F) -> JoinHandle<()>
where
    F: Fn() -> bool + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if !on_tick() {
                break;
            }
        }
    })
}
