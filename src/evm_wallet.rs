//! Private-key wallet for headless use
//!
//! Implements [`WalletProvider`] over a local signer and per-chain JSON-RPC
//! endpoints. "Switching network" selects which configured RPC endpoint the
//! next transaction goes to.
//!
//! Uses Alloy's `ProviderBuilder::with_recommended_fillers()` so nonce, gas
//! limit and fees are filled in automatically.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use eyre::{Result, WrapErr};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::ProviderError;
use crate::wallet::{TxParams, WalletEvent, WalletProvider};

/// EIP-3085 "unrecognized chain" code
pub const UNKNOWN_CHAIN_CODE: i64 = 4902;

/// Generic internal JSON-RPC error code
const INTERNAL_ERROR_CODE: i64 = -32603;

pub struct LocalEvmWallet {
    signer: PrivateKeySigner,
    rpc_urls: HashMap<u64, String>,
    chain_id: Mutex<u64>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<WalletEvent>>>,
}

impl LocalEvmWallet {
    pub fn new(private_key: &str, rpc_urls: HashMap<u64, String>, chain_id: u64) -> Result<Self> {
        let signer: PrivateKeySigner = private_key.parse().wrap_err("Invalid private key")?;
        info!(
            address = %signer.address(),
            chains = rpc_urls.len(),
            "Local wallet initialized"
        );
        Ok(Self {
            signer,
            rpc_urls,
            chain_id: Mutex::new(chain_id),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    fn current_chain(&self) -> u64 {
        *self.chain_id.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self, event: WalletEvent) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn rpc_url(&self, chain_id: u64) -> Result<&str, ProviderError> {
        self.rpc_urls.get(&chain_id).map(String::as_str).ok_or_else(|| {
            ProviderError::new(
                UNKNOWN_CHAIN_CODE,
                format!("Unrecognized chain ID {}", chain_id),
            )
        })
    }
}

fn internal(message: impl std::fmt::Display) -> ProviderError {
    ProviderError::new(INTERNAL_ERROR_CODE, message.to_string())
}

#[async_trait]
impl WalletProvider for LocalEvmWallet {
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
        Ok(vec![self.signer.address().to_string()])
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        Ok(self.current_chain())
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError> {
        self.rpc_url(chain_id)?;
        {
            let mut current = self.chain_id.lock().unwrap_or_else(|e| e.into_inner());
            if *current == chain_id {
                return Ok(());
            }
            *current = chain_id;
        }
        debug!(chain_id = chain_id, "Switched network");
        self.notify(WalletEvent::ChainChanged(chain_id));
        Ok(())
    }

    async fn send_transaction(&self, tx: &TxParams) -> Result<String, ProviderError> {
        let url = self
            .rpc_url(self.current_chain())?
            .parse()
            .map_err(|e| internal(format!("Invalid RPC URL: {}", e)))?;

        let from = Address::from_str(&tx.from).map_err(|e| internal(format!("Invalid sender: {}", e)))?;
        let to = Address::from_str(&tx.to).map_err(|e| internal(format!("Invalid target: {}", e)))?;
        let data = Bytes::from_str(&tx.data).map_err(|e| internal(format!("Invalid calldata: {}", e)))?;
        let value = match tx.value.as_deref() {
            Some(v) if !v.is_empty() => {
                U256::from_str(v).map_err(|e| internal(format!("Invalid value: {}", e)))?
            }
            _ => U256::ZERO,
        };

        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(url);

        let request = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_input(data)
            .with_value(value);

        let pending = provider
            .send_transaction(request)
            .await
            .map_err(|e| internal(format!("Failed to send transaction: {}", e)))?;
        let hash = *pending.tx_hash();

        info!(tx_hash = %format!("0x{:x}", hash), "Transaction broadcast");
        Ok(format!("0x{:x}", hash))
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<WalletEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        rx
    }
}
