//! Wallet provider seam
//!
//! The core never talks to a concrete wallet directly. It calls
//! [`WalletProvider`] for accounts, network switching, and sending, and
//! receives account/chain change notifications as [`WalletEvent`]s on a channel.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::{BridgeError, ProviderError};

/// EIP-1193 "unauthorized" code, used when no wallet is configured
pub const UNAVAILABLE_CODE: i64 = 4100;

/// Transaction parameters handed to the wallet for signing and broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct TxParams {
    pub from: String,
    pub to: String,
    pub data: String,
    pub value: Option<String>,
}

/// Notification pushed by the wallet provider.
#[derive(Debug, Clone, PartialEq)]
pub enum WalletEvent {
    ChainChanged(u64),
    AccountsChanged(Vec<String>),
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the user to expose accounts; first entry is the active one
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError>;

    /// Currently selected network
    async fn chain_id(&self) -> Result<u64, ProviderError>;

    /// Ask the wallet to change network
    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderError>;

    /// Sign and broadcast; returns the transaction hash
    async fn send_transaction(&self, tx: &TxParams) -> Result<String, ProviderError>;

    /// New subscription to account/chain change notifications
    fn subscribe(&self) -> mpsc::UnboundedReceiver<WalletEvent>;
}

/// Provider used when no signing wallet is configured; refuses to connect.
#[derive(Debug, Default)]
pub struct NoWallet;

#[async_trait]
impl WalletProvider for NoWallet {
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
        Err(ProviderError::new(UNAVAILABLE_CODE, "no wallet configured"))
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        Err(ProviderError::new(UNAVAILABLE_CODE, "no wallet configured"))
    }

    async fn switch_chain(&self, _chain_id: u64) -> Result<(), ProviderError> {
        Err(ProviderError::new(UNAVAILABLE_CODE, "no wallet configured"))
    }

    async fn send_transaction(&self, _tx: &TxParams) -> Result<String, ProviderError> {
        Err(ProviderError::new(UNAVAILABLE_CODE, "no wallet configured"))
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<WalletEvent> {
        mpsc::unbounded_channel().1
    }
}

/// What the core knows about the connected wallet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalletState {
    pub address: Option<String>,
    pub chain_id: Option<u64>,
    pub connected: bool,
}

impl WalletState {
    /// Fold a provider notification into the state.
    pub fn apply_event(&mut self, event: &WalletEvent) {
        match event {
            WalletEvent::ChainChanged(id) => {
                self.chain_id = Some(*id);
            }
            WalletEvent::AccountsChanged(accounts) => match accounts.first() {
                Some(addr) => self.address = Some(addr.clone()),
                None => *self = WalletState::default(),
            },
        }
    }
}

/// Request accounts and the active network, then mark the wallet connected.
pub async fn connect(
    provider: &dyn WalletProvider,
    state: &mut WalletState,
) -> Result<(), BridgeError> {
    let accounts = provider.request_accounts().await.map_err(|e| {
        warn!(error = %e, "Wallet connection failed");
        if e.code == UNAVAILABLE_CODE {
            BridgeError::WalletUnavailable(e.message)
        } else {
            BridgeError::from(e)
        }
    })?;
    let address = accounts
        .into_iter()
        .next()
        .ok_or_else(|| BridgeError::WalletUnavailable("no accounts exposed".to_string()))?;
    let chain_id = provider.chain_id().await.map_err(BridgeError::from)?;

    info!(address = %address, chain_id = chain_id, "Wallet connected");
    *state = WalletState {
        address: Some(address),
        chain_id: Some(chain_id),
        connected: true,
    };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_changed_updates_chain_only() {
        let mut state = WalletState {
            address: Some("0xabc".into()),
            chain_id: Some(1),
            connected: true,
        };
        state.apply_event(&WalletEvent::ChainChanged(137));
        assert_eq!(state.chain_id, Some(137));
        assert_eq!(state.address.as_deref(), Some("0xabc"));
        assert!(state.connected);
    }

    #[test]
    fn test_accounts_changed_switches_address() {
        let mut state = WalletState {
            address: Some("0xabc".into()),
            chain_id: Some(1),
            connected: true,
        };
        state.apply_event(&WalletEvent::AccountsChanged(vec!["0xdef".into(), "0x123".into()]));
        assert_eq!(state.address.as_deref(), Some("0xdef"));
        assert!(state.connected);
    }

    #[tokio::test]
    async fn test_connect_without_wallet() {
        let mut state = WalletState::default();
        let err = connect(&NoWallet, &mut state).await.unwrap_err();
        assert!(matches!(err, BridgeError::WalletUnavailable(_)));
        assert!(!state.connected);
    }

    #[test]
    fn test_empty_accounts_disconnects() {
        let mut state = WalletState {
            address: Some("0xabc".into()),
            chain_id: Some(1),
            connected: true,
        };
        state.apply_event(&WalletEvent::AccountsChanged(vec![]));
        assert_eq!(state, WalletState::default());
    }
}
