//! Transaction submission
//!
//! Drives the wallet through network switch and send for an accepted quote,
//! and produces the pending history record on success.

use tracing::{error, info, warn};

use crate::error::BridgeError;
use crate::types::{Chain, Quote, Token, TransactionRecord, TxStatus};
use crate::wallet::{self, TxParams, WalletProvider, WalletState};

/// Everything about the current form a submission needs.
#[derive(Debug, Clone, Copy)]
pub struct SubmitContext<'a> {
    pub quote: Option<&'a Quote>,
    pub from_chain: Option<&'a Chain>,
    pub to_chain: Option<&'a Chain>,
    pub from_token: Option<&'a Token>,
    pub to_token: Option<&'a Token>,
    pub amount: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Wallet was disconnected; a connection was requested instead of sending
    ConnectionRequested,
    /// Transaction broadcast; record is in `Pending` state
    Submitted(TransactionRecord),
}

/// Hex chain id in the form wallets expect (`0x89` for 137).
pub fn chain_id_hex(chain_id: u64) -> String {
    format!("0x{:x}", chain_id)
}

/// Submit the quoted transaction.
///
/// A disconnected wallet is asked to connect and nothing is sent in the same
/// call. Without a quote the call fails with [`BridgeError::NoQuote`].
pub async fn submit(
    provider: &dyn WalletProvider,
    wallet_state: &mut WalletState,
    ctx: SubmitContext<'_>,
) -> Result<SubmitOutcome, BridgeError> {
    if !wallet_state.connected {
        info!("Wallet not connected, requesting connection");
        wallet::connect(provider, wallet_state).await?;
        return Ok(SubmitOutcome::ConnectionRequested);
    }

    let (quote, from_chain, to_chain, from_token, to_token) = match (
        ctx.quote,
        ctx.from_chain,
        ctx.to_chain,
        ctx.from_token,
        ctx.to_token,
    ) {
        (Some(q), Some(fc), Some(tc), Some(ft), Some(tt)) => (q, fc, tc, ft, tt),
        _ => return Err(BridgeError::NoQuote),
    };

    let from = wallet_state
        .address
        .clone()
        .ok_or_else(|| BridgeError::WalletUnavailable("no active account".to_string()))?;

    let result = send(provider, wallet_state, quote, from_chain.id, from).await;
    let hash = match result {
        Ok(hash) => hash,
        Err(e) => {
            match &e {
                BridgeError::WalletRejected => warn!("Transaction rejected by user"),
                other => error!(error = %other, "Transaction submission failed"),
            }
            return Err(e);
        }
    };

    info!(
        tx_hash = %hash,
        from_chain = from_chain.id,
        to_chain = to_chain.id,
        tool = %quote.tool_details.name,
        "Bridge transaction submitted"
    );

    Ok(SubmitOutcome::Submitted(TransactionRecord {
        hash,
        timestamp: chrono::Utc::now().timestamp_millis(),
        from_chain: from_chain.clone(),
        to_chain: to_chain.clone(),
        from_token: from_token.clone(),
        to_token: to_token.clone(),
        amount: ctx.amount.to_string(),
        status: TxStatus::Pending,
    }))
}

async fn send(
    provider: &dyn WalletProvider,
    wallet_state: &mut WalletState,
    quote: &Quote,
    source_chain: u64,
    from: String,
) -> Result<String, BridgeError> {
    if wallet_state.chain_id != Some(source_chain) {
        info!(
            current = ?wallet_state.chain_id,
            target = %chain_id_hex(source_chain),
            "Requesting network switch"
        );
        provider.switch_chain(source_chain).await?;
        wallet_state.chain_id = Some(source_chain);
    }

    let request = &quote.transaction_request;
    let params = TxParams {
        from,
        to: request.to.clone(),
        data: request.data.clone(),
        value: request.value.clone(),
    };

    Ok(provider.send_transaction(&params).await?)
}
