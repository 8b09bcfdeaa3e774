//! Records exchanged with the aggregation service and persisted locally
//!
//! Field names follow the service's JSON (camelCase); only the fields the
//! client relies on are modelled, everything else is ignored on decode.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A blockchain network as listed by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chain {
    pub id: u64,
    #[serde(default)]
    pub key: Option<String>,
    pub name: String,
    #[serde(default, rename = "logoURI")]
    pub logo_uri: Option<String>,
    #[serde(default)]
    pub mainnet: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metamask: Option<ChainMetadata>,
}

/// Wallet-facing chain metadata; only the explorer list is used.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainMetadata {
    #[serde(default)]
    pub block_explorer_urls: Vec<String>,
}

impl Chain {
    /// First advertised block explorer, without a trailing slash.
    pub fn explorer_url(&self) -> Option<String> {
        self.metamask
            .as_ref()
            .and_then(|m| m.block_explorer_urls.first())
            .map(|u| u.trim_end_matches('/').to_string())
    }
}

/// A tradable token, scoped to one chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub address: String,
    #[serde(default)]
    pub chain_id: u64,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub decimals: u8,
    #[serde(default, rename = "logoURI")]
    pub logo_uri: Option<String>,
    #[serde(default, rename = "priceUSD")]
    pub price_usd: Option<String>,
}

impl Token {
    /// Case-insensitive address comparison.
    pub fn has_address(&self, address: &str) -> bool {
        self.address.eq_ignore_ascii_case(address)
    }
}

/// Priced route returned by the quote endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(default)]
    pub id: Option<String>,
    pub estimate: Estimate,
    pub tool_details: ToolDetails,
    pub transaction_request: TransactionRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    /// Output amount in destination-token raw units
    pub to_amount: String,
    #[serde(default)]
    pub to_amount_min: Option<String>,
    #[serde(default)]
    pub gas_costs: Vec<CostItem>,
    #[serde(default)]
    pub fee_costs: Vec<CostItem>,
    #[serde(default)]
    pub execution_duration: Option<f64>,
}

impl Estimate {
    /// Sum of all gas cost entries in USD; entries that fail to parse are skipped.
    pub fn total_gas_usd(&self) -> f64 {
        self.gas_costs
            .iter()
            .filter_map(|c| c.amount_usd.as_deref())
            .filter_map(|s| s.parse::<f64>().ok())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostItem {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "amountUSD")]
    pub amount_usd: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDetails {
    pub name: String,
    #[serde(default, rename = "logoURI")]
    pub logo_uri: Option<String>,
}

/// Executable transaction descriptor attached to a quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub to: String,
    pub data: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub chain_id: Option<u64>,
}

/// Settlement status reported by the status endpoint.
///
/// Unknown upstream values (`NOT_FOUND`, `INVALID`, ...) are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TxStatus {
    Pending,
    Done,
    Failed,
    Other(String),
}

impl TxStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TxStatus::Pending => "PENDING",
            TxStatus::Done => "DONE",
            TxStatus::Failed => "FAILED",
            TxStatus::Other(s) => s,
        }
    }

    /// DONE and FAILED never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Done | TxStatus::Failed)
    }
}

impl From<String> for TxStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PENDING" => TxStatus::Pending,
            "DONE" => TxStatus::Done,
            "FAILED" => TxStatus::Failed,
            _ => TxStatus::Other(s),
        }
    }
}

impl From<TxStatus> for String {
    fn from(s: TxStatus) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Response body of the status endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub substatus: Option<String>,
}

/// A submitted bridge transaction as kept in local history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub hash: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub from_chain: Chain,
    pub to_chain: Chain,
    pub from_token: Token,
    pub to_token: Token,
    /// Human-readable amount as entered
    pub amount: String,
    pub status: TxStatus,
}

/// Which half of the bridge form an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    From,
    To,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::From => "from",
            Side::To => "to",
        }
    }
}
