//! Domain error taxonomy
//!
//! Every failure a user can observe maps onto one of these variants. Network
//! failures are caught at the call site and converted here; nothing is retried.

use thiserror::Error;

/// EIP-1193 error code for "user rejected the request".
pub const USER_REJECTED_CODE: i64 = 4001;

/// Message shown when the catalog cannot be loaded.
pub const CONNECTIVITY_MESSAGE: &str = "Connection error.";

/// Message shown when the aggregator returns no usable route.
pub const NO_ROUTE_MESSAGE: &str = "No route found or insufficient liquidity.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// Catalog/token fetch failed
    #[error("Connection error. ({0})")]
    Connectivity(String),

    /// Quote request failed or returned an error payload
    #[error("No route found or insufficient liquidity. ({0})")]
    NoRoute(String),

    /// User declined a wallet prompt
    #[error("Transaction rejected by user")]
    WalletRejected,

    /// Any other failure while switching network or sending
    #[error("Transaction failed: {0}")]
    Submission(String),

    /// No wallet is available to connect to
    #[error("Wallet not found: {0}")]
    WalletUnavailable(String),

    /// Submit invoked without an accepted quote
    #[error("No quote available")]
    NoQuote,

    /// Amount string could not be interpreted
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Persistence read/write failure
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Error reported by a wallet provider, mirroring the EIP-1193 shape.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} (code {code})")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// True when the user explicitly declined the prompt.
    pub fn is_user_rejection(&self) -> bool {
        if self.code == USER_REJECTED_CODE {
            return true;
        }
        let msg = self.message.to_lowercase();
        msg.contains("user rejected") || msg.contains("user denied")
    }
}

impl From<ProviderError> for BridgeError {
    fn from(e: ProviderError) -> Self {
        if e.is_user_rejection() {
            BridgeError::WalletRejected
        } else {
            BridgeError::Submission(e.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_by_code() {
        let e = ProviderError::new(4001, "whatever");
        assert!(e.is_user_rejection());
        assert_eq!(BridgeError::from(e), BridgeError::WalletRejected);
    }

    #[test]
    fn test_rejection_by_message() {
        assert!(ProviderError::new(-32000, "MetaMask: User denied transaction signature")
            .is_user_rejection());
        assert!(ProviderError::new(0, "user rejected the request").is_user_rejection());
    }

    #[test]
    fn test_generic_failure() {
        let e = ProviderError::new(-32603, "insufficient funds for gas");
        assert!(!e.is_user_rejection());
        assert_eq!(
            BridgeError::from(e),
            BridgeError::Submission("insufficient funds for gas".to_string())
        );
    }

    #[test]
    fn test_display_messages() {
        assert!(BridgeError::NoRoute("x".into())
            .to_string()
            .starts_with(NO_ROUTE_MESSAGE));
        assert!(BridgeError::Connectivity("x".into())
            .to_string()
            .starts_with(CONNECTIVITY_MESSAGE));
    }
}
