//! Lilixy Bridge - Library interface
//!
//! Core of a cross-chain bridge client over a LI.FI-compatible route
//! aggregation API: chain/token catalogs, debounced quoting, wallet-driven
//! submission, and locally persisted transaction history with status polling.
//!
//! Re-exports internal modules for use by the CLI and integration tests.

pub mod amount;
pub mod api;
pub mod app;
pub mod balance;
pub mod catalog;
pub mod config;
pub mod debounce;
pub mod error;
pub mod evm_wallet;
pub mod format;
pub mod history;
pub mod prefs;
pub mod quote;
pub mod search;
pub mod store;
pub mod submit;
pub mod types;
pub mod wallet;

pub use app::{AppEvent, AppState, BridgeController, View};
pub use config::Config;
pub use error::{BridgeError, ProviderError};
