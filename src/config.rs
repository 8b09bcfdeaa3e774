//! Client configuration
//!
//! Loaded from a `.env` file when present, then from the process environment.
//! Every field has a default except the wallet key, which is only needed to
//! submit transactions.

use eyre::{eyre, Result, WrapErr};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default aggregation service endpoint
pub const DEFAULT_API_URL: &str = "https://li.quest/v1";

/// Sender address used for quotes while no wallet is connected
pub const PLACEHOLDER_ADDRESS: &str = "0x552008c0f6870c2f77e5cC1d2eb9bdff03e30Ea0";

#[derive(Clone)]
pub struct Config {
    /// Aggregation API base URL (no trailing slash)
    pub api_url: String,
    /// Integrator identifier sent with every quote
    pub integrator: String,
    /// Integrator fee fraction sent with every quote (e.g. "0.0025")
    pub fee: String,
    pub quote_debounce_ms: u64,
    pub search_debounce_ms: u64,
    pub history_poll_interval_ms: u64,
    pub balance_poll_interval_ms: u64,
    pub http_timeout_ms: u64,
    /// Directory holding the persisted JSON blobs
    pub data_dir: PathBuf,
    /// Hex private key for the local signer wallet
    pub wallet_private_key: Option<String>,
    /// EVM chain id -> JSON-RPC URL used by the local signer wallet
    pub rpc_urls: HashMap<u64, String>,
}

/// Custom Debug that redacts the wallet key to prevent accidental log leakage.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field("integrator", &self.integrator)
            .field("fee", &self.fee)
            .field("quote_debounce_ms", &self.quote_debounce_ms)
            .field("search_debounce_ms", &self.search_debounce_ms)
            .field("history_poll_interval_ms", &self.history_poll_interval_ms)
            .field("balance_poll_interval_ms", &self.balance_poll_interval_ms)
            .field("http_timeout_ms", &self.http_timeout_ms)
            .field("data_dir", &self.data_dir)
            .field(
                "wallet_private_key",
                &self.wallet_private_key.as_ref().map(|_| "<redacted>"),
            )
            .field("rpc_urls", &self.rpc_urls)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            integrator: "lilixy".to_string(),
            fee: "0.0025".to_string(),
            quote_debounce_ms: 600,
            search_debounce_ms: 500,
            history_poll_interval_ms: 15_000,
            balance_poll_interval_ms: 15_000,
            http_timeout_ms: 30_000,
            data_dir: PathBuf::from(".lilixy"),
            wallet_private_key: None,
            rpc_urls: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from `.env` and the environment
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded .env from {:?}", path);
        }
        Self::from_env()
    }

    /// Build configuration from environment variables only
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let rpc_urls = match env::var("RPC_URLS") {
            Ok(raw) => parse_rpc_map(&raw).wrap_err("Invalid RPC_URLS")?,
            Err(_) => HashMap::new(),
        };

        let fee = env::var("LIFI_FEE").unwrap_or(defaults.fee);
        let fee_value: f64 = fee
            .parse()
            .map_err(|_| eyre!("LIFI_FEE must be a decimal fraction, got {}", fee))?;
        if !(0.0..1.0).contains(&fee_value) {
            return Err(eyre!("LIFI_FEE must be in [0, 1), got {}", fee));
        }

        Ok(Self {
            api_url: env::var("LIFI_API_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            integrator: env::var("LIFI_INTEGRATOR").unwrap_or(defaults.integrator),
            fee,
            quote_debounce_ms: env_u64("QUOTE_DEBOUNCE_MS", defaults.quote_debounce_ms),
            search_debounce_ms: env_u64("SEARCH_DEBOUNCE_MS", defaults.search_debounce_ms),
            history_poll_interval_ms: env_interval_ms(
                "HISTORY_POLL_INTERVAL_MS",
                defaults.history_poll_interval_ms,
            )?,
            balance_poll_interval_ms: env_interval_ms(
                "BALANCE_POLL_INTERVAL_MS",
                defaults.balance_poll_interval_ms,
            )?,
            http_timeout_ms: env_u64("HTTP_TIMEOUT_MS", defaults.http_timeout_ms),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            wallet_private_key: env::var("WALLET_PRIVATE_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            rpc_urls,
        })
    }

    pub fn quote_debounce(&self) -> Duration {
        Duration::from_millis(self.quote_debounce_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn history_poll_interval(&self) -> Duration {
        Duration::from_millis(self.history_poll_interval_ms)
    }

    pub fn balance_poll_interval(&self) -> Duration {
        Duration::from_millis(self.balance_poll_interval_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Poll periods must be non-zero.
fn env_interval_ms(key: &str, default: u64) -> Result<u64> {
    match env_u64(key, default) {
        0 => Err(eyre!("{} must be greater than zero", key)),
        ms => Ok(ms),
    }
}

/// Parse `"1=https://a,137=https://b"` into a chain id -> URL map.
pub fn parse_rpc_map(raw: &str) -> Result<HashMap<u64, String>> {
    let mut map = HashMap::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (id, url) = entry
            .split_once('=')
            .ok_or_else(|| eyre!("Expected chainId=url, got {}", entry))?;
        let id: u64 = id
            .trim()
            .parse()
            .wrap_err_with(|| format!("Invalid chain id in {}", entry))?;
        let url = url.trim();
        url::Url::parse(url).wrap_err_with(|| format!("Invalid RPC URL: {}", url))?;
        map.insert(id, url.to_string());
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "LIFI_API_URL",
        "LIFI_INTEGRATOR",
        "LIFI_FEE",
        "QUOTE_DEBOUNCE_MS",
        "SEARCH_DEBOUNCE_MS",
        "HISTORY_POLL_INTERVAL_MS",
        "BALANCE_POLL_INTERVAL_MS",
        "HTTP_TIMEOUT_MS",
        "DATA_DIR",
        "WALLET_PRIVATE_KEY",
        "RPC_URLS",
    ];

    fn clear_env() {
        for v in VARS {
            env::remove_var(v);
        }
    }

    #[test]
    fn test_parse_rpc_map() {
        let map = parse_rpc_map("1=https://eth.example, 137 = https://polygon.example,").unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&1], "https://eth.example");
        assert_eq!(map[&137], "https://polygon.example");
    }

    #[test]
    fn test_parse_rpc_map_rejects_bad_entries() {
        assert!(parse_rpc_map("https://no-id.example").is_err());
        assert!(parse_rpc_map("abc=https://x.example").is_err());
        assert!(parse_rpc_map("1=not a url").is_err());
        assert!(parse_rpc_map("").unwrap().is_empty());
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.integrator, "lilixy");
        assert_eq!(config.fee, "0.0025");
        assert_eq!(config.quote_debounce(), Duration::from_millis(600));
        assert_eq!(config.search_debounce(), Duration::from_millis(500));
        assert_eq!(config.history_poll_interval(), Duration::from_secs(15));
        assert_eq!(config.balance_poll_interval(), Duration::from_secs(15));
        assert!(config.wallet_private_key.is_none());
        assert!(config.rpc_urls.is_empty());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        env::set_var("LIFI_API_URL", "http://localhost:8080/v1/");
        env::set_var("QUOTE_DEBOUNCE_MS", "50");
        env::set_var("RPC_URLS", "1=http://localhost:8545");
        env::set_var("WALLET_PRIVATE_KEY", "0xdeadbeef");
        let config = Config::from_env().unwrap();
        clear_env();

        assert_eq!(config.api_url, "http://localhost:8080/v1");
        assert_eq!(config.quote_debounce_ms, 50);
        assert_eq!(config.rpc_urls[&1], "http://localhost:8545");
        assert_eq!(config.wallet_private_key.as_deref(), Some("0xdeadbeef"));
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_fee() {
        clear_env();
        env::set_var("LIFI_FEE", "1.5");
        let result = Config::from_env();
        clear_env();
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_zero_poll_interval() {
        clear_env();
        env::set_var("HISTORY_POLL_INTERVAL_MS", "0");
        let history = Config::from_env();
        clear_env();
        env::set_var("BALANCE_POLL_INTERVAL_MS", "0");
        let balance = Config::from_env();
        clear_env();

        let err = history.unwrap_err().to_string();
        assert!(err.contains("HISTORY_POLL_INTERVAL_MS"), "{}", err);
        let err = balance.unwrap_err().to_string();
        assert!(err.contains("BALANCE_POLL_INTERVAL_MS"), "{}", err);
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = Config {
            wallet_private_key: Some("0xsecret".to_string()),
            ..Config::default()
        };
        let dbg = format!("{:?}", config);
        assert!(!dbg.contains("0xsecret"));
        assert!(dbg.contains("<redacted>"));
    }
}
