//! dApp configuration from environment variables
//!
//! Values are fixed for the lifetime of the process. Unset variables use the
//! defaults below; unparsable ones log a warning and fall back to the default.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::transaction::Energy;

pub const DEFAULT_RPC_URL: &str = "http://localhost:9095";
pub const DEFAULT_CONTRACT_INDEX: u64 = 81;
pub const MAX_CONTRACT_EXECUTION_ENERGY: u64 = 30_000;
pub const PING_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_EXPLORER_URL: &str = "https://testnet.ccdscan.io";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DappConfig {
    /// JSON-RPC endpoint of the node
    pub rpc_url: String,
    /// Contract selected at startup
    pub default_contract_index: u64,
    /// Energy budget attached to every contract update
    pub max_contract_execution_energy: Energy,
    /// Interval of the wallet liveness ping
    pub ping_interval: Duration,
    /// Per-request timeout for the query client
    pub rpc_timeout: Duration,
    /// Block explorer base URL for transaction links
    pub explorer_url: String,
}

impl DappConfig {
    /// Load configuration from environment variables
    ///
    /// A `.env` file in the working directory is read first, if present.
    ///
    /// Environment variables:
    /// - `PIGGYBANK_RPC_URL`: node JSON-RPC endpoint
    /// - `PIGGYBANK_CONTRACT_INDEX`: contract selected at startup
    /// - `PIGGYBANK_MAX_CONTRACT_EXECUTION_ENERGY`: energy budget per update
    /// - `PIGGYBANK_PING_INTERVAL_MS`: wallet ping interval
    /// - `PIGGYBANK_RPC_TIMEOUT_SECS`: query timeout
    /// - `PIGGYBANK_EXPLORER_URL`: explorer used for transaction links
    ///
    /// # Examples
    ///
    /// ```bash
    /// # Inspect contract 81 on a local node
    /// cargo run
    ///
    /// # Another node and contract
    /// PIGGYBANK_RPC_URL=http://node:9095 PIGGYBANK_CONTRACT_INDEX=4321 cargo run
    /// ```
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let rpc_url = env::var("PIGGYBANK_RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string());
        log::info!("📡 RPC URL: {}", rpc_url);

        let default_contract_index = parse_var("PIGGYBANK_CONTRACT_INDEX", DEFAULT_CONTRACT_INDEX);
        let max_contract_execution_energy = Energy::new(parse_var(
            "PIGGYBANK_MAX_CONTRACT_EXECUTION_ENERGY",
            MAX_CONTRACT_EXECUTION_ENERGY,
        ));
        let ping_interval =
            Duration::from_millis(parse_var("PIGGYBANK_PING_INTERVAL_MS", PING_INTERVAL_MS));
        let rpc_timeout =
            Duration::from_secs(parse_var("PIGGYBANK_RPC_TIMEOUT_SECS", DEFAULT_RPC_TIMEOUT_SECS));

        let explorer_url = env::var("PIGGYBANK_EXPLORER_URL")
            .unwrap_or_else(|_| DEFAULT_EXPLORER_URL.to_string());

        Self {
            rpc_url,
            default_contract_index,
            max_contract_execution_energy,
            ping_interval,
            rpc_timeout,
            explorer_url,
        }
    }

    /// Explorer link for a submitted transaction
    pub fn transaction_url(&self, tx_hash: &str) -> String {
        transaction_url(&self.explorer_url, tx_hash)
    }
}

pub(crate) fn transaction_url(explorer_url: &str, tx_hash: &str) -> String {
    format!(
        "{}/?dcount=1&dentity=transaction&dhash={}",
        explorer_url.trim_end_matches('/'),
        tx_hash
    )
}

impl Default for DappConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            default_contract_index: DEFAULT_CONTRACT_INDEX,
            max_contract_execution_energy: Energy::new(MAX_CONTRACT_EXECUTION_ENERGY),
            ping_interval: Duration::from_millis(PING_INTERVAL_MS),
            rpc_timeout: Duration::from_secs(DEFAULT_RPC_TIMEOUT_SECS),
            explorer_url: DEFAULT_EXPLORER_URL.to_string(),
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("⚠️  Invalid {} '{}', using {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
