//! Environment-based Configuration for swapwatch
//!
//! # Environment Variables
//!
//! ## Network Configuration
//! - `SWAP_NETWORK` - "mainnet", "testnet", "signet" or "regtest" (default: "testnet")
//! - `SWAP_ESPLORA_URL` - Esplora API endpoint URL (default per network)
//! - `SWAP_EVM_RPC` - EVM JSON-RPC endpoint URL (default: "http://127.0.0.1:8545")
//!
//! ## Contract Configuration
//! - `SWAP_HTLC_CONTRACT` - Swapper contract address (0x-prefixed, optional)
//! - `SWAP_ORDER_LAYOUT` - "standard" or "extended" (default: "standard")
//!
//! ## Optional Settings
//! - `SWAP_SECRET_WINDOW` - Blocks per secret-scan log query (default: 500)
//! - `SWAP_POLL_INTERVAL_MS` - Log subscription poll interval (default: 4000)
//! - `SWAP_LOG_LEVEL` - Logging level (debug, info, warn, error)
//! - `SWAP_LOG_JSON` - Set to "1" for JSON log output

use primitive_types::H160;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::evm::abi;
use crate::evm::order::OrderLayout;
use crate::evm::range::DEFAULT_WINDOW;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Network environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
    Signet,
    Regtest,
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" | "bitcoin" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            "signet" => Ok(Network::Signet),
            "regtest" => Ok(Network::Regtest),
            _ => Err(ConfigError::InvalidValue(
                "SWAP_NETWORK".to_string(),
                format!("unknown network: {}", s),
            )),
        }
    }
}

impl Network {
    /// Get default Esplora API for this network
    pub fn default_esplora_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://blockstream.info/api",
            Network::Testnet => "https://blockstream.info/testnet/api",
            Network::Signet => "https://mempool.space/signet/api",
            Network::Regtest => "http://127.0.0.1:3002",
        }
    }

    /// Get bitcoin network enum
    pub fn bitcoin_network(&self) -> bitcoin::Network {
        match self {
            Network::Mainnet => bitcoin::Network::Bitcoin,
            Network::Testnet => bitcoin::Network::Testnet,
            Network::Signet => bitcoin::Network::Signet,
            Network::Regtest => bitcoin::Network::Regtest,
        }
    }
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// UTXO chain network
    pub network: Network,

    /// Esplora API endpoint
    pub esplora_url: String,

    /// EVM JSON-RPC endpoint
    pub evm_rpc: String,

    /// Swapper contract, when one is configured
    pub htlc_contract: Option<H160>,

    /// Return-tuple layout of the swapper's `orders(bytes32)`
    pub order_layout: OrderLayout,

    /// Blocks per log query in the secret scan
    pub secret_window: u64,

    /// Poll interval for log subscriptions
    pub poll_interval: Duration,

    /// Log level
    pub log_level: String,

    /// JSON log output
    pub log_json: bool,
}

impl TrackerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let network: Network = lookup("SWAP_NETWORK")
            .unwrap_or_else(|| "testnet".to_string())
            .parse()?;

        let esplora_url = lookup("SWAP_ESPLORA_URL")
            .unwrap_or_else(|| network.default_esplora_url().to_string());

        let evm_rpc =
            lookup("SWAP_EVM_RPC").unwrap_or_else(|| "http://127.0.0.1:8545".to_string());

        let htlc_contract = lookup("SWAP_HTLC_CONTRACT")
            .map(|v| {
                abi::parse_h160(&v)
                    .map_err(|e| ConfigError::InvalidValue("SWAP_HTLC_CONTRACT".to_string(), e.to_string()))
            })
            .transpose()?;

        let order_layout = match lookup("SWAP_ORDER_LAYOUT") {
            Some(v) => v
                .parse()
                .map_err(|e| ConfigError::InvalidValue("SWAP_ORDER_LAYOUT".to_string(), e))?,
            None => OrderLayout::default(),
        };

        let secret_window = parse_number(&lookup, "SWAP_SECRET_WINDOW", DEFAULT_WINDOW)?;
        if secret_window == 0 {
            return Err(ConfigError::InvalidValue(
                "SWAP_SECRET_WINDOW".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let poll_interval_ms = parse_number(&lookup, "SWAP_POLL_INTERVAL_MS", 4_000)?;

        let log_level = lookup("SWAP_LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let log_json = lookup("SWAP_LOG_JSON").map(|v| v == "1").unwrap_or(false);

        Ok(Self {
            network,
            esplora_url,
            evm_rpc,
            htlc_contract,
            order_layout,
            secret_window,
            poll_interval: Duration::from_millis(poll_interval_ms),
            log_level,
            log_json,
        })
    }

    /// Configured swapper contract, or an error naming the variable
    pub fn require_contract(&self) -> Result<H160, ConfigError> {
        self.htlc_contract
            .ok_or_else(|| ConfigError::MissingEnvVar("SWAP_HTLC_CONTRACT".to_string()))
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("=== swapwatch Configuration ===");
        println!("Network: {:?}", self.network);
        println!("Esplora API: {}", self.esplora_url);
        println!("EVM RPC: {}", self.evm_rpc);
        println!(
            "HTLC Contract: {}",
            self.htlc_contract
                .map(|c| format!("{:#x}", c))
                .unwrap_or_else(|| "(not set)".to_string())
        );
        println!("Order Layout: {:?}", self.order_layout);
        println!("Secret Window: {} blocks", self.secret_window);
        println!("Poll Interval: {:?}", self.poll_interval);
        println!("Log Level: {}", self.log_level);
        println!("===============================");
    }
}

fn parse_number<F>(lookup: &F, var_name: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(var_name) {
        Some(v) => v.parse().map_err(|_| {
            ConfigError::InvalidValue(var_name.to_string(), "must be a number".to_string())
        }),
        None => Ok(default),
    }
}
