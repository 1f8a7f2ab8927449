//! PiggyBank configuration from environment variables
//!
//! The session/project identifier is mandatory: without it the process
//! refuses to start. A missing contract address is tolerated and surfaces
//! later as an explicit "not configured" error.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use alloy_primitives::Address;
use thiserror::Error;

use crate::error::{PiggyBankError, ValidationError};
use crate::validation::{validate_address, DepositLimits};

/// Base mainnet
pub const BASE_CHAIN_ID: u64 = 8453;
/// Base Sepolia testnet
pub const BASE_SEPOLIA_CHAIN_ID: u64 = 84532;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Wallet session / project identifier
    pub project_id: String,
    /// Raw contract address as configured; validated on use
    pub contract_address: Option<String>,
    /// JSON-RPC endpoint
    pub rpc_url: String,
    pub chain_id: u64,
    /// Block explorer base URL for transaction links
    pub explorer_url: Option<String>,
    /// Directory for saved drafts and diagnostics keys
    pub data_dir: PathBuf,
    /// Account connected at startup, if any
    pub wallet_address: Option<Address>,
    pub deposit_limits: DepositLimits,
    pub refetch_debounce: Duration,
    pub event_poll_interval: Duration,
    pub receipt_poll_interval: Duration,
}

impl Config {
    /// Load configuration from the process environment (and `.env`).
    ///
    /// Environment variables:
    /// - `REOWN_PROJECT_ID` (required)
    /// - `PIGGYBANK_ADDRESS`
    /// - `RPC_URL`, `CHAIN_ID`, `EXPLORER_URL`
    /// - `DATA_DIR`, `WALLET_ADDRESS`
    /// - `MIN_DEPOSIT`, `MAX_DEPOSIT` (ether)
    /// - `REFETCH_DEBOUNCE_MS`, `EVENT_POLL_SECS`, `RECEIPT_POLL_MS`
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let project_id = get("REOWN_PROJECT_ID").ok_or(ConfigError::Missing("REOWN_PROJECT_ID"))?;

        let contract_address = get("PIGGYBANK_ADDRESS").map(|a| a.trim().to_string());
        if contract_address.is_none() {
            log::warn!("⚠️  PIGGYBANK_ADDRESS not set, contract reads are disabled");
        }

        let chain_id = match get("CHAIN_ID") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "CHAIN_ID",
                reason: format!("'{}' is not a number", raw),
            })?,
            None => BASE_SEPOLIA_CHAIN_ID,
        };

        let rpc_url = get("RPC_URL").unwrap_or_else(|| match chain_id {
            BASE_CHAIN_ID => "https://mainnet.base.org".to_string(),
            _ => "https://sepolia.base.org".to_string(),
        });
        log::info!("📡 RPC URL: {} (chain {})", rpc_url, chain_id);

        let explorer_url = get("EXPLORER_URL").or_else(|| match chain_id {
            BASE_CHAIN_ID => Some("https://basescan.org".to_string()),
            BASE_SEPOLIA_CHAIN_ID => Some("https://sepolia.basescan.org".to_string()),
            _ => None,
        });

        let data_dir = get("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./piggybank-data"));

        let wallet_address = match get("WALLET_ADDRESS") {
            Some(raw) => Some(validate_address(&raw).map_err(|e| ConfigError::Invalid {
                key: "WALLET_ADDRESS",
                reason: e.to_string(),
            })?),
            None => None,
        };

        let min = get("MIN_DEPOSIT").unwrap_or_else(|| "0.001".to_string());
        let max = get("MAX_DEPOSIT").unwrap_or_else(|| "100".to_string());
        let deposit_limits =
            DepositLimits::from_ether(&min, &max).map_err(|e| ConfigError::Invalid {
                key: "MIN_DEPOSIT/MAX_DEPOSIT",
                reason: e.to_string(),
            })?;
        if deposit_limits.min > deposit_limits.max {
            return Err(ConfigError::Invalid {
                key: "MIN_DEPOSIT/MAX_DEPOSIT",
                reason: "minimum exceeds maximum".to_string(),
            });
        }

        Ok(Self {
            project_id,
            contract_address,
            rpc_url,
            chain_id,
            explorer_url,
            data_dir,
            wallet_address,
            deposit_limits,
            refetch_debounce: Duration::from_millis(parse_u64(&get, "REFETCH_DEBOUNCE_MS", 1_000)?),
            event_poll_interval: Duration::from_secs(parse_u64(&get, "EVENT_POLL_SECS", 4)?),
            receipt_poll_interval: Duration::from_millis(parse_u64(&get, "RECEIPT_POLL_MS", 2_000)?),
        })
    }

    /// The validated contract address.
    pub fn contract_address(&self) -> Result<Address, PiggyBankError> {
        let raw = self
            .contract_address
            .as_deref()
            .ok_or_else(|| PiggyBankError::NotConfigured("Contract address not configured".to_string()))?;
        validate_address(raw).map_err(|_| PiggyBankError::Validation(ValidationError::InvalidAddress))
    }

    /// "mainnet", "testnet" or "unknown"
    pub fn network_type(&self) -> &'static str {
        network_type(self.chain_id)
    }
}

pub fn network_type(chain_id: u64) -> &'static str {
    match chain_id {
        BASE_CHAIN_ID => "mainnet",
        BASE_SEPOLIA_CHAIN_ID => "testnet",
        _ => "unknown",
    }
}

fn parse_u64<G>(get: &G, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            reason: format!("'{}' is not a number", raw),
        }),
        None => Ok(default),
    }
}
