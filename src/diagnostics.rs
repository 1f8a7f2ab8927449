//! Diagnostics snapshot
//!
//! Chain connectivity, contract deployment, environment flags and the last
//! submitted transaction. Each check reports its own failure inside its
//! status; `gather` never fails as a whole.

use std::sync::Arc;

use alloy_primitives::{Address, B256};
use alloy_sol_types::{SolCall, SolEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::abi::{self, IPiggyBank, WriteCall};
use crate::chain::ChainClient;
use crate::config::{network_type, Config};
use crate::error::StorageError;
use crate::storage::{Storage, LAST_TX_DATA_KEY, LAST_TX_HASH_KEY};
use crate::validation::validate_address;

/// Version reported in snapshots.
pub const DIAGNOSTICS_VERSION: &str = "1.0.0";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConnectionStatus {
    pub is_connected: bool,
    pub chain_id: Option<u64>,
    pub rpc_url: String,
    pub block_number: Option<u64>,
    pub network_type: String,
    /// Latest block time, Unix seconds
    pub last_block_time: Option<u64>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractStatus {
    pub address: String,
    pub is_valid: bool,
    pub is_deployed: bool,
    pub can_read: bool,
    pub owner: Option<Address>,
    pub functions: Vec<String>,
    pub events: Vec<String>,
    pub error: Option<String>,
}

impl ContractStatus {
    fn unavailable(address: String, error: &str) -> Self {
        Self {
            address,
            is_valid: false,
            is_deployed: false,
            can_read: false,
            owner: None,
            functions: Vec::new(),
            events: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentFlags {
    pub app_version: String,
    /// "configured" or "missing"
    pub project_id: String,
    /// Contract address or "not configured"
    pub piggybank_address: String,
    pub chain_id: u64,
    pub debug_mode: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LastTransactionStatus {
    Pending,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastTransaction {
    pub hash: B256,
    /// "deposit" or "withdrawal"
    #[serde(rename = "type")]
    pub kind: String,
    pub status: LastTransactionStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub chain_connection: ChainConnectionStatus,
    pub contract: ContractStatus,
    pub last_transactions: Vec<LastTransaction>,
    pub environment: EnvironmentFlags,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

// ============================================================================
// Last transaction persistence
// ============================================================================

/// The most recently submitted transaction, kept on this device.
#[derive(Clone, Debug)]
pub struct LastTransactionLog {
    storage: Storage,
}

impl LastTransactionLog {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn save(
        &self,
        hash: B256,
        call: WriteCall,
        status: LastTransactionStatus,
    ) -> Result<(), StorageError> {
        let record = LastTransaction {
            hash,
            kind: call.label().to_string(),
            status,
            timestamp: Utc::now(),
        };
        self.storage.save(LAST_TX_HASH_KEY, &hash)?;
        self.storage.save(LAST_TX_DATA_KEY, &record)
    }

    /// The stored transaction. A hash without readable metadata is reported
    /// as pending.
    pub fn load(&self) -> Option<LastTransaction> {
        let hash = match self.storage.load::<B256>(LAST_TX_HASH_KEY) {
            Ok(Some(hash)) => hash,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Failed to read last transaction hash: {}", e);
                return None;
            }
        };
        match self.storage.load::<LastTransaction>(LAST_TX_DATA_KEY) {
            Ok(Some(record)) if record.hash == hash => Some(record),
            Ok(_) | Err(_) => Some(LastTransaction {
                hash,
                kind: "unknown".to_string(),
                status: LastTransactionStatus::Pending,
                timestamp: Utc::now(),
            }),
        }
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove(LAST_TX_HASH_KEY)?;
        self.storage.remove(LAST_TX_DATA_KEY)
    }
}

// ============================================================================
// Checks
// ============================================================================

pub struct Diagnostics<C: ChainClient> {
    client: Arc<C>,
    config: Config,
    last_transaction: LastTransactionLog,
}

impl<C: ChainClient> Diagnostics<C> {
    pub fn new(client: Arc<C>, config: Config, last_transaction: LastTransactionLog) -> Self {
        Self {
            client,
            config,
            last_transaction,
        }
    }

    pub fn last_transaction_log(&self) -> &LastTransactionLog {
        &self.last_transaction
    }

    pub async fn check_chain_connection(&self) -> ChainConnectionStatus {
        let rpc_url = self.config.rpc_url.clone();
        let probe = async {
            let chain_id = self.client.chain_id().await?;
            let block = self.client.latest_block().await?;
            Ok::<_, crate::error::PiggyBankError>((chain_id, block))
        };

        match probe.await {
            Ok((chain_id, block)) => ChainConnectionStatus {
                is_connected: true,
                chain_id: Some(chain_id),
                rpc_url,
                block_number: Some(block.number),
                network_type: network_type(chain_id).to_string(),
                last_block_time: Some(block.timestamp),
                error: None,
            },
            Err(e) => {
                log::warn!("Chain connection check failed: {}", e);
                ChainConnectionStatus {
                    is_connected: false,
                    chain_id: None,
                    rpc_url,
                    block_number: None,
                    network_type: "unknown".to_string(),
                    last_block_time: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub async fn check_contract_status(&self) -> ContractStatus {
        let Some(raw) = self.config.contract_address.clone() else {
            return ContractStatus::unavailable(String::new(), "Contract address not configured");
        };
        let Ok(address) = validate_address(&raw) else {
            return ContractStatus::unavailable(raw, "Invalid contract address format");
        };

        let code = match self.client.code(address).await {
            Ok(code) => code,
            Err(e) => {
                log::warn!("Contract status check failed: {}", e);
                return ContractStatus::unavailable(raw, &e.to_string());
            }
        };
        let is_deployed = !code.is_empty();

        let owner_read = async {
            let data = self.client.call(address, None, abi::owner_calldata()).await?;
            abi::decode_owner(&data)
        };
        let (owner, read_error) = match owner_read.await {
            Ok(owner) => (Some(owner), None),
            Err(e) => {
                log::warn!("Contract owner read failed: {}", e);
                (None, Some(e.to_string()))
            }
        };

        ContractStatus {
            address: raw,
            is_valid: true,
            is_deployed,
            can_read: owner.is_some(),
            owner,
            functions: function_signatures(),
            events: event_signatures(),
            error: if is_deployed {
                read_error
            } else {
                Some("Contract not deployed at specified address".to_string())
            },
        }
    }

    pub fn environment_flags(&self) -> EnvironmentFlags {
        EnvironmentFlags {
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            project_id: if self.config.project_id.trim().is_empty() {
                "missing".to_string()
            } else {
                "configured".to_string()
            },
            piggybank_address: self
                .config
                .contract_address
                .clone()
                .unwrap_or_else(|| "not configured".to_string()),
            chain_id: self.config.chain_id,
            debug_mode: cfg!(debug_assertions),
        }
    }

    /// Run every check concurrently.
    pub async fn gather(&self) -> DiagnosticsReport {
        let (chain_connection, contract) = futures::future::join(
            self.check_chain_connection(),
            self.check_contract_status(),
        )
        .await;

        DiagnosticsReport {
            chain_connection,
            contract,
            last_transactions: self.last_transaction.load().into_iter().collect(),
            environment: self.environment_flags(),
            timestamp: Utc::now(),
            version: DIAGNOSTICS_VERSION.to_string(),
        }
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.last_transaction.clear()
    }
}

fn function_signatures() -> Vec<String> {
    [
        IPiggyBank::getBalanceCall::SIGNATURE,
        IPiggyBank::unlockTimeCall::SIGNATURE,
        IPiggyBank::ownerCall::SIGNATURE,
        IPiggyBank::depositCall::SIGNATURE,
        IPiggyBank::withdrawCall::SIGNATURE,
        IPiggyBank::withdrawAllCall::SIGNATURE,
        IPiggyBank::getContractStatsCall::SIGNATURE,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn event_signatures() -> Vec<String> {
    vec![
        IPiggyBank::Deposited::SIGNATURE.to_string(),
        IPiggyBank::Withdrawn::SIGNATURE.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockChain;
    use tempfile::TempDir;

    const CONTRACT: &str = "0xc0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0";

    fn config(contract: Option<&str>) -> Config {
        Config::from_lookup(|key: &str| match key {
            "REOWN_PROJECT_ID" => Some("project".to_string()),
            "PIGGYBANK_ADDRESS" => contract.map(str::to_string),
            _ => None,
        })
        .unwrap()
    }

    fn diagnostics(
        contract: Option<&str>,
    ) -> (TempDir, MockChain, Diagnostics<MockChain>) {
        let dir = TempDir::new().unwrap();
        let chain = MockChain::new(Address::repeat_byte(0xc0), Address::repeat_byte(0x0a), 0);
        let log = LastTransactionLog::new(Storage::new_with_base_dir(dir.path().to_path_buf()));
        let diagnostics = Diagnostics::new(Arc::new(chain.clone()), config(contract), log);
        (dir, chain, diagnostics)
    }

    #[tokio::test]
    async fn test_missing_contract_address_is_reported() {
        let (_dir, _chain, diagnostics) = diagnostics(None);
        let status = diagnostics.check_contract_status().await;
        assert!(!status.is_valid);
        assert_eq!(status.error.as_deref(), Some("Contract address not configured"));
        assert_eq!(diagnostics.environment_flags().piggybank_address, "not configured");
    }

    #[tokio::test]
    async fn test_malformed_contract_address() {
        let (_dir, _chain, diagnostics) = diagnostics(Some("0x1234"));
        let status = diagnostics.check_contract_status().await;
        assert_eq!(status.error.as_deref(), Some("Invalid contract address format"));
    }

    #[tokio::test]
    async fn test_deployed_contract_is_readable() {
        let (_dir, _chain, diagnostics) = diagnostics(Some(CONTRACT));
        let status = diagnostics.check_contract_status().await;
        assert!(status.is_deployed);
        assert!(status.can_read);
        assert_eq!(status.owner, Some(Address::repeat_byte(0x0a)));
        assert!(status.functions.contains(&"withdrawAll()".to_string()));
        assert!(status.events.contains(&"Deposited(address,uint256)".to_string()));
    }

    #[tokio::test]
    async fn test_undeployed_contract() {
        let (_dir, chain, diagnostics) = diagnostics(Some(CONTRACT));
        chain.set_deployed(false);
        let status = diagnostics.check_contract_status().await;
        assert!(!status.is_deployed);
        assert!(!status.can_read);
        assert_eq!(
            status.error.as_deref(),
            Some("Contract not deployed at specified address")
        );
    }

    #[tokio::test]
    async fn test_unreadable_contract_reports_read_error() {
        let (_dir, chain, diagnostics) = diagnostics(Some(CONTRACT));
        chain.set_revert_calls(true);
        let status = diagnostics.check_contract_status().await;
        assert!(status.is_deployed);
        assert!(!status.can_read);
        assert_eq!(
            status.error.as_deref(),
            Some("Network error: execution reverted")
        );
    }

    #[tokio::test]
    async fn test_chain_connection() {
        let (_dir, chain, diagnostics) = diagnostics(Some(CONTRACT));
        let status = diagnostics.check_chain_connection().await;
        assert!(status.is_connected);
        assert_eq!(status.network_type, "testnet");
        assert_eq!(status.last_block_time, Some(1_700_000_000));

        chain.set_fail_reads(true);
        let status = diagnostics.check_chain_connection().await;
        assert!(!status.is_connected);
        assert_eq!(status.network_type, "unknown");
        assert!(status.error.is_some());
    }

    #[tokio::test]
    async fn test_gather_survives_unreachable_chain() {
        let (_dir, chain, diagnostics) = diagnostics(Some(CONTRACT));
        chain.set_fail_reads(true);
        let report = diagnostics.gather().await;
        assert!(!report.chain_connection.is_connected);
        assert!(report.contract.error.is_some());
        assert!(report.last_transactions.is_empty());
        assert_eq!(report.environment.project_id, "configured");
    }

    #[test]
    fn test_last_transaction_round_trip_and_clear() {
        let dir = TempDir::new().unwrap();
        let log = LastTransactionLog::new(Storage::new_with_base_dir(dir.path().to_path_buf()));
        assert!(log.load().is_none());

        let hash = B256::repeat_byte(0xab);
        log.save(hash, WriteCall::Deposit, LastTransactionStatus::Pending)
            .unwrap();
        log.save(hash, WriteCall::Deposit, LastTransactionStatus::Success)
            .unwrap();
        let last = log.load().unwrap();
        assert_eq!(last.hash, hash);
        assert_eq!(last.kind, "deposit");
        assert_eq!(last.status, LastTransactionStatus::Success);

        log.clear().unwrap();
        assert!(log.load().is_none());
    }
}
