use ajo_piggybank::{
    Address, ContractState, ContractStats, Guarded, ObservedTransaction, SavedDraft,
    TimeRemaining, TimelockStatus, Toast, TxRecord, U256,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SaveDraftRequest {
    pub name: String,
    pub amount: String,
    pub unlock_time: u64,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionInfo {
    pub address: Option<Address>,
    pub is_owner: bool,
}

#[derive(Debug, Serialize)]
pub struct NetworkInfo {
    pub chain_id: u64,
    pub network_type: String,
    pub contract_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BalancePanel {
    /// Wei
    pub balance_wei: Option<U256>,
    /// Ether, trailing zeros dropped
    pub balance: Option<String>,
    pub unlock_time: Option<u64>,
    pub owner: Option<Address>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl BalancePanel {
    pub fn from_state(state: &ContractState) -> Self {
        Self {
            balance_wei: state.balance,
            balance: state.balance_display(),
            unlock_time: state.unlock_time,
            owner: state.owner,
            refreshed_at: state.refreshed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TimelockPanel {
    pub is_unlocked: bool,
    pub time_remaining: Option<TimeRemaining>,
    /// e.g. "Funds locked for 3 days"
    pub summary: Option<String>,
}

impl TimelockPanel {
    pub fn from_status(status: TimelockStatus) -> Self {
        Self {
            is_unlocked: status.is_unlocked,
            time_remaining: status.time_remaining,
            summary: status.time_remaining.and_then(|t| t.summary()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardSnapshot {
    pub session: SessionInfo,
    pub network: NetworkInfo,
    pub balance: Guarded<BalancePanel>,
    pub timelock: Guarded<TimelockPanel>,
    /// Present only for the contract owner
    pub admin: Option<Guarded<ContractStats>>,
    pub bookmarks: Guarded<Vec<SavedDraft>>,
    pub recent_transactions: Vec<ObservedTransaction>,
    pub transactions: Vec<TxRecord>,
    pub toasts: Vec<Toast>,
}
