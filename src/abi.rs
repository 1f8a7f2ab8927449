//! PiggyBank contract interface
//!
//! Single ground-truth ABI surface: `withdraw()` takes no amount and empties
//! the caller's balance, and admin figures come from the aggregate
//! `getContractStats()` call.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall, SolEvent};
use serde::{Deserialize, Serialize};

use crate::error::PiggyBankError;

sol! {
    interface IPiggyBank {
        event Deposited(address indexed depositor, uint256 amount);
        event Withdrawn(address indexed withdrawer, uint256 amount);

        function getBalance() external view returns (uint256);
        function unlockTime() external view returns (uint256);
        function owner() external view returns (address);
        function deposit() external payable;
        function withdraw() external;
        function withdrawAll() external;
        function getContractStats()
            external
            view
            returns (
                uint256 totalDeposits_,
                uint256 totalWithdrawals_,
                uint256 numberOfDepositors_,
                bool emergencyMode_,
                uint256 contractBalance_
            );
    }
}

/// Aggregate contract figures visible to the owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractStats {
    pub total_deposits: U256,
    pub total_withdrawals: U256,
    pub number_of_depositors: U256,
    pub emergency_mode: bool,
    pub contract_balance: U256,
}

/// Write calls the dashboard can submit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteCall {
    Deposit,
    Withdraw,
    WithdrawAll,
}

impl WriteCall {
    pub fn calldata(&self) -> Bytes {
        match self {
            Self::Deposit => IPiggyBank::depositCall {}.abi_encode().into(),
            Self::Withdraw => IPiggyBank::withdrawCall {}.abi_encode().into(),
            Self::WithdrawAll => IPiggyBank::withdrawAllCall {}.abi_encode().into(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdrawal",
            Self::WithdrawAll => "withdrawal",
        }
    }
}

pub fn get_balance_calldata() -> Bytes {
    IPiggyBank::getBalanceCall {}.abi_encode().into()
}

pub fn unlock_time_calldata() -> Bytes {
    IPiggyBank::unlockTimeCall {}.abi_encode().into()
}

pub fn owner_calldata() -> Bytes {
    IPiggyBank::ownerCall {}.abi_encode().into()
}

pub fn contract_stats_calldata() -> Bytes {
    IPiggyBank::getContractStatsCall {}.abi_encode().into()
}

pub fn decode_balance(data: &[u8]) -> Result<U256, PiggyBankError> {
    Ok(IPiggyBank::getBalanceCall::abi_decode_returns(data, true)?._0)
}

pub fn decode_unlock_time(data: &[u8]) -> Result<U256, PiggyBankError> {
    Ok(IPiggyBank::unlockTimeCall::abi_decode_returns(data, true)?._0)
}

pub fn decode_owner(data: &[u8]) -> Result<Address, PiggyBankError> {
    Ok(IPiggyBank::ownerCall::abi_decode_returns(data, true)?._0)
}

pub fn decode_contract_stats(data: &[u8]) -> Result<ContractStats, PiggyBankError> {
    let ret = IPiggyBank::getContractStatsCall::abi_decode_returns(data, true)?;
    Ok(ContractStats {
        total_deposits: ret.totalDeposits_,
        total_withdrawals: ret.totalWithdrawals_,
        number_of_depositors: ret.numberOfDepositors_,
        emergency_mode: ret.emergencyMode_,
        contract_balance: ret.contractBalance_,
    })
}

/// Topic0 values of the events the dashboard follows.
pub fn watched_event_topics() -> Vec<alloy_primitives::B256> {
    vec![
        IPiggyBank::Deposited::SIGNATURE_HASH,
        IPiggyBank::Withdrawn::SIGNATURE_HASH,
    ]
}
