//! Error types for PiggyBank operations
//!
//! Bad input and disallowed actions are rejected before any network call.
//! Network and transaction failures carry the message reported by the node.

use thiserror::Error;

/// Core error type for PiggyBank operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PiggyBankError {
    /// Bad user input, rejected before any network call
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Action not currently permitted
    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    /// Read or connectivity failure; cached state is kept
    #[error("Network error: {0}")]
    Network(String),

    /// Wallet-reported submission or receipt failure
    #[error("Transaction failed: {0}")]
    Transaction(String),

    /// Required configuration is absent
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// Local persistence failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Malformed contract call data or return data
    #[error("ABI error: {0}")]
    Abi(String),
}

impl PiggyBankError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    pub fn abi(msg: impl Into<String>) -> Self {
        Self::Abi(msg.into())
    }
}

impl From<StorageError> for PiggyBankError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<alloy_sol_types::Error> for PiggyBankError {
    fn from(e: alloy_sol_types::Error) -> Self {
        Self::Abi(e.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a valid amount")]
    InvalidAmount,

    #[error("Amount must be greater than 0")]
    NonPositiveAmount,

    #[error("Maximum 18 decimal places allowed")]
    TooManyDecimals,

    #[error("Minimum deposit amount is {0} ETH")]
    BelowMinimum(String),

    #[error("Amount exceeds maximum deposit limit of {0} ETH")]
    AboveMaximum(String),

    #[error("Invalid Ethereum address format")]
    InvalidAddress,

    #[error("Invalid transaction hash format")]
    InvalidTransactionHash,

    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Name is too long (max {0} characters)")]
    NameTooLong(usize),

    #[error("Time must be between 2020 and 2100")]
    TimeOutOfRange,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("Funds are still locked. You can withdraw after the unlock time.")]
    FundsLocked,

    #[error("You have no funds to withdraw")]
    NoFunds,

    #[error("Connect a wallet first")]
    NotConnected,

    #[error("Only the contract owner can view this")]
    NotOwner,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_keeps_message() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = PiggyBankError::from(StorageError::from(io));
        assert_eq!(err, PiggyBankError::Storage("IO error: read-only".to_string()));
        assert_eq!(err.to_string(), "Storage error: IO error: read-only");
    }
}
