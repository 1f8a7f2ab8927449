//! Ajo PiggyBank: time-locked savings contract client
//!
//! This crate binds a deployed PiggyBank contract on an Ethereum-compatible
//! chain (Base / Base Sepolia by default): it reads the connected account's
//! balance and the unlock time, submits deposits and withdrawals through
//! the node's wallet, and tracks every submission until its receipt.
//!
//! # Architecture
//!
//! - **Chain client**: `ChainClient` trait over JSON-RPC (`JsonRpcClient`)
//! - **Contract binding**: cached state, validated writes, debounced refetch
//! - **Timelock**: pure countdown derivation plus a one-second ticker
//! - **Tracker / toasts**: per-transaction lifecycle and expiring notices
//! - **Events**: `Deposited` / `Withdrawn` log polling into recent transactions
//! - **Local storage**: saved deposit drafts and diagnostics records
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ajo_piggybank::{BindingOptions, JsonRpcClient, PiggyBankContract, SystemClock,
//!     ToastQueue, TransactionTracker};
//!
//! let client = Arc::new(JsonRpcClient::new("https://sepolia.base.org"));
//! let tracker = TransactionTracker::new(ToastQueue::new(None));
//! let contract = PiggyBankContract::new(
//!     client,
//!     contract_address,
//!     tracker,
//!     Arc::new(SystemClock),
//!     BindingOptions::default(),
//! );
//!
//! contract.connect(my_address);
//! contract.refresh().await?;
//! let submission = contract.deposit("0.5").await?;
//! ```

// Public modules
pub mod abi;
pub mod binding;
pub mod bookmarks;
pub mod chain;
pub mod config;
pub mod debounce;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod mock;
pub mod rpc;
pub mod storage;
pub mod supervisor;
pub mod timelock;
pub mod toast;
pub mod tracker;
pub mod units;
pub mod validation;

// Re-exports for convenience
pub use abi::{ContractStats, WriteCall};
pub use binding::{BindingOptions, ContractState, PiggyBankContract, Submission};
pub use bookmarks::{BookmarkStore, SavedDraft};
pub use chain::{BlockInfo, ChainClient, Log, LogFilter, TransactionReceipt, TransactionRequest};
pub use config::{Config, ConfigError};
pub use debounce::Debouncer;
pub use diagnostics::{
    ChainConnectionStatus, ContractStatus, Diagnostics, DiagnosticsReport, EnvironmentFlags,
    LastTransaction, LastTransactionLog, LastTransactionStatus,
};
pub use error::{PiggyBankError, PreconditionError, StorageError, ValidationError};
pub use events::{
    EventPoller, EventWatcher, ObservedTransaction, RecentTransactions, TransactionKind,
};
pub use mock::MockChain;
pub use rpc::JsonRpcClient;
pub use storage::Storage;
pub use supervisor::{Boundary, BoundaryLevel, Fallback, Guarded, Recovery};
pub use timelock::{Clock, Countdown, FixedClock, SystemClock, TimeRemaining, TimelockStatus};
pub use toast::{Toast, ToastKind, ToastQueue};
pub use tracker::{TransactionTracker, TxPhase, TxRecord};
pub use units::{format_ether, parse_ether};

// Re-export commonly used chain primitives
pub use alloy_primitives::{Address, B256, U256};

// Common result type
pub type Result<T> = std::result::Result<T, PiggyBankError>;
