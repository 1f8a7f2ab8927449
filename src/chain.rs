//! Chain access seam
//!
//! The binding, event watcher and diagnostics only talk to the network
//! through `ChainClient`. `JsonRpcClient` is the production implementation;
//! `MockChain` backs the tests.

use std::future::Future;

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::error::PiggyBankError;

/// A value-carrying call to be signed and submitted by the wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub input: Bytes,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub success: bool,
    pub block_number: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<B256>,
    pub log_index: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    /// Any of these topic0 values matches.
    pub event_topics: Vec<B256>,
    pub from_block: u64,
    pub to_block: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub number: u64,
    pub timestamp: u64,
}

/// Read-contract / submit-transaction capability plus the chain metadata
/// diagnostics need.
pub trait ChainClient: Send + Sync + 'static {
    /// `eth_call` against the latest block.
    fn call(
        &self,
        to: Address,
        from: Option<Address>,
        data: Bytes,
    ) -> impl Future<Output = Result<Bytes, PiggyBankError>> + Send;

    /// Hand a transaction to the wallet; resolves with its hash once the
    /// wallet has accepted it.
    fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> impl Future<Output = Result<B256, PiggyBankError>> + Send;

    /// `None` while the transaction is not yet mined.
    fn transaction_receipt(
        &self,
        hash: B256,
    ) -> impl Future<Output = Result<Option<TransactionReceipt>, PiggyBankError>> + Send;

    fn logs(&self, filter: LogFilter)
        -> impl Future<Output = Result<Vec<Log>, PiggyBankError>> + Send;

    fn block_number(&self) -> impl Future<Output = Result<u64, PiggyBankError>> + Send;

    fn latest_block(&self) -> impl Future<Output = Result<BlockInfo, PiggyBankError>> + Send;

    fn chain_id(&self) -> impl Future<Output = Result<u64, PiggyBankError>> + Send;

    fn code(&self, address: Address)
        -> impl Future<Output = Result<Bytes, PiggyBankError>> + Send;
}
