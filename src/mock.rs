//! In-memory PiggyBank chain
//!
//! Answers the same calls as a node running the real contract: balances
//! per depositor, a single unlock time, an owner, aggregate stats and the
//! `Deposited` / `Withdrawn` logs. Used by the test suites of both
//! packages; counters let tests assert that no network call was made.

use std::sync::{Arc, Mutex, MutexGuard};

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolEvent, SolValue};

use crate::abi::IPiggyBank;
use crate::chain::{BlockInfo, ChainClient, Log, LogFilter, TransactionReceipt, TransactionRequest};
use crate::error::PiggyBankError;

#[derive(Debug, Default)]
struct MockState {
    contract: Address,
    owner: Address,
    unlock_time: u64,
    chain_id: u64,
    block_number: u64,
    block_timestamp: u64,
    deployed: bool,
    balances: Vec<(Address, U256)>,
    depositors: u64,
    total_deposits: U256,
    total_withdrawals: U256,
    emergency_mode: bool,
    logs: Vec<Log>,
    receipts: Vec<TransactionReceipt>,
    sent: Vec<TransactionRequest>,
    read_calls: u64,
    fail_reads: bool,
    reject_sends: Option<String>,
    revert_writes: bool,
    hold_receipts: bool,
    failing_receipt_lookups: u32,
    revert_calls: bool,
}

impl MockState {
    fn balance_of(&self, who: Address) -> U256 {
        self.balances
            .iter()
            .find(|(a, _)| *a == who)
            .map(|(_, b)| *b)
            .unwrap_or(U256::ZERO)
    }

    fn set_balance(&mut self, who: Address, amount: U256) {
        match self.balances.iter_mut().find(|(a, _)| *a == who) {
            Some(entry) => entry.1 = amount,
            None => {
                self.depositors += 1;
                self.balances.push((who, amount));
            }
        }
    }

    fn contract_balance(&self) -> U256 {
        self.balances
            .iter()
            .fold(U256::ZERO, |acc, (_, b)| acc + *b)
    }

    fn push_log(&mut self, topic0: B256, actor: Address, amount: U256, tx_hash: B256) {
        let log_index = self.logs.len() as u64;
        self.logs.push(Log {
            address: self.contract,
            topics: vec![topic0, actor.into_word()],
            data: Bytes::from(amount.abi_encode()),
            block_number: Some(self.block_number),
            transaction_hash: Some(tx_hash),
            log_index: Some(log_index),
        });
    }
}

/// Cheap to clone; clones share state.
#[derive(Clone, Debug)]
pub struct MockChain {
    state: Arc<Mutex<MockState>>,
}

impl MockChain {
    pub fn new(contract: Address, owner: Address, unlock_time: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                contract,
                owner,
                unlock_time,
                chain_id: 84532,
                block_number: 1,
                block_timestamp: 1_700_000_000,
                deployed: true,
                ..Default::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the state from the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_balance(&self, who: Address, amount: U256) {
        self.state().set_balance(who, amount);
    }

    pub fn balance_of(&self, who: Address) -> U256 {
        self.state().balance_of(who)
    }

    pub fn set_unlock_time(&self, unlock_time: u64) {
        self.state().unlock_time = unlock_time;
    }

    /// Timestamp of the latest block; the contract compares it with the
    /// unlock time.
    pub fn set_block_timestamp(&self, timestamp: u64) {
        self.state().block_timestamp = timestamp;
    }

    pub fn set_emergency_mode(&self, on: bool) {
        self.state().emergency_mode = on;
    }

    pub fn set_deployed(&self, deployed: bool) {
        self.state().deployed = deployed;
    }

    /// Make every read fail with a network error.
    pub fn set_fail_reads(&self, fail: bool) {
        self.state().fail_reads = fail;
    }

    /// Make every `eth_call` revert while the contract code stays deployed.
    pub fn set_revert_calls(&self, revert: bool) {
        self.state().revert_calls = revert;
    }

    /// Make the wallet refuse the next submissions with `reason`.
    pub fn set_reject_sends(&self, reason: Option<&str>) {
        self.state().reject_sends = reason.map(str::to_string);
    }

    /// Mine writes with a failed status.
    pub fn set_revert_writes(&self, revert: bool) {
        self.state().revert_writes = revert;
    }

    /// Keep receipts unavailable until `release_receipts` is called.
    pub fn set_hold_receipts(&self, hold: bool) {
        self.state().hold_receipts = hold;
    }

    /// Make the next `count` receipt lookups fail with a network error.
    pub fn set_failing_receipt_lookups(&self, count: u32) {
        self.state().failing_receipt_lookups = count;
    }

    pub fn release_receipts(&self) {
        self.state().hold_receipts = false;
    }

    /// Emit an event from another account, as if mined by someone else.
    pub fn emit_deposit(&self, depositor: Address, amount: U256) {
        let mut state = self.state();
        state.block_number += 1;
        let current = state.balance_of(depositor);
        state.set_balance(depositor, current + amount);
        state.total_deposits += amount;
        let hash = keccak256(format!("external-{}", state.logs.len()));
        state.push_log(IPiggyBank::Deposited::SIGNATURE_HASH, depositor, amount, hash);
    }

    pub fn mine_block(&self) {
        let mut state = self.state();
        state.block_number += 1;
        state.block_timestamp += 2;
    }

    pub fn sent_transactions(&self) -> Vec<TransactionRequest> {
        self.state().sent.clone()
    }

    pub fn read_calls(&self) -> u64 {
        self.state().read_calls
    }

    fn apply_write(state: &mut MockState, tx: &TransactionRequest, hash: B256) -> bool {
        if state.revert_writes {
            return false;
        }
        let selector: [u8; 4] = match tx.input.get(..4).and_then(|s| s.try_into().ok()) {
            Some(selector) => selector,
            None => return false,
        };

        if selector == IPiggyBank::depositCall::SELECTOR {
            if tx.value.is_zero() {
                return false;
            }
            let current = state.balance_of(tx.from);
            state.set_balance(tx.from, current + tx.value);
            state.total_deposits += tx.value;
            state.push_log(IPiggyBank::Deposited::SIGNATURE_HASH, tx.from, tx.value, hash);
            true
        } else if selector == IPiggyBank::withdrawCall::SELECTOR
            || selector == IPiggyBank::withdrawAllCall::SELECTOR
        {
            let current = state.balance_of(tx.from);
            if current.is_zero() || state.block_timestamp < state.unlock_time {
                return false;
            }
            state.set_balance(tx.from, U256::ZERO);
            state.total_withdrawals += current;
            state.push_log(IPiggyBank::Withdrawn::SIGNATURE_HASH, tx.from, current, hash);
            true
        } else {
            false
        }
    }
}

impl ChainClient for MockChain {
    async fn call(
        &self,
        to: Address,
        from: Option<Address>,
        data: Bytes,
    ) -> Result<Bytes, PiggyBankError> {
        let mut state = self.state();
        state.read_calls += 1;
        if state.fail_reads {
            return Err(PiggyBankError::network("mock chain unreachable"));
        }
        if to != state.contract || !state.deployed {
            return Ok(Bytes::new());
        }
        if state.revert_calls {
            return Err(PiggyBankError::network("execution reverted"));
        }
        let selector: [u8; 4] = data
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| PiggyBankError::abi("calldata shorter than a selector"))?;

        let encoded = if selector == IPiggyBank::getBalanceCall::SELECTOR {
            let who = from.unwrap_or(Address::ZERO);
            state.balance_of(who).abi_encode()
        } else if selector == IPiggyBank::unlockTimeCall::SELECTOR {
            U256::from(state.unlock_time).abi_encode()
        } else if selector == IPiggyBank::ownerCall::SELECTOR {
            state.owner.abi_encode()
        } else if selector == IPiggyBank::getContractStatsCall::SELECTOR {
            (
                state.total_deposits,
                state.total_withdrawals,
                U256::from(state.depositors),
                state.emergency_mode,
                state.contract_balance(),
            )
                .abi_encode_params()
        } else {
            return Err(PiggyBankError::network("execution reverted"));
        };
        Ok(Bytes::from(encoded))
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256, PiggyBankError> {
        let mut state = self.state();
        if let Some(reason) = state.reject_sends.clone() {
            return Err(PiggyBankError::transaction(reason));
        }
        let hash = keccak256(format!("tx-{}", state.sent.len()));
        state.sent.push(tx.clone());
        state.block_number += 1;
        let success = Self::apply_write(&mut state, &tx, hash);
        let block_number = Some(state.block_number);
        state.receipts.push(TransactionReceipt {
            transaction_hash: hash,
            success,
            block_number,
        });
        Ok(hash)
    }

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, PiggyBankError> {
        let mut state = self.state();
        if state.failing_receipt_lookups > 0 {
            state.failing_receipt_lookups -= 1;
            return Err(PiggyBankError::network("connection reset"));
        }
        if state.hold_receipts {
            return Ok(None);
        }
        Ok(state
            .receipts
            .iter()
            .find(|r| r.transaction_hash == hash)
            .cloned())
    }

    async fn logs(&self, filter: LogFilter) -> Result<Vec<Log>, PiggyBankError> {
        let state = self.state();
        if state.fail_reads {
            return Err(PiggyBankError::network("mock chain unreachable"));
        }
        Ok(state
            .logs
            .iter()
            .filter(|log| log.address == filter.address)
            .filter(|log| {
                log.topics
                    .first()
                    .map(|t| filter.event_topics.contains(t))
                    .unwrap_or(false)
            })
            .filter(|log| {
                let n = log.block_number.unwrap_or(0);
                n >= filter.from_block && n <= filter.to_block
            })
            .cloned()
            .collect())
    }

    async fn block_number(&self) -> Result<u64, PiggyBankError> {
        let state = self.state();
        if state.fail_reads {
            return Err(PiggyBankError::network("mock chain unreachable"));
        }
        Ok(state.block_number)
    }

    async fn latest_block(&self) -> Result<BlockInfo, PiggyBankError> {
        let state = self.state();
        if state.fail_reads {
            return Err(PiggyBankError::network("mock chain unreachable"));
        }
        Ok(BlockInfo {
            number: state.block_number,
            timestamp: state.block_timestamp,
        })
    }

    async fn chain_id(&self) -> Result<u64, PiggyBankError> {
        let state = self.state();
        if state.fail_reads {
            return Err(PiggyBankError::network("mock chain unreachable"));
        }
        Ok(state.chain_id)
    }

    async fn code(&self, address: Address) -> Result<Bytes, PiggyBankError> {
        let state = self.state();
        if state.fail_reads {
            return Err(PiggyBankError::network("mock chain unreachable"));
        }
        if address == state.contract && state.deployed {
            Ok(Bytes::from_static(&[0x60, 0x80, 0x60, 0x40]))
        } else {
            Ok(Bytes::new())
        }
    }
}
