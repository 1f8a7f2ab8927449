//! High-level PiggyBank contract binding
//!
//! Holds the last successfully read contract state for the connected
//! account and submits the write calls. Reads are explicit (`refresh`);
//! after a confirmed write or a matching contract event a refetch is
//! scheduled through a debouncer so bursts collapse into one round of
//! reads.

use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::abi::{self, ContractStats, WriteCall};
use crate::chain::{ChainClient, TransactionRequest};
use crate::debounce::Debouncer;
use crate::diagnostics::{LastTransactionLog, LastTransactionStatus};
use crate::error::{PiggyBankError, PreconditionError};
use crate::timelock::{self, Clock, TimelockStatus};
use crate::tracker::TransactionTracker;
use crate::units::format_ether;
use crate::validation::{validate_deposit_amount, DepositLimits};

/// Refreshes slower than this are logged.
const SLOW_REFRESH: Duration = Duration::from_millis(100);

/// Tunables of a binding.
#[derive(Clone, Debug)]
pub struct BindingOptions {
    pub deposit_limits: DepositLimits,
    pub refetch_debounce: Duration,
    pub receipt_poll_interval: Duration,
    /// Where each submission is recorded for diagnostics
    pub last_transaction: Option<LastTransactionLog>,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self {
            deposit_limits: DepositLimits::default(),
            refetch_debounce: Duration::from_secs(1),
            receipt_poll_interval: Duration::from_secs(2),
            last_transaction: None,
        }
    }
}

/// Cached contract state as of the last successful reads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractState {
    /// Connected account's balance in wei
    pub balance: Option<U256>,
    /// `None` when the contract reports no unlock time
    pub unlock_time: Option<u64>,
    pub owner: Option<Address>,
    /// Only populated while the connected account owns the contract
    pub stats: Option<ContractStats>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl ContractState {
    pub fn balance_display(&self) -> Option<String> {
        self.balance.map(format_ether)
    }
}

/// A write handed to the wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub call: WriteCall,
    pub tx_hash: B256,
}

struct Shared<C: ChainClient> {
    client: Arc<C>,
    address: Address,
    account: RwLock<Option<Address>>,
    state: RwLock<ContractState>,
    unlock_time: watch::Sender<Option<u64>>,
    tracker: TransactionTracker,
    debouncer: Debouncer,
    receipt_watchers: Mutex<Vec<JoinHandle<()>>>,
    options: BindingOptions,
    clock: Arc<dyn Clock>,
}

/// Binding of one deployed PiggyBank contract.
///
/// Dropping the binding cancels the scheduled refetch and every receipt
/// watcher it started.
pub struct PiggyBankContract<C: ChainClient> {
    shared: Arc<Shared<C>>,
}

impl<C: ChainClient> PiggyBankContract<C> {
    pub fn new(
        client: Arc<C>,
        address: Address,
        tracker: TransactionTracker,
        clock: Arc<dyn Clock>,
        options: BindingOptions,
    ) -> Self {
        let (unlock_time, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                client,
                address,
                account: RwLock::new(None),
                state: RwLock::new(ContractState::default()),
                unlock_time,
                tracker,
                debouncer: Debouncer::new(options.refetch_debounce),
                receipt_watchers: Mutex::new(Vec::new()),
                options,
                clock,
            }),
        }
    }

    pub fn address(&self) -> Address {
        self.shared.address
    }

    pub fn tracker(&self) -> &TransactionTracker {
        &self.shared.tracker
    }

    pub fn options(&self) -> &BindingOptions {
        &self.shared.options
    }

    // ========================================================================
    // Account
    // ========================================================================

    pub fn account(&self) -> Option<Address> {
        *self.shared.account()
    }

    /// Switch the connected account. Account-scoped cache is cleared.
    pub fn connect(&self, account: Address) {
        // State before account, the same order `refresh` takes them in.
        let mut state = self.shared.state_mut();
        let previous = self.shared.account_mut().replace(account);
        if previous != Some(account) {
            state.balance = None;
            state.stats = None;
            log::info!("Connected account {}", account);
        }
    }

    pub fn disconnect(&self) {
        let mut state = self.shared.state_mut();
        if self.shared.account_mut().take().is_some() {
            state.balance = None;
            state.stats = None;
            log::info!("Account disconnected");
        }
    }

    /// Whether the connected account owns the contract.
    pub fn is_owner(&self) -> bool {
        self.shared.is_owner()
    }

    // ========================================================================
    // State
    // ========================================================================

    pub fn state(&self) -> ContractState {
        self.shared.state().clone()
    }

    pub fn balance(&self) -> Option<U256> {
        self.shared.state().balance
    }

    pub fn unlock_time(&self) -> Option<u64> {
        self.shared.state().unlock_time
    }

    pub fn owner(&self) -> Option<Address> {
        self.shared.state().owner
    }

    /// Owner-only aggregate figures from the cache.
    pub fn admin_stats(&self) -> Result<Option<ContractStats>, PiggyBankError> {
        if self.shared.account().is_none() {
            return Err(PreconditionError::NotConnected.into());
        }
        if !self.is_owner() {
            return Err(PreconditionError::NotOwner.into());
        }
        Ok(self.shared.state().stats.clone())
    }

    /// Unlock time updates, for `timelock::Countdown`.
    pub fn unlock_time_watch(&self) -> watch::Receiver<Option<u64>> {
        self.shared.unlock_time.subscribe()
    }

    pub fn timelock(&self) -> TimelockStatus {
        self.shared.timelock()
    }

    /// Re-read contract state. Values whose read failed keep their cached
    /// value; the first failure is returned.
    pub async fn refresh(&self) -> Result<ContractState, PiggyBankError> {
        self.shared.refresh().await
    }

    /// Schedule a debounced refetch.
    pub fn schedule_refetch(&self) {
        Shared::schedule_refetch(&self.shared);
    }

    pub fn refetch_scheduled(&self) -> bool {
        self.shared.debouncer.is_scheduled()
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Deposit `amount` ether. Invalid amounts never reach the wallet.
    pub async fn deposit(&self, amount: &str) -> Result<Submission, PiggyBankError> {
        let value = validate_deposit_amount(amount, &self.shared.options.deposit_limits)?;
        let from = self.shared.require_account()?;
        log::info!("Depositing {} ETH from {}", format_ether(value), from);
        self.submit(WriteCall::Deposit, from, value).await
    }

    /// Withdraw the connected account's balance once unlocked.
    pub async fn withdraw(&self) -> Result<Submission, PiggyBankError> {
        let from = self.shared.require_withdrawable()?;
        self.submit(WriteCall::Withdraw, from, U256::ZERO).await
    }

    pub async fn withdraw_all(&self) -> Result<Submission, PiggyBankError> {
        let from = self.shared.require_withdrawable()?;
        self.submit(WriteCall::WithdrawAll, from, U256::ZERO).await
    }

    async fn submit(
        &self,
        call: WriteCall,
        from: Address,
        value: U256,
    ) -> Result<Submission, PiggyBankError> {
        let shared = &self.shared;
        let id = shared.tracker.begin(call);
        let tx = TransactionRequest {
            from,
            to: shared.address,
            value,
            input: call.calldata(),
        };

        let tx_hash = match shared.client.send_transaction(tx).await {
            Ok(hash) => hash,
            Err(e) => {
                log::error!("❌ {} submission failed: {}", call.label(), e);
                shared.tracker.fail(&id, failure_reason(&e));
                return Err(e);
            }
        };

        log::info!("📤 {} submitted: {}", call.label(), tx_hash);
        shared.tracker.confirming(&id, tx_hash);
        shared.record_last_transaction(tx_hash, call, LastTransactionStatus::Pending);
        Shared::watch_receipt(shared, id.clone(), call, tx_hash);

        Ok(Submission { id, call, tx_hash })
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// React to a `Deposited` / `Withdrawn` event emitted by `actor`.
    ///
    /// Always refetches right away; an event from the connected account
    /// also schedules the debounced refetch.
    pub async fn handle_event(&self, actor: Address) -> Result<(), PiggyBankError> {
        if self.account() == Some(actor) {
            self.schedule_refetch();
        }
        self.refresh().await.map(|_| ())
    }

    /// Cancel the scheduled refetch and all receipt watchers.
    pub fn teardown(&self) {
        self.shared.teardown();
    }
}

impl<C: ChainClient> Drop for PiggyBankContract<C> {
    fn drop(&mut self) {
        self.shared.teardown();
    }
}

impl<C: ChainClient> Shared<C> {
    fn account(&self) -> RwLockReadGuard<'_, Option<Address>> {
        self.account.read().unwrap_or_else(|e| e.into_inner())
    }

    fn account_mut(&self) -> RwLockWriteGuard<'_, Option<Address>> {
        self.account.write().unwrap_or_else(|e| e.into_inner())
    }

    fn state(&self) -> RwLockReadGuard<'_, ContractState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, ContractState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn is_owner(&self) -> bool {
        let account = *self.account();
        let owner = self.state().owner;
        match (account, owner) {
            (Some(account), Some(owner)) => account == owner,
            _ => false,
        }
    }

    fn timelock(&self) -> TimelockStatus {
        timelock::derive(self.state().unlock_time, self.clock.now())
    }

    fn require_account(&self) -> Result<Address, PiggyBankError> {
        let account = *self.account();
        account.ok_or_else(|| PreconditionError::NotConnected.into())
    }

    fn require_withdrawable(&self) -> Result<Address, PiggyBankError> {
        let from = self.require_account()?;
        if !self.timelock().is_unlocked {
            return Err(PreconditionError::FundsLocked.into());
        }
        if self.state().balance.unwrap_or(U256::ZERO).is_zero() {
            return Err(PreconditionError::NoFunds.into());
        }
        Ok(from)
    }

    async fn refresh(&self) -> Result<ContractState, PiggyBankError> {
        let started = tokio::time::Instant::now();
        let result = loop {
            if let Some(result) = self.read_round().await {
                break result;
            }
            log::debug!("Connected account changed during refresh, reading again");
        };
        let elapsed = started.elapsed();
        if elapsed > SLOW_REFRESH {
            log::warn!("🐢 Contract refresh took {}ms", elapsed.as_millis());
        }
        result
    }

    /// One round of reads. `None` when the connected account changed while
    /// its balance or stats were in flight; nothing account-scoped was
    /// stored in that case.
    async fn read_round(&self) -> Option<Result<ContractState, PiggyBankError>> {
        let account = *self.account();
        let to = self.address;

        let unlock_read = async {
            let raw = self.client.call(to, None, abi::unlock_time_calldata()).await?;
            abi::decode_unlock_time(&raw)
        };
        let owner_read = async {
            let raw = self.client.call(to, None, abi::owner_calldata()).await?;
            abi::decode_owner(&raw)
        };
        let balance_read = async {
            match account {
                Some(from) => {
                    let raw = self
                        .client
                        .call(to, Some(from), abi::get_balance_calldata())
                        .await?;
                    abi::decode_balance(&raw).map(Some)
                }
                None => Ok(None),
            }
        };
        let (unlock, owner, balance) = tokio::join!(unlock_read, owner_read, balance_read);

        let mut first_error: Option<PiggyBankError> = None;
        let mut note = |e: PiggyBankError| {
            log::warn!("⚠️  Contract read failed, keeping cached value: {}", e);
            first_error.get_or_insert(e);
        };

        let switched = {
            let mut state = self.state_mut();
            match unlock {
                // Zero means the contract has no unlock time set.
                Ok(raw) => state.unlock_time = u64::try_from(raw).ok().filter(|t| *t != 0),
                Err(e) => note(e),
            }
            match owner {
                Ok(owner) => state.owner = Some(owner),
                Err(e) => note(e),
            }
            // Checked under the state lock; `connect` holds it while swapping.
            let switched = *self.account() != account;
            if !switched {
                match balance {
                    Ok(Some(balance)) => state.balance = Some(balance),
                    Ok(None) => state.balance = None,
                    Err(e) => note(e),
                }
            }
            switched
        };
        if switched {
            return None;
        }

        if self.is_owner() {
            let stats = async {
                let raw = self
                    .client
                    .call(to, account, abi::contract_stats_calldata())
                    .await?;
                abi::decode_contract_stats(&raw)
            }
            .await;
            let mut state = self.state_mut();
            if *self.account() != account {
                return None;
            }
            match stats {
                Ok(stats) => state.stats = Some(stats),
                Err(e) => note(e),
            }
        } else {
            self.state_mut().stats = None;
        }

        let unlock_time = {
            let mut state = self.state_mut();
            if first_error.is_none() {
                state.refreshed_at = Some(Utc::now());
            }
            state.unlock_time
        };
        self.unlock_time.send_if_modified(|current| {
            if *current != unlock_time {
                *current = unlock_time;
                true
            } else {
                false
            }
        });

        Some(match first_error {
            Some(e) => Err(e),
            None => Ok(self.state().clone()),
        })
    }

    fn schedule_refetch(shared: &Arc<Self>) {
        let weak = Arc::downgrade(shared);
        shared.debouncer.trigger(move || async move {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            if let Err(e) = shared.refresh().await {
                log::warn!("Debounced refetch failed: {}", e);
            }
        });
    }

    /// Poll for the receipt until it arrives or the wallet reports the
    /// transaction failed. Network errors are retried at the next interval.
    fn watch_receipt(shared: &Arc<Self>, id: String, call: WriteCall, tx_hash: B256) {
        let weak: Weak<Self> = Arc::downgrade(shared);
        let interval = shared.options.receipt_poll_interval;

        let handle = tokio::spawn(async move {
            loop {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                match shared.client.transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => {
                        let status = if receipt.success {
                            log::info!("✅ {} confirmed: {}", call.label(), tx_hash);
                            shared.tracker.succeed(&id);
                            LastTransactionStatus::Success
                        } else {
                            log::error!("❌ {} reverted: {}", call.label(), tx_hash);
                            shared.tracker.fail(&id, "Transaction reverted");
                            LastTransactionStatus::Error
                        };
                        shared.record_last_transaction(tx_hash, call, status);
                        Self::schedule_refetch(&shared);
                        return;
                    }
                    Ok(None) => {}
                    // A dropped read says nothing about the transaction.
                    Err(PiggyBankError::Network(e)) => {
                        log::warn!("Receipt lookup for {} failed, retrying: {}", tx_hash, e);
                    }
                    Err(e) => {
                        log::error!("❌ {} failed: {}: {}", call.label(), tx_hash, e);
                        shared.tracker.fail(&id, failure_reason(&e));
                        shared.record_last_transaction(tx_hash, call, LastTransactionStatus::Error);
                        Self::schedule_refetch(&shared);
                        return;
                    }
                }
                drop(shared);
                tokio::time::sleep(interval).await;
            }
        });

        let mut watchers = shared
            .receipt_watchers
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        watchers.retain(|h| !h.is_finished());
        watchers.push(handle);
    }

    fn record_last_transaction(&self, hash: B256, call: WriteCall, status: LastTransactionStatus) {
        if let Some(log) = &self.options.last_transaction {
            if let Err(e) = log.save(hash, call, status) {
                log::warn!("Could not store last transaction: {}", e);
            }
        }
    }

    fn teardown(&self) {
        self.debouncer.cancel();
        let mut watchers = self
            .receipt_watchers
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        for handle in watchers.drain(..) {
            handle.abort();
        }
    }
}

/// Message shown to the user for a failed write.
fn failure_reason(error: &PiggyBankError) -> String {
    match error {
        PiggyBankError::Transaction(msg) | PiggyBankError::Network(msg) => msg.clone(),
        other => other.to_string(),
    }
}
