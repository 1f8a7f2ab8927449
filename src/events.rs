//! Contract event watching
//!
//! Polls `Deposited` / `Withdrawn` logs from the block after the last one
//! seen, records them as recent transactions and forwards each to the
//! binding.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::abi::{watched_event_topics, IPiggyBank};
use crate::binding::PiggyBankContract;
use crate::chain::{ChainClient, Log, LogFilter};
use crate::error::PiggyBankError;

/// Observed transactions kept in memory.
pub const MAX_RECENT_TRANSACTIONS: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

/// A deposit or withdrawal seen on chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedTransaction {
    pub id: String,
    pub kind: TransactionKind,
    pub actor: Address,
    /// Wei
    pub amount: U256,
    pub timestamp: DateTime<Utc>,
    pub tx_hash: Option<B256>,
    pub block_number: Option<u64>,
}

impl ObservedTransaction {
    /// Decode a watched log. Logs of other events are an error.
    pub fn from_log(log: &Log) -> Result<Self, PiggyBankError> {
        let topic0 = log
            .topics
            .first()
            .copied()
            .ok_or_else(|| PiggyBankError::abi("log without topics"))?;

        let (kind, actor, amount) = if topic0 == IPiggyBank::Deposited::SIGNATURE_HASH {
            let event =
                IPiggyBank::Deposited::decode_raw_log(log.topics.iter().copied(), &log.data, true)?;
            (TransactionKind::Deposit, event.depositor, event.amount)
        } else if topic0 == IPiggyBank::Withdrawn::SIGNATURE_HASH {
            let event =
                IPiggyBank::Withdrawn::decode_raw_log(log.topics.iter().copied(), &log.data, true)?;
            (TransactionKind::Withdrawal, event.withdrawer, event.amount)
        } else {
            return Err(PiggyBankError::abi(format!("unexpected event topic {}", topic0)));
        };

        let id = match (log.transaction_hash, log.log_index) {
            (Some(hash), Some(index)) => format!("{}-{}", hash, index),
            _ => uuid::Uuid::new_v4().to_string(),
        };

        Ok(Self {
            id,
            kind,
            actor,
            amount,
            timestamp: Utc::now(),
            tx_hash: log.transaction_hash,
            block_number: log.block_number,
        })
    }
}

/// Most recent observed transactions, newest first.
#[derive(Clone, Default)]
pub struct RecentTransactions {
    entries: Arc<RwLock<VecDeque<ObservedTransaction>>>,
}

impl RecentTransactions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if a transaction with the same id was already recorded.
    pub fn record(&self, tx: ObservedTransaction) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.iter().any(|t| t.id == tx.id) {
            return false;
        }
        entries.push_front(tx);
        entries.truncate(MAX_RECENT_TRANSACTIONS);
        true
    }

    pub fn list(&self) -> Vec<ObservedTransaction> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Incremental log reader for one contract.
pub struct EventPoller<C: ChainClient> {
    client: Arc<C>,
    address: Address,
    next_block: Option<u64>,
}

impl<C: ChainClient> EventPoller<C> {
    pub fn new(client: Arc<C>, address: Address) -> Self {
        Self {
            client,
            address,
            next_block: None,
        }
    }

    /// Start reading from `block` instead of the current head.
    pub fn starting_at(mut self, block: u64) -> Self {
        self.next_block = Some(block);
        self
    }

    /// Fetch logs mined since the previous poll. The first poll only
    /// records the chain head.
    pub async fn poll(&mut self) -> Result<Vec<ObservedTransaction>, PiggyBankError> {
        let head = self.client.block_number().await?;
        let Some(from_block) = self.next_block else {
            self.next_block = Some(head + 1);
            return Ok(Vec::new());
        };
        if from_block > head {
            return Ok(Vec::new());
        }

        let logs = self
            .client
            .logs(LogFilter {
                address: self.address,
                event_topics: watched_event_topics(),
                from_block,
                to_block: head,
            })
            .await?;
        self.next_block = Some(head + 1);

        Ok(logs
            .iter()
            .filter_map(|log| match ObservedTransaction::from_log(log) {
                Ok(tx) => Some(tx),
                Err(e) => {
                    log::warn!("Skipping undecodable log: {}", e);
                    None
                }
            })
            .collect())
    }
}

/// Background polling task; stops when dropped or when the binding goes
/// away.
pub struct EventWatcher {
    task: JoinHandle<()>,
}

impl EventWatcher {
    pub fn spawn<C: ChainClient>(
        mut poller: EventPoller<C>,
        binding: Weak<PiggyBankContract<C>>,
        recent: RecentTransactions,
        interval: Duration,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let observed = match poller.poll().await {
                    Ok(observed) => observed,
                    Err(e) => {
                        log::warn!("⚠️  Event poll failed, retrying next tick: {}", e);
                        continue;
                    }
                };

                for tx in observed {
                    log::info!(
                        "📥 {:?} of {} by {}",
                        tx.kind,
                        crate::units::format_ether(tx.amount),
                        tx.actor
                    );
                    let actor = tx.actor;
                    if !recent.record(tx) {
                        continue;
                    }
                    let Some(binding) = binding.upgrade() else {
                        log::debug!("Binding dropped, stopping event watcher");
                        return;
                    };
                    if let Err(e) = binding.handle_event(actor).await {
                        log::warn!("Refetch after event failed: {}", e);
                    }
                }
            }
        });

        Self { task }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for EventWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockChain;

    fn sample(id: usize) -> ObservedTransaction {
        ObservedTransaction {
            id: id.to_string(),
            kind: TransactionKind::Deposit,
            actor: Address::ZERO,
            amount: U256::from(id as u64),
            timestamp: Utc::now(),
            tx_hash: None,
            block_number: None,
        }
    }

    #[test]
    fn test_recent_transactions_capped_newest_first() {
        let recent = RecentTransactions::new();
        for i in 0..60 {
            assert!(recent.record(sample(i)));
        }
        let list = recent.list();
        assert_eq!(list.len(), MAX_RECENT_TRANSACTIONS);
        assert_eq!(list[0].id, "59");
        assert_eq!(list[49].id, "10");
        assert!(!recent.record(sample(59)));
    }

    #[tokio::test]
    async fn test_poller_reads_only_new_logs() {
        let contract = Address::repeat_byte(0xc0);
        let chain = MockChain::new(contract, Address::repeat_byte(0x0a), 0);
        let mut poller = EventPoller::new(Arc::new(chain.clone()), contract);

        let depositor = Address::repeat_byte(0x44);
        chain.emit_deposit(depositor, U256::from(3u64));
        assert!(poller.poll().await.unwrap().is_empty());

        chain.emit_deposit(depositor, U256::from(5u64));
        let observed = poller.poll().await.unwrap();
        assert_eq!(observed.len(), 1);
        assert_eq!(observed[0].kind, TransactionKind::Deposit);
        assert_eq!(observed[0].actor, depositor);
        assert_eq!(observed[0].amount, U256::from(5u64));

        assert!(poller.poll().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_poller_from_explicit_block() {
        let contract = Address::repeat_byte(0xc0);
        let chain = MockChain::new(contract, Address::repeat_byte(0x0a), 0);
        chain.emit_deposit(Address::repeat_byte(0x44), U256::from(1u64));

        let mut poller = EventPoller::new(Arc::new(chain), contract).starting_at(0);
        assert_eq!(poller.poll().await.unwrap().len(), 1);
    }

    #[test]
    fn test_foreign_topic_rejected() {
        let log = Log {
            address: Address::ZERO,
            topics: vec![B256::repeat_byte(1)],
            data: Default::default(),
            block_number: None,
            transaction_hash: None,
            log_index: None,
        };
        assert!(matches!(
            ObservedTransaction::from_log(&log),
            Err(PiggyBankError::Abi(_))
        ));
    }
}
