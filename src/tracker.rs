//! Transaction lifecycle tracking
//!
//! Every submitted action walks `idle -> pending -> (confirming) ->
//! success | error`. Entering pending, success or error enqueues a toast
//! keyed by the action's id.

use std::sync::{Arc, Mutex, MutexGuard};

use alloy_primitives::B256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::abi::WriteCall;
use crate::toast::{ToastKind, ToastQueue};

/// Actions kept for inspection.
const MAX_RECORDS: usize = 50;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxPhase {
    #[default]
    Idle,
    Pending,
    Confirming,
    Success,
    Error,
}

impl TxPhase {
    pub fn can_transition_to(&self, next: TxPhase) -> bool {
        use TxPhase::*;
        matches!(
            (self, next),
            (Idle, Pending)
                | (Pending, Confirming)
                | (Pending, Success)
                | (Pending, Error)
                | (Confirming, Success)
                | (Confirming, Error)
        )
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirming)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub id: String,
    pub call: WriteCall,
    pub phase: TxPhase,
    pub tx_hash: Option<B256>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TransactionTracker {
    records: Arc<Mutex<Vec<TxRecord>>>,
    latest: Arc<watch::Sender<TxPhase>>,
    toasts: ToastQueue,
}

impl TransactionTracker {
    pub fn new(toasts: ToastQueue) -> Self {
        let (latest, _) = watch::channel(TxPhase::Idle);
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            latest: Arc::new(latest),
            toasts,
        }
    }

    fn records(&self) -> MutexGuard<'_, Vec<TxRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    /// Phase of the most recently started action.
    pub fn latest_phase(&self) -> TxPhase {
        *self.latest.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<TxPhase> {
        self.latest.subscribe()
    }

    pub fn record(&self, id: &str) -> Option<TxRecord> {
        self.records().iter().find(|r| r.id == id).cloned()
    }

    /// Newest first.
    pub fn records_snapshot(&self) -> Vec<TxRecord> {
        self.records().iter().rev().cloned().collect()
    }

    /// Start tracking a new action in the pending phase.
    pub fn begin(&self, call: WriteCall) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        {
            let mut records = self.records();
            records.push(TxRecord {
                id: id.clone(),
                call,
                phase: TxPhase::Idle,
                tx_hash: None,
                error: None,
                updated_at: Utc::now(),
            });
            if records.len() > MAX_RECORDS {
                let excess = records.len() - MAX_RECORDS;
                records.drain(..excess);
            }
        }
        self.transition(&id, TxPhase::Pending, None, None);
        id
    }

    /// The wallet accepted the transaction.
    pub fn confirming(&self, id: &str, hash: B256) -> bool {
        self.transition(id, TxPhase::Confirming, Some(hash), None)
    }

    pub fn succeed(&self, id: &str) -> bool {
        self.transition(id, TxPhase::Success, None, None)
    }

    pub fn fail(&self, id: &str, reason: impl Into<String>) -> bool {
        self.transition(id, TxPhase::Error, None, Some(reason.into()))
    }

    fn transition(
        &self,
        id: &str,
        next: TxPhase,
        hash: Option<B256>,
        error: Option<String>,
    ) -> bool {
        let (call, tx_hash, is_latest) = {
            let mut records = self.records();
            let is_latest = records.last().map(|r| r.id == id).unwrap_or(false);
            let Some(record) = records.iter_mut().find(|r| r.id == id) else {
                log::warn!("Transition to {:?} for unknown transaction {}", next, id);
                return false;
            };
            if !record.phase.can_transition_to(next) {
                log::warn!(
                    "Rejected transition {:?} -> {:?} for transaction {}",
                    record.phase,
                    next,
                    id
                );
                return false;
            }
            record.phase = next;
            if hash.is_some() {
                record.tx_hash = hash;
            }
            if error.is_some() {
                record.error = error.clone();
            }
            record.updated_at = Utc::now();
            (record.call, record.tx_hash, is_latest)
        };

        log::info!("Transaction {} ({}) -> {:?}", id, call.label(), next);

        match next {
            TxPhase::Pending => {
                self.toasts
                    .push(id, "Transaction submitted", ToastKind::Pending, None);
            }
            TxPhase::Confirming => {
                if let Some(hash) = tx_hash {
                    self.toasts.attach_hash(id, hash);
                }
            }
            TxPhase::Success => {
                self.toasts.push(
                    format!("{}:success", id),
                    "Transaction confirmed",
                    ToastKind::Success,
                    tx_hash,
                );
            }
            TxPhase::Error => {
                let reason = error.unwrap_or_else(|| "unknown error".to_string());
                self.toasts.push(
                    format!("{}:error", id),
                    format!("Transaction failed: {}", reason),
                    ToastKind::Error,
                    tx_hash,
                );
            }
            TxPhase::Idle => {}
        }

        if is_latest {
            self.latest.send_replace(next);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> TransactionTracker {
        TransactionTracker::new(ToastQueue::new(None))
    }

    #[tokio::test(start_paused = true)]
    async fn test_happy_path_with_toasts() {
        let tracker = tracker();
        let id = tracker.begin(WriteCall::Deposit);
        assert_eq!(tracker.latest_phase(), TxPhase::Pending);
        assert_eq!(tracker.toasts().list()[0].kind, ToastKind::Pending);

        let hash = B256::repeat_byte(7);
        assert!(tracker.confirming(&id, hash));
        assert_eq!(tracker.latest_phase(), TxPhase::Confirming);
        assert_eq!(tracker.toasts().list()[0].tx_hash, Some(hash));

        assert!(tracker.succeed(&id));
        assert_eq!(tracker.latest_phase(), TxPhase::Success);
        let toasts = tracker.toasts().list();
        assert_eq!(toasts.len(), 2);
        assert_eq!(toasts[1].id, format!("{}:success", id));
        assert_eq!(toasts[1].tx_hash, Some(hash));
        assert_eq!(tracker.record(&id).unwrap().tx_hash, Some(hash));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_from_pending() {
        let tracker = tracker();
        let id = tracker.begin(WriteCall::Withdraw);
        assert!(tracker.fail(&id, "User rejected the request"));

        let record = tracker.record(&id).unwrap();
        assert_eq!(record.phase, TxPhase::Error);
        assert_eq!(record.error.as_deref(), Some("User rejected the request"));
        let toast = tracker
            .toasts()
            .list()
            .into_iter()
            .find(|t| t.kind == ToastKind::Error)
            .unwrap();
        assert_eq!(toast.message, "Transaction failed: User rejected the request");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_transitions_rejected() {
        let tracker = tracker();
        let id = tracker.begin(WriteCall::Deposit);
        assert!(tracker.succeed(&id));
        assert!(!tracker.fail(&id, "late"));
        assert!(!tracker.confirming(&id, B256::ZERO));
        assert!(!tracker.succeed("missing"));
        assert_eq!(tracker.record(&id).unwrap().phase, TxPhase::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_phase_follows_newest_action() {
        let tracker = tracker();
        let first = tracker.begin(WriteCall::Deposit);
        let second = tracker.begin(WriteCall::Deposit);
        assert!(tracker.succeed(&first));
        assert_eq!(tracker.latest_phase(), TxPhase::Pending);
        assert!(tracker.fail(&second, "reverted"));
        assert_eq!(tracker.latest_phase(), TxPhase::Error);
    }

    #[test]
    fn test_phase_table() {
        assert!(TxPhase::Idle.can_transition_to(TxPhase::Pending));
        assert!(!TxPhase::Idle.can_transition_to(TxPhase::Success));
        assert!(!TxPhase::Success.can_transition_to(TxPhase::Pending));
        assert!(TxPhase::Confirming.is_in_flight());
        assert!(!TxPhase::Error.is_in_flight());
    }
}
