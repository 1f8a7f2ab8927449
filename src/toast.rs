//! Transient notification queue
//!
//! Each toast owns its own expiry timer. Replacing a toast restarts its
//! timer; dismissing it cancels only that timer. Dropping the last queue
//! handle cancels every outstanding timer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Pending,
    Success,
    Error,
}

impl ToastKind {
    pub fn ttl(&self) -> Duration {
        match self {
            Self::Pending => Duration::from_secs(10),
            Self::Success | Self::Error => Duration::from_secs(5),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toast {
    pub id: String,
    pub message: String,
    pub kind: ToastKind,
    pub tx_hash: Option<B256>,
    pub explorer_link: Option<String>,
}

#[derive(Default)]
struct Inner {
    toasts: Vec<Toast>,
    timers: HashMap<String, (u64, JoinHandle<()>)>,
    generation: u64,
}

impl Drop for Inner {
    fn drop(&mut self) {
        for (_, (_, timer)) in self.timers.drain() {
            timer.abort();
        }
    }
}

#[derive(Clone)]
pub struct ToastQueue {
    inner: Arc<Mutex<Inner>>,
    explorer_url: Option<String>,
}

impl ToastQueue {
    pub fn new(explorer_url: Option<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            explorer_url: explorer_url.map(|u| u.trim_end_matches('/').to_string()),
        }
    }

    fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
        inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn link_for(&self, hash: Option<B256>) -> Option<String> {
        match (&self.explorer_url, hash) {
            (Some(base), Some(hash)) => Some(format!("{}/tx/{}", base, hash)),
            _ => None,
        }
    }

    /// Enqueue a toast, replacing any toast with the same id.
    pub fn push(
        &self,
        id: impl Into<String>,
        message: impl Into<String>,
        kind: ToastKind,
        tx_hash: Option<B256>,
    ) {
        let toast = Toast {
            id: id.into(),
            message: message.into(),
            kind,
            tx_hash,
            explorer_link: self.link_for(tx_hash),
        };
        let id = toast.id.clone();

        let mut inner = Self::lock(&self.inner);
        if let Some((_, old)) = inner.timers.remove(&id) {
            old.abort();
        }
        inner.toasts.retain(|t| t.id != id);
        inner.toasts.push(toast);

        inner.generation += 1;
        let generation = inner.generation;
        let weak = Arc::downgrade(&self.inner);
        let timer_id = id.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(kind.ttl()).await;
            Self::expire(weak, &timer_id, generation);
        });
        inner.timers.insert(id, (generation, timer));
    }

    fn expire(inner: Weak<Mutex<Inner>>, id: &str, generation: u64) {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        let mut inner = Self::lock(&inner);
        // A replacement since this timer started owns the id now.
        if inner.timers.get(id).map(|(g, _)| *g) != Some(generation) {
            return;
        }
        inner.timers.remove(id);
        inner.toasts.retain(|t| t.id != id);
        log::debug!("Toast {} expired", id);
    }

    /// Attach a transaction hash to a live toast without touching its timer.
    pub fn attach_hash(&self, id: &str, hash: B256) {
        let link = self.link_for(Some(hash));
        let mut inner = Self::lock(&self.inner);
        if let Some(toast) = inner.toasts.iter_mut().find(|t| t.id == id) {
            toast.tx_hash = Some(hash);
            toast.explorer_link = link;
        }
    }

    /// Remove a toast early. Returns false if it had already gone.
    pub fn dismiss(&self, id: &str) -> bool {
        let mut inner = Self::lock(&self.inner);
        if let Some((_, timer)) = inner.timers.remove(id) {
            timer.abort();
        }
        let before = inner.toasts.len();
        inner.toasts.retain(|t| t.id != id);
        inner.toasts.len() != before
    }

    /// Live toasts in insertion order.
    pub fn list(&self) -> Vec<Toast> {
        Self::lock(&self.inner).toasts.clone()
    }

    pub fn is_empty(&self) -> bool {
        Self::lock(&self.inner).toasts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_expires_after_ten_seconds() {
        let queue = ToastQueue::new(None);
        queue.push("a", "Transaction submitted", ToastKind::Pending, None);

        tokio::time::sleep(Duration::from_millis(9_900)).await;
        settle().await;
        assert_eq!(queue.list().len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        settle().await;
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_outcome_toasts_expire_after_five_seconds() {
        let queue = ToastQueue::new(None);
        queue.push("a:success", "Transaction confirmed", ToastKind::Success, None);
        queue.push("b:error", "Transaction failed", ToastKind::Error, None);

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        settle().await;
        assert_eq!(queue.list().len(), 2);

        tokio::time::sleep(Duration::from_millis(200)).await;
        settle().await;
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_only_affects_one_toast() {
        let queue = ToastQueue::new(None);
        queue.push("a", "first", ToastKind::Pending, None);
        queue.push("b", "second", ToastKind::Pending, None);

        assert!(queue.dismiss("a"));
        assert!(!queue.dismiss("a"));

        let ids: Vec<_> = queue.list().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["b".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replacement_restarts_timer() {
        let queue = ToastQueue::new(None);
        queue.push("a", "first", ToastKind::Success, None);
        tokio::time::sleep(Duration::from_secs(4)).await;
        queue.push("a", "again", ToastKind::Success, None);

        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;
        let toasts = queue.list();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].message, "again");

        tokio::time::sleep(Duration::from_secs(4)).await;
        settle().await;
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_insertion_order_and_explorer_link() {
        let queue = ToastQueue::new(Some("https://sepolia.basescan.org/".to_string()));
        let hash = B256::repeat_byte(0x12);
        queue.push("x", "one", ToastKind::Pending, None);
        queue.push("y", "two", ToastKind::Success, Some(hash));
        queue.attach_hash("x", hash);

        let toasts = queue.list();
        assert_eq!(toasts[0].id, "x");
        assert_eq!(toasts[1].id, "y");
        assert_eq!(
            toasts[0].explorer_link.as_deref(),
            Some(format!("https://sepolia.basescan.org/tx/{}", hash).as_str())
        );
    }
}
