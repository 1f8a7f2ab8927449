//! Cancellable trailing-edge debounce
//!
//! `trigger` (re)arms a single scheduled task; a burst of triggers inside
//! the delay collapses into one run. Dropping the `Debouncer` or calling
//! `cancel` aborts whatever is scheduled.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

pub struct Debouncer {
    delay: Duration,
    scheduled: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            scheduled: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `make()` to run after the delay, replacing any run not yet
    /// started.
    pub fn trigger<F, Fut>(&self, make: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            make().await;
        });

        let mut scheduled = self.scheduled.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = scheduled.replace(handle) {
            previous.abort();
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    pub fn cancel(&self) {
        if let Some(handle) = self
            .scheduled
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
