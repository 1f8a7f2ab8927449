//! Time-lock countdown derivation
//!
//! `derive` is a pure function of the unlock timestamp and the current
//! time. `Countdown` re-derives it once per second on its own task and
//! publishes the result on a watch channel until the handle is dropped.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;

const SECS_PER_DAY: u64 = 86_400;
const SECS_PER_HOUR: u64 = 3_600;
const SECS_PER_MINUTE: u64 = 60;

/// Source of the current Unix time in seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Settable clock for deterministic tests.
#[derive(Clone, Debug, Default)]
pub struct FixedClock {
    now: Arc<AtomicI64>,
}

impl FixedClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(now)),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRemaining {
    pub days: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl TimeRemaining {
    pub fn from_secs(delta: u64) -> Self {
        let days = delta / SECS_PER_DAY;
        let rem = delta % SECS_PER_DAY;
        let hours = rem / SECS_PER_HOUR;
        let rem = rem % SECS_PER_HOUR;
        let minutes = rem / SECS_PER_MINUTE;
        let seconds = rem % SECS_PER_MINUTE;
        Self {
            days,
            hours,
            minutes,
            seconds,
        }
    }

    pub fn total_secs(&self) -> u64 {
        self.days * SECS_PER_DAY
            + self.hours * SECS_PER_HOUR
            + self.minutes * SECS_PER_MINUTE
            + self.seconds
    }

    /// Coarse lock summary: the largest non-zero of days or hours.
    pub fn summary(&self) -> Option<String> {
        if self.days > 0 {
            Some(format!("Funds locked for {} {}", self.days, plural(self.days, "day")))
        } else if self.hours > 0 {
            Some(format!("Funds locked for {} {}", self.hours, plural(self.hours, "hour")))
        } else {
            None
        }
    }
}

fn plural(n: u64, unit: &str) -> String {
    if n == 1 {
        unit.to_string()
    } else {
        format!("{}s", unit)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelockStatus {
    pub time_remaining: Option<TimeRemaining>,
    pub is_unlocked: bool,
}

/// Derive the countdown state for `unlock_time` at `now`.
pub fn derive(unlock_time: Option<u64>, now: i64) -> TimelockStatus {
    let Some(unlock_time) = unlock_time else {
        return TimelockStatus {
            time_remaining: None,
            is_unlocked: false,
        };
    };

    let delta = unlock_time as i128 - now as i128;
    if delta <= 0 {
        return TimelockStatus {
            time_remaining: None,
            is_unlocked: true,
        };
    }

    TimelockStatus {
        time_remaining: Some(TimeRemaining::from_secs(delta as u64)),
        is_unlocked: false,
    }
}

/// Periodic re-derivation bound to the lifetime of this handle.
pub struct Countdown {
    status: watch::Receiver<TimelockStatus>,
    task: JoinHandle<()>,
}

impl Countdown {
    pub const TICK: Duration = Duration::from_secs(1);

    /// Start ticking against the unlock time published on `unlock_time`.
    ///
    /// A change of unlock time is picked up immediately rather than at the
    /// next tick.
    pub fn spawn(
        mut unlock_time: watch::Receiver<Option<u64>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let initial = derive(*unlock_time.borrow(), clock.now());
        let (tx, rx) = watch::channel(initial);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Self::TICK);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = unlock_time.changed() => {
                        if changed.is_err() {
                            log::debug!("Unlock time source closed, stopping countdown");
                            break;
                        }
                    }
                }
                let status = derive(*unlock_time.borrow(), clock.now());
                tx.send_if_modified(|current| {
                    if *current != status {
                        *current = status;
                        true
                    } else {
                        false
                    }
                });
                if tx.is_closed() {
                    break;
                }
            }
        });

        Self { status: rx, task }
    }

    pub fn current(&self) -> TimelockStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<TimelockStatus> {
        self.status.clone()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_unlock_time() {
        let status = derive(None, 1_000);
        assert_eq!(status.time_remaining, None);
        assert!(!status.is_unlocked);
    }

    #[test]
    fn test_past_and_present_unlock_time() {
        for unlock in [0u64, 500, 1_000] {
            let status = derive(Some(unlock), 1_000);
            assert!(status.is_unlocked, "unlock={}", unlock);
            assert_eq!(status.time_remaining, None);
        }
    }

    #[test]
    fn test_one_of_each_unit() {
        let now = 1_700_000_000;
        let status = derive(Some(now as u64 + 90_061), now);
        assert!(!status.is_unlocked);
        assert_eq!(
            status.time_remaining,
            Some(TimeRemaining {
                days: 1,
                hours: 1,
                minutes: 1,
                seconds: 1
            })
        );
    }

    #[test]
    fn test_decomposition_sums_back() {
        let now = 1_700_000_000i64;
        for delta in [1u64, 59, 60, 3_599, 3_600, 86_399, 86_400, 1_234_567, 31_536_000] {
            let status = derive(Some(now as u64 + delta), now);
            let remaining = status.time_remaining.unwrap();
            assert_eq!(remaining.total_secs(), delta);
            assert!(remaining.hours < 24);
            assert!(remaining.minutes < 60);
            assert!(remaining.seconds < 60);
        }
    }

    #[test]
    fn test_summary() {
        assert_eq!(
            TimeRemaining::from_secs(2 * 86_400).summary().as_deref(),
            Some("Funds locked for 2 days")
        );
        assert_eq!(
            TimeRemaining::from_secs(3_600).summary().as_deref(),
            Some("Funds locked for 1 hour")
        );
        assert_eq!(TimeRemaining::from_secs(59).summary(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_ticks_to_unlocked() {
        let clock = FixedClock::new(1_000);
        let (_unlock_tx, unlock_rx) = watch::channel(Some(1_002u64));
        let countdown = Countdown::spawn(unlock_rx, Arc::new(clock.clone()));
        let mut status = countdown.subscribe();

        assert_eq!(countdown.current().time_remaining.unwrap().seconds, 2);

        clock.advance(2);
        tokio::time::advance(Duration::from_secs(1)).await;
        status.changed().await.unwrap();
        assert!(status.borrow().is_unlocked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_follows_new_unlock_time() {
        let clock = FixedClock::new(1_000);
        let (unlock_tx, unlock_rx) = watch::channel(None);
        let countdown = Countdown::spawn(unlock_rx, Arc::new(clock));
        let mut status = countdown.subscribe();
        assert_eq!(countdown.current(), TimelockStatus::default());

        unlock_tx.send(Some(1_060)).unwrap();
        status.changed().await.unwrap();
        assert_eq!(status.borrow().time_remaining.unwrap().minutes, 1);
    }
}
