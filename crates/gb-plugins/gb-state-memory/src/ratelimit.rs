//! Sliding-window rate limiter.
//!
//! Each key keeps the timestamps of its accepted attempts inside the trailing
//! window. `allow` trims the key it touches; a background sweeper trims every
//! key and evicts the empty ones so abandoned keys do not pile up.

use gb_core::traits::RateLimiter;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Accepted attempts per key per window
    pub max_requests: usize,
    pub window: Duration,
    /// Zero falls back to `DEFAULT_SWEEP_INTERVAL`
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(60),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

pub struct SlidingWindowLimiter {
    requests: Mutex<HashMap<String, VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
    sweep_interval: Duration,
}

impl SlidingWindowLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let sweep_interval = if config.sweep_interval.is_zero() {
            DEFAULT_SWEEP_INTERVAL
        } else {
            config.sweep_interval
        };
        Self {
            requests: Mutex::new(HashMap::new()),
            max_requests: config.max_requests,
            window: config.window,
            sweep_interval,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    /// Number of keys currently holding at least one timestamp.
    pub fn tracked_keys(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Trims every key and drops the empty ones. Returns how many keys were evicted.
    pub fn purge_expired(&self) -> usize {
        let cutoff = self.cutoff(Instant::now());
        let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);
        let before = requests.len();
        requests.retain(|_, times| {
            trim(times, cutoff);
            !times.is_empty()
        });
        before - requests.len()
    }

    /// Starts the periodic sweep. The task holds only a weak reference, so it
    /// also ends once the limiter itself is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> SweepHandle {
        let limiter: Weak<Self> = Arc::downgrade(self);
        let period = self.sweep_interval;
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(limiter) = limiter.upgrade() else { break };
                        let evicted = limiter.purge_expired();
                        if evicted > 0 {
                            log::debug!("rate limiter sweep evicted {evicted} idle keys");
                        }
                    }
                    _ = &mut stop_rx => break,
                }
            }
            log::debug!("rate limiter sweeper stopped");
        });

        SweepHandle {
            stop: Some(stop_tx),
            task,
        }
    }

    /// `None` while the process is younger than one window: nothing can be stale yet.
    fn cutoff(&self, now: Instant) -> Option<Instant> {
        now.checked_sub(self.window)
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let cutoff = self.cutoff(now);
        let mut requests = self.requests.lock().unwrap_or_else(PoisonError::into_inner);

        let times = requests.entry(key.to_string()).or_default();
        trim(times, cutoff);

        if times.len() >= self.max_requests {
            if times.is_empty() {
                requests.remove(key);
            }
            return false;
        }

        times.push_back(now);
        true
    }
}

/// Timestamps are pushed in order, so stale ones are always at the front.
fn trim(times: &mut VecDeque<Instant>, cutoff: Option<Instant>) {
    let Some(cutoff) = cutoff else { return };
    while times.front().is_some_and(|&t| t <= cutoff) {
        times.pop_front();
    }
}

/// Owner of the sweeper task. Dropping it aborts the task.
pub struct SweepHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Signals the sweeper and waits for it to release its timer.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.task).await {
            if !e.is_cancelled() {
                log::warn!("rate limiter sweeper ended abnormally: {e}");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: usize, window_secs: u64, sweep_secs: u64) -> SlidingWindowLimiter {
        SlidingWindowLimiter::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(window_secs),
            sweep_interval: Duration::from_secs(sweep_secs),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_sixth_request_rejected_until_window_passes() {
        let limiter = limiter(5, 60, 300);
        for _ in 0..5 {
            assert!(limiter.allow("k"));
        }
        assert!(!limiter.allow("k"));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.allow("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_attempts_are_not_recorded() {
        let limiter = limiter(2, 60, 300);
        assert!(limiter.allow("k"));
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(limiter.allow("k"));

        // hammering while blocked must not extend the block
        for _ in 0..10 {
            assert!(!limiter.allow("k"));
        }

        // first timestamp leaves the window, one slot frees up
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(limiter.allow("k"));
        assert!(!limiter.allow("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let limiter = limiter(1, 60, 300);
        assert!(limiter.allow_ip("10.0.0.1"));
        assert!(!limiter.allow_ip("10.0.0.1"));
        assert!(limiter.allow_ip("10.0.0.2"));
        // same text, different scope
        assert!(limiter.allow_email("10.0.0.1"));
        assert_eq!(limiter.tracked_keys(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_max_rejects_without_tracking() {
        let limiter = limiter(0, 60, 300);
        assert!(!limiter.allow("k"));
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_keeps_live_keys() {
        let limiter = limiter(5, 60, 300);
        limiter.allow("old");
        tokio::time::advance(Duration::from_secs(45)).await;
        limiter.allow("fresh");
        tokio::time::advance(Duration::from_secs(20)).await;

        assert_eq!(limiter.purge_expired(), 1);
        assert_eq!(limiter.tracked_keys(), 1);
        assert!(limiter.allow("fresh"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_idle_keys() {
        let limiter = Arc::new(limiter(5, 60, 10));
        limiter.allow("idle");
        let sweeper = limiter.spawn_sweeper();

        tokio::time::sleep(Duration::from_secs(75)).await;
        assert_eq!(limiter.tracked_keys(), 0);

        sweeper.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_on_shutdown() {
        let limiter = Arc::new(limiter(5, 60, 10));
        let sweeper = limiter.spawn_sweeper();
        sweeper.shutdown().await;

        limiter.allow("k");
        tokio::time::sleep(Duration::from_secs(200)).await;
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_exits_when_limiter_dropped() {
        let limiter = Arc::new(limiter(5, 60, 10));
        let sweeper = limiter.spawn_sweeper();
        drop(limiter);

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(sweeper.is_finished());
    }

    #[test]
    fn test_zero_sweep_interval_uses_default() {
        let limiter = limiter(5, 60, 0);
        assert_eq!(limiter.sweep_interval(), DEFAULT_SWEEP_INTERVAL);
    }
}
