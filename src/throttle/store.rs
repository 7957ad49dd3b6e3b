use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::rate::Rate;

/// Shared keyed counter backing the throttles.
///
/// `hit` records one request against `key` and reports whether it fits the
/// rate. On rejection it returns the number of seconds until the window has
/// room again (always at least 1). Implementations must make the
/// check-and-record step atomic with respect to concurrent callers.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn hit(&self, key: &str, rate: Rate) -> Result<(), u64>;

    /// Forget all recorded hits
    async fn clear(&self);
}

/// Minimum time between sweeps of idle keys
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// In-process sliding-window history per key.
///
/// Keys whose newest hit is older than the longest window seen so far are
/// dropped by a periodic sweep, so the map only holds identities that are
/// still inside some window.
#[derive(Default)]
pub struct MemoryCounterStore {
    inner: Mutex<Histories>,
}

#[derive(Default)]
struct Histories {
    by_key: HashMap<String, VecDeque<Instant>>,
    longest_window: Duration,
    last_sweep: Option<Instant>,
}

impl Histories {
    fn sweep(&mut self, now: Instant) {
        let longest = self.longest_window;
        self.by_key.retain(|_, history| {
            history
                .back()
                .is_some_and(|newest| now.duration_since(*newest) < longest)
        });
        self.last_sweep = Some(now);
    }
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn hit_at(&self, key: &str, rate: Rate, now: Instant) -> Result<(), u64> {
        let window = rate.window();
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        inner.longest_window = inner.longest_window.max(window);
        let sweep_due = inner
            .last_sweep
            .map_or(true, |last| now.duration_since(last) >= SWEEP_INTERVAL);
        if sweep_due {
            inner.sweep(now);
        }

        let history = inner.by_key.entry(key.to_string()).or_default();

        // Oldest entries sit at the front
        while let Some(oldest) = history.front() {
            if now.duration_since(*oldest) >= window {
                history.pop_front();
            } else {
                break;
            }
        }

        if history.len() as u64 >= u64::from(rate.requests) {
            let retry_after = history
                .front()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(window);
            if history.is_empty() {
                inner.by_key.remove(key);
            }
            return Err(ceil_secs(retry_after).max(1));
        }

        history.push_back(now);
        Ok(())
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .by_key
            .len()
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn hit(&self, key: &str, rate: Rate) -> Result<(), u64> {
        self.hit_at(key, rate, Instant::now())
    }

    async fn clear(&self) {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .by_key
            .clear();
    }
}
