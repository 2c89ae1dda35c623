use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Above this many tracked keys, idle keys are dropped, at most once per window.
const PRUNE_THRESHOLD: usize = 4_096;

#[derive(Debug, Default)]
struct LimiterState {
    hits: HashMap<String, VecDeque<Instant>>,
    last_prune: Option<Instant>,
}

impl LimiterState {
    fn prune_idle(&mut self, now: Instant, window: Duration) {
        if self.hits.len() <= PRUNE_THRESHOLD {
            return;
        }
        if self
            .last_prune
            .is_some_and(|last| now.saturating_duration_since(last) < window)
        {
            return;
        }

        self.hits.retain(|_, hits| {
            hits.back()
                .is_some_and(|last| now.saturating_duration_since(*last) <= window)
        });
        self.last_prune = Some(now);
    }
}

/// Sliding-window limiter keyed by client address.
#[derive(Debug, Clone)]
pub struct SlidingWindowLimiter {
    inner: Arc<Mutex<LimiterState>>,
    window: Duration,
    max_requests: usize,
}

impl SlidingWindowLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LimiterState::default())),
            window,
            max_requests: max_requests.max(1),
        }
    }

    /// Records a hit for `key`, or returns how long until the next hit fits
    /// in the window.
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
        let mut guard = self.inner.lock();
        guard.prune_idle(now, self.window);

        let hits = guard.hits.entry(key.to_string()).or_default();
        while let Some(front) = hits.front() {
            if now.duration_since(*front) > self.window {
                hits.pop_front();
            } else {
                break;
            }
        }

        if hits.len() >= self.max_requests {
            let oldest = hits.front().copied().unwrap_or(now);
            let retry_after = self.window.saturating_sub(now.duration_since(oldest));
            return Err(retry_after.max(Duration::from_secs(1)));
        }

        hits.push_back(now);
        Ok(())
    }

    pub fn tracked_keys(&self) -> usize {
        self.inner.lock().hits.len()
    }
}
