use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

/// Time source for the tracker, injectable so tests can drive the window.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used outside of tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Moving-window attempt counter keyed by an opaque string (actor id, IP,
/// or a combination). Backs failed-login and sensitive-operation throttling.
///
/// Entries older than the window are pruned lazily on each access; there is
/// no background sweep. Access to the map is mutex-serialized so concurrent
/// attempts against the same key cannot under-count.
pub struct AttemptTracker {
    window: Duration,
    max_attempts: u32,
    clock: Arc<dyn Clock>,
    attempts: Mutex<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl AttemptTracker {
    pub fn new(window: Duration, max_attempts: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            max_attempts,
            clock,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Record one attempt for `key` and return the count inside the window,
    /// including the one just recorded.
    pub fn record(&self, key: &str) -> u32 {
        let now = self.clock.now();
        let cutoff = now - self.window;

        let mut attempts = self.attempts.lock().expect("attempt mutex poisoned");
        let entry = attempts.entry(key.to_owned()).or_default();
        entry.retain(|stamp| *stamp > cutoff);
        entry.push(now);
        entry.len() as u32
    }

    /// Whether `key` has exhausted its attempts for the current window.
    pub fn is_limited(&self, key: &str) -> bool {
        let cutoff = self.clock.now() - self.window;

        let mut attempts = self.attempts.lock().expect("attempt mutex poisoned");
        match attempts.get_mut(key) {
            Some(entry) => {
                entry.retain(|stamp| *stamp > cutoff);
                entry.len() as u32 >= self.max_attempts
            }
            None => false,
        }
    }

    /// Clear the counter for `key`, e.g. after a successful login.
    pub fn reset(&self, key: &str) {
        let mut attempts = self.attempts.lock().expect("attempt mutex poisoned");
        attempts.remove(key);
    }
}
