use std::time::Duration;

/// Capped exponential backoff for supervisor rebind loops.
///
/// Each supervisor sleeps `next_delay()` before re-binding a listener that
/// was torn down by an accept or read failure, so a persistently failing
/// socket is not reopened in a tight loop. `reset()` is called after a
/// cycle that made progress.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl RetryPolicy {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Returns the delay to sleep before the next attempt, then doubles it
    /// up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Returns the policy to its initial delay after a successful cycle.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(200), Duration::from_secs(10))
    }
}
