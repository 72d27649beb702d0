//! Shared utilities

/// Log rate limiter for failure paths that can fire every frame.
///
/// Sustained composite failures would otherwise flood the log; this fires on
/// the first occurrence and every `threshold`th one after that, while the
/// total count keeps advancing.
#[derive(Debug)]
pub struct RateLimiter {
    counter: u64,
    threshold: u64,
}

impl RateLimiter {
    pub fn new(threshold: u64) -> Self {
        Self {
            counter: 0,
            threshold: threshold.max(1),
        }
    }

    /// Record one occurrence. Returns the total count when this occurrence
    /// should be reported, None when it should stay quiet.
    pub fn tick(&mut self) -> Option<u64> {
        let fire = self.counter % self.threshold == 0;
        self.counter += 1;
        if fire {
            Some(self.counter)
        } else {
            None
        }
    }

    /// Total occurrences recorded so far
    pub fn count(&self) -> u64 {
        self.counter
    }
}
