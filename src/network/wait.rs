use std::thread;
use std::time::Duration;

/// Backoff policy for caller-side "poll until the network gets there"
/// loops. Returning `false` stops the loop.
pub trait WaitStrategy {
    fn wait(&mut self, attempt: u32) -> bool;
}

/// Sleeps a fixed interval between polls, optionally giving up after
/// `max_attempts` waits.
pub struct FixedInterval {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
}

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        FixedInterval {
            interval,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl WaitStrategy for FixedInterval {
    fn wait(&mut self, attempt: u32) -> bool {
        if self.max_attempts.is_some_and(|max| attempt >= max) {
            return false;
        }
        thread::sleep(self.interval);
        true
    }
}

/// Never waits; the first unmet poll ends the loop.
pub struct NoWait;

impl WaitStrategy for NoWait {
    fn wait(&mut self, _attempt: u32) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_interval_gives_up() {
        let mut strategy = FixedInterval::new(Duration::ZERO).with_max_attempts(2);

        assert!(strategy.wait(0));
        assert!(strategy.wait(1));
        assert!(!strategy.wait(2));
        assert!(!NoWait.wait(0));
    }
}
