use std::time::Duration;

const BACKOFF_BASE_MS: u64 = 1000;

/// Reconnect delay for the node link: 1s, 2s, 4s, then 8s flat.
pub(super) struct Backoff {
    attempt: u32,
    max_attempts: u32,
}

impl Backoff {
    pub(super) fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts,
        }
    }

    pub(super) fn next(&mut self) -> Duration {
        self.attempt += 1;
        let delay = BACKOFF_BASE_MS * 2u64.pow((self.attempt - 1).min(3));
        Duration::from_millis(delay)
    }

    /// Zero attempts means retry forever.
    pub(super) fn is_exhausted(&self) -> bool {
        self.max_attempts != 0 && self.attempt >= self.max_attempts
    }

    pub(super) fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_then_caps() {
        let mut backoff = Backoff::new(10);
        let delays: Vec<_> = (0..5).map(|_| backoff.next().as_secs()).collect();
        assert_eq!(delays, [1, 2, 4, 8, 8]);
    }

    #[test]
    fn test_exhaustion_and_reset() {
        let mut backoff = Backoff::new(2);
        backoff.next();
        assert!(!backoff.is_exhausted());
        backoff.next();
        assert!(backoff.is_exhausted());

        backoff.reset();
        assert!(!backoff.is_exhausted());
        assert_eq!(backoff.next(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_means_unbounded() {
        let mut backoff = Backoff::new(0);
        for _ in 0..100 {
            backoff.next();
        }
        assert!(!backoff.is_exhausted());
    }
}
