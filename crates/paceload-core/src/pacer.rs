use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Enforces a minimum delay between the starts of consecutive write attempts.
///
/// There is no token bucket: idle time is never banked, so a slow sink can
/// not earn a burst later. Built on `tokio::time`, so tests running on a
/// paused runtime see virtual time.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    last_start: Option<Instant>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_start: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Earliest instant the next attempt may start. `None` before the first attempt.
    pub fn next_slot(&self) -> Option<Instant> {
        self.last_start.map(|last| last + self.interval)
    }

    /// Wait for the next slot and claim it. Returns the attempt's start instant.
    pub async fn acquire(&mut self) -> Instant {
        if let Some(deadline) = self.next_slot() {
            sleep_until(deadline).await;
        }

        let now = Instant::now();
        self.last_start = Some(now);
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_acquire_is_immediate() {
        let mut pacer = Pacer::new(Duration::from_secs(1));
        let before = Instant::now();

        let started = pacer.acquire().await;
        assert_eq!(started, before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_spaces_attempts() {
        let mut pacer = Pacer::new(Duration::from_millis(500));

        let first = pacer.acquire().await;
        let second = pacer.acquire().await;
        let third = pacer.acquire().await;

        assert!(second - first >= Duration::from_millis(500));
        assert!(third - second >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_work_is_not_banked() {
        let mut pacer = Pacer::new(Duration::from_secs(1));

        let first = pacer.acquire().await;
        // Work that outlasts the interval lets the next attempt start at once.
        tokio::time::sleep(Duration::from_secs(3)).await;
        let second = pacer.acquire().await;
        let third = pacer.acquire().await;

        assert_eq!(second - first, Duration::from_secs(3));
        assert_eq!(third - second, Duration::from_secs(1));
    }
}
