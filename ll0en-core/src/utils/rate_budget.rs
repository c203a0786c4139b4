//! Sliding-window request budget.
//!
//! NationStates caps API usage per client at a number of requests per
//! rolling window. [`RateBudget`] keeps the admission time of every request
//! still inside the window and refuses a new one until the oldest has aged
//! out, so no window of the configured length ever sees more than the
//! ceiling, regardless of how many tasks share the budget.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Lowest accepted ceiling.
pub const MIN_REQUESTS: u32 = 1;
/// Highest accepted ceiling (the NationStates API limit).
pub const MAX_REQUESTS: u32 = 50;
/// Default window length used by the NationStates API.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(30);

/// Shared admission counter for outbound API queries.
///
/// Wrap in an `Arc` and hand the same instance to every client that talks
/// to the rate-limited API.
#[derive(Debug)]
pub struct RateBudget {
    max_requests: usize,
    window: Duration,
    admitted: Mutex<VecDeque<Instant>>,
}

impl RateBudget {
    /// Create a budget admitting at most `max_requests` per `window`.
    ///
    /// `max_requests` is clamped to `MIN_REQUESTS..=MAX_REQUESTS`.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let max_requests = max_requests.clamp(MIN_REQUESTS, MAX_REQUESTS) as usize;
        Self {
            max_requests,
            window,
            admitted: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests as u32
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait until a request may be sent, then record it.
    ///
    /// Suspends only the calling task. Waiters are admitted in the order
    /// they reach the lock.
    pub async fn acquire(&self) {
        loop {
            let retry_at = {
                let mut admitted = self.admitted.lock().await;
                let now = Instant::now();
                self.expire(&mut admitted, now);

                if admitted.len() < self.max_requests {
                    admitted.push_back(now);
                    return;
                }
                match admitted.front() {
                    Some(oldest) => *oldest + self.window,
                    None => continue,
                }
            };

            debug!(
                wait_ms = retry_at
                    .saturating_duration_since(Instant::now())
                    .as_millis() as u64,
                "Rate budget exhausted, waiting"
            );
            tokio::time::sleep_until(retry_at).await;
        }
    }

    /// Record a request if the budget allows one right now.
    pub async fn try_acquire(&self) -> bool {
        let mut admitted = self.admitted.lock().await;
        let now = Instant::now();
        self.expire(&mut admitted, now);

        if admitted.len() < self.max_requests {
            admitted.push_back(now);
            true
        } else {
            false
        }
    }

    /// Number of requests that could be admitted right now.
    pub async fn available(&self) -> u32 {
        let mut admitted = self.admitted.lock().await;
        self.expire(&mut admitted, Instant::now());
        (self.max_requests - admitted.len()) as u32
    }

    fn expire(&self, admitted: &mut VecDeque<Instant>, now: Instant) {
        while admitted
            .front()
            .is_some_and(|at| now.duration_since(*at) >= self.window)
        {
            admitted.pop_front();
        }
    }
}

impl Default for RateBudget {
    fn default() -> Self {
        Self::new(30, DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_ceiling_is_clamped() {
        assert_eq!(RateBudget::new(0, DEFAULT_WINDOW).max_requests(), 1);
        assert_eq!(RateBudget::new(500, DEFAULT_WINDOW).max_requests(), 50);
        assert_eq!(RateBudget::new(30, DEFAULT_WINDOW).max_requests(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_acquire_respects_ceiling() {
        let budget = RateBudget::new(2, Duration::from_secs(10));
        assert!(budget.try_acquire().await);
        assert!(budget.try_acquire().await);
        assert!(!budget.try_acquire().await);
        assert_eq!(budget.available().await, 0);

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(budget.available().await, 2);
        assert!(budget.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_is_sliding() {
        let budget = RateBudget::new(2, Duration::from_secs(10));
        assert!(budget.try_acquire().await);
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(budget.try_acquire().await);

        // The first admission ages out at t=10, the second at t=16.
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(budget.try_acquire().await);
        assert!(!budget.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_never_exceed_ceiling() {
        let window = Duration::from_secs(10);
        let budget = Arc::new(RateBudget::new(3, window));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let budget = budget.clone();
            handles.push(tokio::spawn(async move {
                budget.acquire().await;
                Instant::now()
            }));
        }

        let mut admitted = Vec::new();
        for handle in handles {
            admitted.push(handle.await.unwrap());
        }
        admitted.sort();

        assert_eq!(admitted.len(), 10);
        assert!(admitted[..3].iter().all(|at| *at == start));
        for pair in admitted.windows(4) {
            assert!(
                pair[3].duration_since(pair[0]) >= window,
                "four admissions inside one window: {:?}",
                pair
            );
        }
    }
}
