use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Sliding-window limiter keyed by conversation thread.
///
/// A limit of 0 disables limiting.
pub struct RateLimiter {
    /// Request timestamps per thread id.
    requests: HashMap<String, Vec<Instant>>,
    limit: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        RateLimiter {
            requests: HashMap::new(),
            limit,
            window,
        }
    }

    /// `limit` chat requests per thread per minute.
    pub fn per_minute(limit: usize) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    /// Records a request from `thread_id` and returns whether it is allowed.
    /// Rejected requests are not recorded.
    pub fn check(&mut self, thread_id: &str) -> bool {
        if self.limit == 0 {
            return true;
        }

        let now = Instant::now();
        let window = self.window;
        let thread_requests = self.requests.entry(thread_id.to_string()).or_default();

        thread_requests.retain(|&timestamp| now.duration_since(timestamp) < window);

        if thread_requests.len() < self.limit {
            thread_requests.push(now);
            true
        } else {
            false
        }
    }

    /// Forgets the history of one thread.
    pub fn forget(&mut self, thread_id: &str) {
        self.requests.remove(thread_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_allows_requests_within_limit() {
        let mut limiter = RateLimiter::per_minute(3);
        for _ in 0..3 {
            assert!(limiter.check("thread-1"));
        }
        assert!(!limiter.check("thread-1"));
        assert!(limiter.check("thread-2"));
    }

    #[test]
    fn test_window_slides() {
        let mut limiter = RateLimiter::new(2, Duration::from_millis(50));
        assert!(limiter.check("t"));
        assert!(limiter.check("t"));
        assert!(!limiter.check("t"));

        thread::sleep(Duration::from_millis(60));

        assert!(limiter.check("t"));
    }

    #[test]
    fn test_zero_limit_disables() {
        let mut limiter = RateLimiter::per_minute(0);
        for _ in 0..100 {
            assert!(limiter.check("t"));
        }
    }

    #[test]
    fn test_forget_resets_thread() {
        let mut limiter = RateLimiter::per_minute(1);
        assert!(limiter.check("t"));
        assert!(!limiter.check("t"));
        limiter.forget("t");
        assert!(limiter.check("t"));
    }
}
