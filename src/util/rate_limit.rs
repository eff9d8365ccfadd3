use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Result of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after_secs: u64 },
}

/// Fixed-window request limiter keyed by client IP.
///
/// Expired windows are evicted on every check, so the map only ever holds
/// clients seen within the current window.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<IpAddr, Window>>,
}

struct Window {
    count: u32,
    reset_at: Instant,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        RateLimiter {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Limiter for the chat assistant: requests per rolling hour
    pub fn per_hour(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(3600))
    }

    pub fn check(&self, ip: IpAddr) -> RateDecision {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> RateDecision {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        windows.retain(|_, window| window.reset_at > now);

        let window = windows.entry(ip).or_insert(Window {
            count: 0,
            reset_at: now + self.window,
        });

        if window.count >= self.max_requests {
            let retry_after_secs = window.reset_at.saturating_duration_since(now).as_secs().max(1);
            RateDecision::Limited { retry_after_secs }
        } else {
            window.count += 1;
            RateDecision::Allowed { remaining: self.max_requests - window.count }
        }
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([10, 0, 0, last])
    }

    #[test]
    fn test_quota_enforced_per_ip() {
        let limiter = RateLimiter::new(3, Duration::from_secs(3600));
        let now = Instant::now();

        for _ in 0..3 {
            assert!(matches!(limiter.check_at(ip(1), now), RateDecision::Allowed { .. }));
        }
        assert!(matches!(limiter.check_at(ip(1), now), RateDecision::Limited { .. }));

        // a different client is unaffected
        assert!(matches!(limiter.check_at(ip(2), now), RateDecision::Allowed { .. }));
    }

    #[test]
    fn test_window_resets_after_expiry() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(matches!(limiter.check_at(ip(1), now), RateDecision::Allowed { .. }));
        assert!(matches!(limiter.check_at(ip(1), now), RateDecision::Limited { .. }));

        let later = now + Duration::from_secs(61);
        assert!(matches!(limiter.check_at(ip(1), later), RateDecision::Allowed { .. }));
    }

    #[test]
    fn test_retry_after_reflects_window_remainder() {
        let limiter = RateLimiter::new(1, Duration::from_secs(600));
        let now = Instant::now();
        limiter.check_at(ip(1), now);

        match limiter.check_at(ip(1), now + Duration::from_secs(100)) {
            RateDecision::Limited { retry_after_secs } => {
                assert!(retry_after_secs <= 500);
                assert!(retry_after_secs >= 499);
            }
            other => panic!("expected Limited, got {:?}", other),
        }
    }

    #[test]
    fn test_expired_windows_are_evicted() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        let now = Instant::now();

        for last in 1..=100 {
            limiter.check_at(ip(last), now);
        }
        assert_eq!(limiter.tracked_clients(), 100);

        // one check after expiry sweeps out every stale window
        let later = now + Duration::from_secs(61);
        limiter.check_at(ip(200), later);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_remaining_counts_down() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let now = Instant::now();
        assert_eq!(limiter.check_at(ip(1), now), RateDecision::Allowed { remaining: 1 });
        assert_eq!(limiter.check_at(ip(1), now), RateDecision::Allowed { remaining: 0 });
    }
}
