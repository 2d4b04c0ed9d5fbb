use std::time::Duration;

use quanta::Clock;

use crate::clock::MillisClock;
use crate::fixed_window::FixedWindow;
use crate::leaky_bucket::LeakyBucket;
use crate::sliding_counter::SlidingCounter;
use crate::sliding_log::SlidingLog;
use crate::token_bucket::TokenBucket;
use crate::{Algorithm, Decision, Error, RateLimitConfig};

/// Dispatch facade over the five decision algorithms.
///
/// Each algorithm owns its own keyed state store; the facade routes a call
/// to the strategy named by the config's tag. Construct one engine per
/// process and share it (`RateLimiter` is `Send + Sync`); all five
/// strategies read a single clock.
pub struct RateLimiter {
    token_bucket: TokenBucket,
    leaky_bucket: LeakyBucket,
    fixed_window: FixedWindow,
    sliding_log: SlidingLog,
    sliding_counter: SlidingCounter,
    clock: MillisClock,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_clock(Clock::new())
    }

    /// Build an engine on a caller-supplied clock.
    ///
    /// Pair with [`quanta::Clock::mock`] to drive time deterministically in
    /// tests.
    pub fn with_clock(clock: Clock) -> Self {
        let clock = MillisClock::with_clock(clock);
        RateLimiter {
            token_bucket: TokenBucket::new(clock.clone()),
            leaky_bucket: LeakyBucket::new(clock.clone()),
            fixed_window: FixedWindow::new(clock.clone()),
            sliding_log: SlidingLog::new(clock.clone()),
            sliding_counter: SlidingCounter::new(clock.clone()),
            clock,
        }
    }

    /// Decide whether one request under `key` is admitted.
    ///
    /// Validates the config fields the chosen algorithm requires, then
    /// delegates. Rejection is not an error: it comes back as a [`Decision`]
    /// with `admitted == false` and a positive retry hint.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] if the key is empty or a required numeric
    /// field is non-positive. No state is touched on error.
    pub fn try_acquire(&self, key: &str, config: &RateLimitConfig) -> Result<Decision, Error> {
        if key.is_empty() {
            return Err(Error::InvalidConfig("key must be a non-empty string"));
        }
        config.validate()?;

        Ok(match config.algorithm {
            Algorithm::TokenBucket => self.token_bucket.try_acquire(key, config),
            Algorithm::LeakyBucket => self.leaky_bucket.try_acquire(key, config),
            Algorithm::FixedWindowCounter => self.fixed_window.try_acquire(key, config),
            Algorithm::SlidingWindowLog => self.sliding_log.try_acquire(key, config),
            Algorithm::SlidingWindowCounter => self.sliding_counter.try_acquire(key, config),
        })
    }

    /// Drop the state `key` holds under `algorithm`, if any.
    ///
    /// The next `try_acquire` for that pair behaves exactly like the first
    /// call for a fresh key. Resetting an absent key is a silent no-op.
    pub fn reset(&self, key: &str, algorithm: Algorithm) {
        match algorithm {
            Algorithm::TokenBucket => self.token_bucket.reset(key),
            Algorithm::LeakyBucket => self.leaky_bucket.reset(key),
            Algorithm::FixedWindowCounter => self.fixed_window.reset(key),
            Algorithm::SlidingWindowLog => self.sliding_log.reset(key),
            Algorithm::SlidingWindowCounter => self.sliding_counter.reset(key),
        }
    }

    /// [`reset`](Self::reset) across all five algorithms.
    pub fn reset_all(&self, key: &str) {
        for algorithm in Algorithm::ALL {
            self.reset(key, algorithm);
        }
    }

    /// Drop every per-key state not touched within `idle_for`.
    ///
    /// The stores grow with distinct keys and nothing evicts automatically;
    /// long-lived services should sweep on their own schedule. The sweep
    /// walks each store without blocking in-flight decisions on other keys.
    pub fn purge_idle(&self, idle_for: Duration) {
        let cutoff = self
            .clock
            .now_ms()
            .saturating_sub(idle_for.as_millis() as u64);
        self.token_bucket.purge_idle(cutoff);
        self.leaky_bucket.purge_idle(cutoff);
        self.fixed_window.purge_idle(cutoff);
        self.sliding_log.purge_idle(cutoff);
        self.sliding_counter.purge_idle(cutoff);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn mocked() -> (RateLimiter, Arc<quanta::Mock>) {
        let (clock, mock) = Clock::mock();
        (RateLimiter::with_clock(clock), mock)
    }

    fn drain(limiter: &RateLimiter, key: &str, config: &RateLimitConfig) {
        while limiter.try_acquire(key, config).unwrap().admitted {}
    }

    #[test]
    fn an_empty_key_is_rejected_before_any_state_exists() {
        let (limiter, _mock) = mocked();
        let config = RateLimitConfig::token_bucket(5, 1.0);

        let err = limiter.try_acquire("", &config).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn invalid_configs_error_without_mutating_state() {
        let (limiter, _mock) = mocked();

        let mut config = RateLimitConfig::fixed_window(0, Duration::from_secs(60));
        assert!(limiter.try_acquire("k", &config).is_err());

        // The failed call must not have seeded a counter.
        config.limit = 2;
        let decision = limiter.try_acquire("k", &config).unwrap();
        assert_eq!(decision.remaining, 1);
    }

    #[test]
    fn every_algorithm_answers_the_uniform_contract() {
        let (limiter, _mock) = mocked();
        let window = Duration::from_secs(60);
        let configs = [
            RateLimitConfig::token_bucket(1, 1.0),
            RateLimitConfig::leaky_bucket(1, 1.0),
            RateLimitConfig::fixed_window(1, window),
            RateLimitConfig::sliding_log(1, window),
            RateLimitConfig::sliding_counter(1, window),
        ];

        for config in &configs {
            let admitted = limiter.try_acquire("k", config).unwrap();
            assert!(admitted.admitted, "{:?} first call", config.algorithm);
            assert_eq!(admitted.retry_after_secs(), 0);
            assert_eq!(admitted.message, "Request allowed");

            let rejected = limiter.try_acquire("k", config).unwrap();
            assert!(!rejected.admitted, "{:?} second call", config.algorithm);
            assert_eq!(rejected.remaining, 0);
            assert!(rejected.retry_after_secs() >= 1);
            assert!(rejected.message.starts_with("Rate limit exceeded"));
        }
    }

    #[test]
    fn reset_restores_first_call_behavior() {
        let (limiter, _mock) = mocked();
        let window = Duration::from_secs(60);
        let configs = [
            RateLimitConfig::token_bucket(3, 1.0),
            RateLimitConfig::leaky_bucket(3, 1.0),
            RateLimitConfig::fixed_window(3, window),
            RateLimitConfig::sliding_log(3, window),
            RateLimitConfig::sliding_counter(3, window),
        ];

        for config in &configs {
            let first = limiter.try_acquire("k", config).unwrap();
            drain(&limiter, "k", config);

            limiter.reset("k", config.algorithm);

            let fresh = limiter.try_acquire("k", config).unwrap();
            assert_eq!(fresh, first, "{:?} after reset", config.algorithm);
        }
    }

    #[test]
    fn reset_of_an_absent_key_is_a_no_op() {
        let (limiter, _mock) = mocked();
        limiter.reset("never-seen", Algorithm::TokenBucket);
        limiter.reset_all("never-seen");
    }

    #[test]
    fn reset_all_clears_every_strategy() {
        let (limiter, _mock) = mocked();
        let bucket = RateLimitConfig::token_bucket(1, 0.001);
        let window = RateLimitConfig::fixed_window(1, Duration::from_secs(3600));

        drain(&limiter, "k", &bucket);
        drain(&limiter, "k", &window);

        limiter.reset_all("k");

        assert!(limiter.try_acquire("k", &bucket).unwrap().admitted);
        assert!(limiter.try_acquire("k", &window).unwrap().admitted);
    }

    #[test]
    fn keys_are_isolated() {
        let (limiter, _mock) = mocked();
        let config = RateLimitConfig::sliding_log(2, Duration::from_secs(60));

        drain(&limiter, "noisy", &config);

        let decision = limiter.try_acquire("quiet", &config).unwrap();
        assert!(decision.admitted);
        assert_eq!(decision.remaining, 1);
    }

    #[test]
    fn algorithms_do_not_share_state_for_the_same_key() {
        let (limiter, _mock) = mocked();
        let fixed = RateLimitConfig::fixed_window(1, Duration::from_secs(60));
        let sliding = RateLimitConfig::sliding_log(1, Duration::from_secs(60));

        drain(&limiter, "k", &fixed);
        assert!(limiter.try_acquire("k", &sliding).unwrap().admitted);
    }

    #[test]
    fn purge_idle_forgets_only_stale_keys() {
        let (limiter, mock) = mocked();
        let config = RateLimitConfig::leaky_bucket(1, 0.001);

        drain(&limiter, "stale", &config);
        mock.increment(Duration::from_secs(30));
        drain(&limiter, "fresh", &config);

        limiter.purge_idle(Duration::from_secs(10));

        assert!(limiter.try_acquire("stale", &config).unwrap().admitted);
        assert!(!limiter.try_acquire("fresh", &config).unwrap().admitted);
    }

    #[test]
    fn concurrent_bursts_admit_exactly_the_limit() {
        let limiter = Arc::new(RateLimiter::new());
        let config = RateLimitConfig::fixed_window(100, Duration::from_secs(3600));

        let mut handles = vec![];
        for _ in 0..8 {
            let limiter = Arc::clone(&limiter);
            let config = config.clone();
            handles.push(thread::spawn(move || {
                let mut admitted = 0;
                for _ in 0..25 {
                    if limiter.try_acquire("shared", &config).unwrap().admitted {
                        admitted += 1;
                    }
                }
                admitted
            }));
        }

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn concurrent_token_consumption_never_oversells() {
        let limiter = Arc::new(RateLimiter::new());
        // A negligible refill rate keeps the budget effectively fixed for
        // the duration of the test.
        let config = RateLimitConfig::token_bucket(64, 0.000_001);

        let mut handles = vec![];
        for _ in 0..8 {
            let limiter = Arc::clone(&limiter);
            let config = config.clone();
            handles.push(thread::spawn(move || {
                let mut admitted = 0;
                for _ in 0..16 {
                    if limiter.try_acquire("shared", &config).unwrap().admitted {
                        admitted += 1;
                    }
                }
                admitted
            }));
        }

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 64);
    }
}
