use std::time::Duration;

use crate::{Algorithm, Error};

/// How high the Token Bucket lets tokens accumulate while refilling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefillCeiling {
    /// Clamp to the configured capacity; a burst never exceeds `capacity`.
    #[default]
    Capacity,
    /// Clamp to a full minute of refill, `max(refill_rate * 60, capacity)`.
    ///
    /// A bucket that has sat idle may accumulate up to sixty seconds worth
    /// of tokens, so post-idle bursts can far exceed `capacity`. Offered for
    /// deployments that depend on that behavior.
    MinuteOfRefill,
}

/// Per-call inputs for one [`try_acquire`](crate::RateLimiter::try_acquire).
///
/// The engine caches no configuration; every call carries its own, so the
/// same key can be checked under different limits by different call sites.
/// Only the fields the chosen algorithm reads are validated: the window
/// algorithms use `limit` and `window`, the bucket algorithms use `capacity`
/// and `refill_rate`.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Which decision algorithm to apply.
    pub algorithm: Algorithm,
    /// Maximum admissions per window (window algorithms).
    pub limit: u32,
    /// Window size (window algorithms).
    pub window: Duration,
    /// Bucket size (bucket algorithms).
    pub capacity: u32,
    /// Units per second: token refill for Token Bucket, drain for Leaky Bucket.
    pub refill_rate: f64,
    /// Token accumulation bound; Token Bucket only.
    pub refill_ceiling: RefillCeiling,
}

impl RateLimitConfig {
    fn base(algorithm: Algorithm) -> Self {
        RateLimitConfig {
            algorithm,
            limit: 0,
            window: Duration::ZERO,
            capacity: 0,
            refill_rate: 0.0,
            refill_ceiling: RefillCeiling::default(),
        }
    }

    /// Token Bucket: bursts up to `capacity`, refilling at `refill_rate`
    /// tokens per second.
    pub fn token_bucket(capacity: u32, refill_rate: f64) -> Self {
        RateLimitConfig {
            capacity,
            refill_rate,
            ..Self::base(Algorithm::TokenBucket)
        }
    }

    /// Leaky Bucket: holds at most `capacity` units, draining at `leak_rate`
    /// units per second.
    pub fn leaky_bucket(capacity: u32, leak_rate: f64) -> Self {
        RateLimitConfig {
            capacity,
            refill_rate: leak_rate,
            ..Self::base(Algorithm::LeakyBucket)
        }
    }

    /// Fixed Window Counter: at most `limit` admissions per aligned window.
    pub fn fixed_window(limit: u32, window: Duration) -> Self {
        RateLimitConfig {
            limit,
            window,
            ..Self::base(Algorithm::FixedWindowCounter)
        }
    }

    /// Sliding Window Log: at most `limit` admissions in any trailing window.
    pub fn sliding_log(limit: u32, window: Duration) -> Self {
        RateLimitConfig {
            limit,
            window,
            ..Self::base(Algorithm::SlidingWindowLog)
        }
    }

    /// Sliding Window Counter: weighted blend of two aligned window counters.
    pub fn sliding_counter(limit: u32, window: Duration) -> Self {
        RateLimitConfig {
            limit,
            window,
            ..Self::base(Algorithm::SlidingWindowCounter)
        }
    }

    /// Override the Token Bucket accumulation bound.
    pub fn with_refill_ceiling(mut self, ceiling: RefillCeiling) -> Self {
        self.refill_ceiling = ceiling;
        self
    }

    /// Check the fields the chosen algorithm requires.
    pub fn validate(&self) -> Result<(), Error> {
        match self.algorithm {
            Algorithm::TokenBucket | Algorithm::LeakyBucket => {
                if self.capacity == 0 {
                    return Err(Error::InvalidConfig("capacity must be positive"));
                }
                if !self.refill_rate.is_finite() || self.refill_rate <= 0.0 {
                    return Err(Error::InvalidConfig(
                        "refill rate must be a positive number",
                    ));
                }
            }
            Algorithm::FixedWindowCounter
            | Algorithm::SlidingWindowLog
            | Algorithm::SlidingWindowCounter => {
                if self.limit == 0 {
                    return Err(Error::InvalidConfig("limit must be positive"));
                }
                if self.window < Duration::from_millis(1) {
                    return Err(Error::InvalidConfig(
                        "window must be at least one millisecond",
                    ));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn window_ms(&self) -> u64 {
        self.window.as_millis() as u64
    }

    pub(crate) fn token_ceiling(&self) -> f64 {
        match self.refill_ceiling {
            RefillCeiling::Capacity => self.capacity as f64,
            RefillCeiling::MinuteOfRefill => (self.refill_rate * 60.0).max(self.capacity as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_configs_require_capacity_and_rate() {
        assert!(RateLimitConfig::token_bucket(5, 1.0).validate().is_ok());
        assert!(RateLimitConfig::token_bucket(0, 1.0).validate().is_err());
        assert!(RateLimitConfig::token_bucket(5, 0.0).validate().is_err());
        assert!(RateLimitConfig::token_bucket(5, -1.0).validate().is_err());
        assert!(RateLimitConfig::token_bucket(5, f64::NAN).validate().is_err());
        assert!(RateLimitConfig::leaky_bucket(5, f64::INFINITY)
            .validate()
            .is_err());
    }

    #[test]
    fn window_configs_require_limit_and_window() {
        let window = Duration::from_secs(60);
        assert!(RateLimitConfig::fixed_window(10, window).validate().is_ok());
        assert!(RateLimitConfig::fixed_window(0, window).validate().is_err());
        assert!(RateLimitConfig::sliding_log(10, Duration::ZERO)
            .validate()
            .is_err());
        assert!(RateLimitConfig::sliding_counter(10, Duration::from_micros(500))
            .validate()
            .is_err());
    }

    #[test]
    fn window_algorithms_ignore_bucket_fields() {
        // Constructors zero the unused fields; validation must not read them.
        let config = RateLimitConfig::sliding_log(5, Duration::from_secs(1));
        assert_eq!(config.capacity, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn ceiling_defaults_to_capacity() {
        let config = RateLimitConfig::token_bucket(5, 2.0);
        assert_eq!(config.token_ceiling(), 5.0);

        let config = config.with_refill_ceiling(RefillCeiling::MinuteOfRefill);
        assert_eq!(config.token_ceiling(), 120.0);
    }

    #[test]
    fn minute_ceiling_never_undercuts_capacity() {
        let config = RateLimitConfig::token_bucket(600, 1.0)
            .with_refill_ceiling(RefillCeiling::MinuteOfRefill);
        assert_eq!(config.token_ceiling(), 600.0);
    }
}
