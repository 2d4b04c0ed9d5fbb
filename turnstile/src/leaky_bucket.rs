use crate::clock::MillisClock;
use crate::keyed::KeyedStore;
use crate::{Decision, RateLimitConfig};

/// Leaky Bucket: water is added on each admission and drains continuously at
/// the configured rate; requests are rejected while the bucket is full.
///
/// Unlike the Token Bucket it accumulates no credit beyond empty, so it
/// cannot pass bursts: the steady-state admit rate equals the leak rate.
pub(crate) struct LeakyBucket {
    buckets: KeyedStore<Bucket>,
    clock: MillisClock,
}

#[derive(Debug)]
struct Bucket {
    water: f64,
    last_leak_ms: u64,
    last_seen_ms: u64,
}

impl LeakyBucket {
    pub(crate) fn new(clock: MillisClock) -> Self {
        LeakyBucket {
            buckets: KeyedStore::new(),
            clock,
        }
    }

    pub(crate) fn try_acquire(&self, key: &str, config: &RateLimitConfig) -> Decision {
        let now = self.clock.now_ms();

        self.buckets.with_entry(
            key,
            || Bucket {
                water: 0.0,
                last_leak_ms: now,
                last_seen_ms: now,
            },
            |bucket| {
                bucket.leak(now, config.refill_rate);
                bucket.last_seen_ms = now;

                if bucket.water < config.capacity as f64 {
                    bucket.water += 1.0;
                    return Decision::admit((config.capacity as f64 - bucket.water) as u32);
                }

                let retry_after = (1.0 / config.refill_rate).ceil() as u64;
                Decision::reject(retry_after, "Rate limit exceeded - Leaky bucket full")
            },
        )
    }

    pub(crate) fn reset(&self, key: &str) {
        self.buckets.remove(key);
    }

    pub(crate) fn purge_idle(&self, cutoff_ms: u64) {
        self.buckets.retain(|bucket| bucket.last_seen_ms >= cutoff_ms);
    }
}

impl Bucket {
    fn leak(&mut self, now_ms: u64, leak_rate: f64) {
        let elapsed = now_ms.saturating_sub(self.last_leak_ms);
        if elapsed > 0 {
            let drained = (elapsed as f64 / 1000.0) * leak_rate;
            self.water = (self.water - drained).max(0.0);
            self.last_leak_ms = now_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quanta::Clock;
    use std::time::Duration;

    fn strategy() -> (LeakyBucket, std::sync::Arc<quanta::Mock>) {
        let (clock, mock) = Clock::mock();
        (LeakyBucket::new(MillisClock::with_clock(clock)), mock)
    }

    #[test]
    fn it_fills_then_rejects_then_drains() {
        let (bucket, mock) = strategy();
        let config = RateLimitConfig::leaky_bucket(10, 1.0);

        for expected_remaining in (0..10).rev() {
            let decision = bucket.try_acquire("k", &config);
            assert!(decision.admitted);
            assert_eq!(decision.remaining, expected_remaining);
        }

        let rejected = bucket.try_acquire("k", &config);
        assert!(!rejected.admitted);
        assert_eq!(rejected.retry_after_secs(), 1);

        mock.increment(Duration::from_secs(1));
        assert!(bucket.try_acquire("k", &config).admitted);
    }

    #[test]
    fn the_retry_hint_is_one_leak_interval() {
        let (bucket, mock) = strategy();
        // One unit drains every four seconds.
        let config = RateLimitConfig::leaky_bucket(2, 0.25);

        assert!(bucket.try_acquire("k", &config).admitted);
        assert!(bucket.try_acquire("k", &config).admitted);

        let rejected = bucket.try_acquire("k", &config);
        assert!(!rejected.admitted);
        assert_eq!(rejected.retry_after_secs(), 4);

        // One full interval drains one unit; refilling it tops the bucket
        // right back up.
        mock.increment(Duration::from_secs(4));
        assert!(bucket.try_acquire("k", &config).admitted);
        assert_eq!(bucket.try_acquire("k", &config).retry_after_secs(), 4);
    }

    #[test]
    fn sustained_throughput_matches_the_leak_rate() {
        let (bucket, mock) = strategy();
        let config = RateLimitConfig::leaky_bucket(5, 1.0);

        for _ in 0..5 {
            let _ = bucket.try_acquire("k", &config);
        }

        // Offer two requests per second for ten seconds; only one per
        // second fits through a full bucket.
        let mut admitted = 0;
        for _ in 0..10 {
            mock.increment(Duration::from_secs(1));
            for _ in 0..2 {
                if bucket.try_acquire("k", &config).admitted {
                    admitted += 1;
                }
            }
        }
        assert_eq!(admitted, 10);
    }

    #[test]
    fn idle_time_builds_no_credit() {
        let (bucket, mock) = strategy();
        let config = RateLimitConfig::leaky_bucket(3, 1.0);

        // A long quiet period leaves the bucket empty, not "negative".
        mock.increment(Duration::from_secs(100));

        let mut admitted = 0;
        while bucket.try_acquire("k", &config).admitted {
            admitted += 1;
        }
        assert_eq!(admitted, 3);
    }
}
