use crate::clock::MillisClock;
use crate::keyed::KeyedStore;
use crate::{Decision, RateLimitConfig};

/// Token Bucket: a bucket of fractional tokens per key, refilled
/// continuously at `refill_rate` tokens per second; each admission consumes
/// exactly one token.
///
/// Absorbs bursts up to the bucket's fill level while holding the long-run
/// admit rate at `refill_rate`. Fractional accounting keeps rates below one
/// token per second exact, with no drift. Refill is pull-based: it is
/// computed from elapsed time at the moment of the request, never by a
/// background timer.
pub(crate) struct TokenBucket {
    buckets: KeyedStore<Bucket>,
    clock: MillisClock,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill_ms: u64,
    last_seen_ms: u64,
}

impl TokenBucket {
    pub(crate) fn new(clock: MillisClock) -> Self {
        TokenBucket {
            buckets: KeyedStore::new(),
            clock,
        }
    }

    pub(crate) fn try_acquire(&self, key: &str, config: &RateLimitConfig) -> Decision {
        let now = self.clock.now_ms();

        self.buckets.with_entry(
            key,
            || Bucket {
                tokens: config.capacity as f64,
                last_refill_ms: now,
                last_seen_ms: now,
            },
            |bucket| {
                bucket.refill(now, config);
                bucket.last_seen_ms = now;

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return Decision::admit(bucket.tokens as u32);
                }

                let retry_after = ((1.0 - bucket.tokens) / config.refill_rate).ceil() as u64;
                Decision::reject(retry_after, "Rate limit exceeded - Token bucket depleted")
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
    fn refill(&mut self, now_ms: u64, config: &RateLimitConfig) {
        let elapsed = now_ms.saturating_sub(self.last_refill_ms);
        if elapsed > 0 {
            let refilled = (elapsed as f64 / 1000.0) * config.refill_rate;
            self.tokens = (self.tokens + refilled).min(config.token_ceiling());
            self.last_refill_ms = now_ms;
        }
    }
}
