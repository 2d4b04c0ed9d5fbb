use crate::clock::MillisClock;
use crate::keyed::KeyedStore;
use crate::{Decision, RateLimitConfig};

/// Fixed Window Counter: an integer counter per aligned wall-clock window.
///
/// Simple and memory-cheap, but susceptible to boundary bursts: an interval
/// straddling two windows can admit up to twice the limit.
pub(crate) struct FixedWindow {
    counters: KeyedStore<Window>,
    clock: MillisClock,
}

#[derive(Debug)]
struct Window {
    window_id: u64,
    count: u32,
    last_seen_ms: u64,
}

impl FixedWindow {
    pub(crate) fn new(clock: MillisClock) -> Self {
        FixedWindow {
            counters: KeyedStore::new(),
            clock,
        }
    }

    pub(crate) fn try_acquire(&self, key: &str, config: &RateLimitConfig) -> Decision {
        let now = self.clock.now_ms();
        let window_ms = config.window_ms();
        let current_window = now / window_ms;

        self.counters.with_entry(
            key,
            || Window {
                window_id: current_window,
                count: 0,
                last_seen_ms: now,
            },
            |window| {
                if window.window_id != current_window {
                    window.window_id = current_window;
                    window.count = 0;
                }
                window.last_seen_ms = now;

                if window.count < config.limit {
                    window.count += 1;
                    return Decision::admit(config.limit - window.count);
                }

                let window_end = (current_window + 1) * window_ms;
                let retry_after = (window_end - now).div_ceil(1000);
                Decision::reject(retry_after, "Rate limit exceeded - Fixed window limit reached")
            },
        )
    }

    pub(crate) fn reset(&self, key: &str) {
        self.counters.remove(key);
    }

    pub(crate) fn purge_idle(&self, cutoff_ms: u64) {
        self.counters.retain(|window| window.last_seen_ms >= cutoff_ms);
    }
}
