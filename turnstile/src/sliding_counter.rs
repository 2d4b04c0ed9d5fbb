use crate::clock::MillisClock;
use crate::keyed::KeyedStore;
use crate::{Decision, RateLimitConfig};

/// Sliding Window Counter: counters for the current and previous aligned
/// windows, blended by how far the current window has progressed.
///
/// The previous window's count is weighted by the fraction of it still
/// covered by the trailing window, approximating a true sliding window from
/// two integers: `weighted = previous * (1 - position) + current`. More
/// accurate than a fixed window, far cheaper than a timestamp log.
pub(crate) struct SlidingCounter {
    windows: KeyedStore<Window>,
    clock: MillisClock,
}

#[derive(Debug)]
struct Window {
    window_id: u64,
    current: u32,
    previous: u32,
    last_seen_ms: u64,
}

impl SlidingCounter {
    pub(crate) fn new(clock: MillisClock) -> Self {
        SlidingCounter {
            windows: KeyedStore::new(),
            clock,
        }
    }

    pub(crate) fn try_acquire(&self, key: &str, config: &RateLimitConfig) -> Decision {
        let now = self.clock.now_ms();
        let window_ms = config.window_ms();
        let current_window = now / window_ms;

        self.windows.with_entry(
            key,
            || Window {
                window_id: current_window,
                current: 0,
                previous: 0,
                last_seen_ms: now,
            },
            |window| {
                if window.window_id + 1 < current_window {
                    // A gap of more than one window: nothing carries over.
                    window.window_id = current_window;
                    window.current = 0;
                    window.previous = 0;
                } else if window.window_id + 1 == current_window {
                    window.window_id = current_window;
                    window.previous = window.current;
                    window.current = 0;
                }
                window.last_seen_ms = now;

                let window_start = current_window * window_ms;
                let position = (now - window_start) as f64 / window_ms as f64;
                let weighted = window.previous as f64 * (1.0 - position) + window.current as f64;

                if weighted < config.limit as f64 {
                    window.current += 1;
                    let remaining =
                        (config.limit as i64 - weighted.ceil() as i64 - 1).max(0) as u32;
                    return Decision::admit(remaining);
                }

                let window_end = window_start + window_ms;
                let retry_after = ((window_end - now) / 1000).max(1);
                Decision::reject(
                    retry_after,
                    "Rate limit exceeded - Sliding window counter limit reached",
                )
            },
        )
    }

    pub(crate) fn reset(&self, key: &str) {
        self.windows.remove(key);
    }

    pub(crate) fn purge_idle(&self, cutoff_ms: u64) {
        self.windows.retain(|window| window.last_seen_ms >= cutoff_ms);
    }
}
