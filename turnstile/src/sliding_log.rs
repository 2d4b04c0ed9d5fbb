use std::collections::VecDeque;

use crate::clock::MillisClock;
use crate::keyed::KeyedStore;
use crate::{Decision, RateLimitConfig};

/// Sliding Window Log: a FIFO queue of admission timestamps, trimmed to the
/// trailing window on every call.
///
/// Exact: at most `limit` admissions fall inside any sliding window. The
/// memory cost is one timestamp per admission in the window.
pub(crate) struct SlidingLog {
    logs: KeyedStore<Log>,
    clock: MillisClock,
}

#[derive(Debug)]
struct Log {
    stamps: VecDeque<u64>,
    last_seen_ms: u64,
}

impl SlidingLog {
    pub(crate) fn new(clock: MillisClock) -> Self {
        SlidingLog {
            logs: KeyedStore::new(),
            clock,
        }
    }

    pub(crate) fn try_acquire(&self, key: &str, config: &RateLimitConfig) -> Decision {
        let now = self.clock.now_ms();
        let window_ms = config.window_ms();
        let horizon = now.saturating_sub(window_ms);

        self.logs.with_entry(
            key,
            || Log {
                stamps: VecDeque::new(),
                last_seen_ms: now,
            },
            |log| {
                while log.stamps.front().is_some_and(|&stamp| stamp < horizon) {
                    log.stamps.pop_front();
                }
                log.last_seen_ms = now;

                if log.stamps.len() < config.limit as usize {
                    log.stamps.push_back(now);
                    return Decision::admit(config.limit - log.stamps.len() as u32);
                }

                let oldest = log.stamps.front().copied().unwrap_or(now);
                let retry_after = ((oldest + window_ms).saturating_sub(now) / 1000).max(1);
                Decision::reject(retry_after, "Rate limit exceeded - Sliding window limit reached")
            },
        )
    }

    pub(crate) fn reset(&self, key: &str) {
        self.logs.remove(key);
    }

    pub(crate) fn purge_idle(&self, cutoff_ms: u64) {
        self.logs.retain(|log| log.last_seen_ms >= cutoff_ms);
    }
}
