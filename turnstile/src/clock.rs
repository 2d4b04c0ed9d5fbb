use quanta::{Clock, Instant};

/// Millisecond clock shared by every strategy in an engine.
///
/// All algorithm arithmetic runs on deltas and integer window ids, so the
/// absolute origin is irrelevant; readings are taken relative to a fixed
/// anchor captured at construction. `duration_since` saturates at zero, so a
/// clock that steps backwards grants no admission credit.
#[derive(Debug, Clone)]
pub(crate) struct MillisClock {
    clock: Clock,
    anchor: Instant,
}

impl MillisClock {
    pub(crate) fn with_clock(clock: Clock) -> Self {
        let anchor = clock.now();
        MillisClock { clock, anchor }
    }

    /// Milliseconds elapsed since the anchor.
    pub(crate) fn now_ms(&self) -> u64 {
        self.clock.now().duration_since(self.anchor).as_millis() as u64
    }
}
