//! # turnstile
//!
//! `turnstile` provides keyed rate limiting with five interchangeable
//! decision algorithms.
//!
//! ## Core Philosophy
//!
//! Every caller-facing operation is synchronous and non-blocking: a call to
//! [`RateLimiter::try_acquire`] performs one concurrent-map lookup plus one
//! short per-key critical section and returns a [`Decision`]. Nothing waits
//! on I/O, nothing parks rejected requests, and no background timers run:
//! refill, drain and window rotation are all computed lazily from elapsed
//! time at the moment of the request.
//!
//! ## Key Concepts
//!
//! * **Keyed**: state is held per opaque string key, so one limiter instance
//!   serves any number of users, IPs or routes without cross-key contention.
//! * **Five algorithms**: Token Bucket, Leaky Bucket, Fixed Window Counter,
//!   Sliding Window Log and Sliding Window Counter, selected per call via
//!   [`RateLimitConfig`].
//! * **Uniform contract**: every algorithm answers with the same [`Decision`]
//!   record carrying the remaining budget and an advisory retry delay.
//!
//! ## Example
//!
//! ```rust
//! use turnstile::{RateLimiter, RateLimitConfig};
//!
//! let limiter = RateLimiter::new();
//! let config = RateLimitConfig::token_bucket(5, 1.0);
//!
//! let decision = limiter.try_acquire("user-42", &config).unwrap();
//! assert!(decision.admitted);
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

mod clock;
mod config;
mod engine;
mod fixed_window;
mod keyed;
mod leaky_bucket;
mod sliding_counter;
mod sliding_log;
mod token_bucket;

pub use config::{RateLimitConfig, RefillCeiling};
pub use engine::RateLimiter;

/// The closed set of decision algorithms.
///
/// The canonical text form of each tag (accepted by [`FromStr`] and produced
/// by [`fmt::Display`]) is its `SCREAMING_SNAKE_CASE` name, e.g.
/// `"TOKEN_BUCKET"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    TokenBucket,
    LeakyBucket,
    FixedWindowCounter,
    SlidingWindowLog,
    SlidingWindowCounter,
}

impl Algorithm {
    /// All five tags, in dispatch order.
    pub const ALL: [Algorithm; 5] = [
        Algorithm::TokenBucket,
        Algorithm::LeakyBucket,
        Algorithm::FixedWindowCounter,
        Algorithm::SlidingWindowLog,
        Algorithm::SlidingWindowCounter,
    ];

    fn tag(&self) -> &'static str {
        match self {
            Algorithm::TokenBucket => "TOKEN_BUCKET",
            Algorithm::LeakyBucket => "LEAKY_BUCKET",
            Algorithm::FixedWindowCounter => "FIXED_WINDOW_COUNTER",
            Algorithm::SlidingWindowLog => "SLIDING_WINDOW_LOG",
            Algorithm::SlidingWindowCounter => "SLIDING_WINDOW_COUNTER",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TOKEN_BUCKET" => Ok(Algorithm::TokenBucket),
            "LEAKY_BUCKET" => Ok(Algorithm::LeakyBucket),
            "FIXED_WINDOW_COUNTER" => Ok(Algorithm::FixedWindowCounter),
            "SLIDING_WINDOW_LOG" => Ok(Algorithm::SlidingWindowLog),
            "SLIDING_WINDOW_COUNTER" => Ok(Algorithm::SlidingWindowCounter),
            other => Err(Error::UnknownAlgorithm(other.to_owned())),
        }
    }
}

/// Errors surfaced synchronously by the engine.
///
/// A rejected-but-valid decision is *not* an error; it is an ordinary
/// [`Decision`] with `admitted == false`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The algorithm tag is not one of the five defined tags.
    ///
    /// Only reachable through the text boundary ([`Algorithm::from_str`]);
    /// a typed [`Algorithm`] value always dispatches.
    #[error("unknown rate limiting algorithm: {0}")]
    UnknownAlgorithm(String),

    /// A config field is missing or non-positive where the chosen algorithm
    /// requires it, or the key is empty. No state is mutated.
    #[error("invalid rate limit config: {0}")]
    InvalidConfig(&'static str),
}

/// The uniform result of a [`RateLimiter::try_acquire`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request was admitted.
    pub admitted: bool,
    /// Best-effort budget remaining after this call; zero when rejected.
    pub remaining: u32,
    /// Advisory delay until the next admission is likely possible, in whole
    /// seconds. Zero when admitted, at least one second when rejected.
    pub retry_after: Duration,
    /// Short human-readable reason.
    pub message: &'static str,
}

impl Decision {
    pub(crate) fn admit(remaining: u32) -> Self {
        Decision {
            admitted: true,
            remaining,
            retry_after: Duration::ZERO,
            message: "Request allowed",
        }
    }

    pub(crate) fn reject(retry_after_secs: u64, message: &'static str) -> Self {
        Decision {
            admitted: false,
            remaining: 0,
            retry_after: Duration::from_secs(retry_after_secs),
            message,
        }
    }

    /// Whether the request was admitted.
    pub fn is_admitted(&self) -> bool {
        self.admitted
    }

    /// The advisory retry delay in whole seconds.
    pub fn retry_after_secs(&self) -> u64 {
        self.retry_after.as_secs()
    }
}
