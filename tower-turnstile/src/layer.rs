use std::sync::Arc;

use tower::Layer;
use turnstile::{RateLimitConfig, RateLimiter};

use crate::service::GateService;

/// Applies keyed rate limiting to requests.
///
/// The layer carries a shared engine, the per-call config, and a closure
/// deriving the rate-limit key from each request. Cloned layers (and the
/// services they produce) share one engine, so the limit is enforced across
/// every clone.
pub struct GateLayer<F> {
    limiter: Arc<RateLimiter>,
    config: RateLimitConfig,
    key_fn: Arc<F>,
}

impl<F> Clone for GateLayer<F> {
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
            config: self.config.clone(),
            key_fn: Arc::clone(&self.key_fn),
        }
    }
}

impl<F> GateLayer<F> {
    /// Create a `GateLayer` checking `config` against keys derived by
    /// `key_fn`.
    pub fn new(limiter: Arc<RateLimiter>, config: RateLimitConfig, key_fn: F) -> Self {
        GateLayer {
            limiter,
            config,
            key_fn: Arc::new(key_fn),
        }
    }
}

impl<S, F> Layer<S> for GateLayer<F> {
    type Service = GateService<S, F>;

    fn layer(&self, service: S) -> Self::Service {
        GateService::new(
            service,
            Arc::clone(&self.limiter),
            self.config.clone(),
            Arc::clone(&self.key_fn),
        )
    }
}
