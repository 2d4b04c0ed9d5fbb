use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

use futures::future::{Either, Ready, ready};
use tower::BoxError;
use tower::Service;
use turnstile::{RateLimitConfig, RateLimiter};

use crate::GateError;

/// The service produced by [`GateLayer`](crate::GateLayer).
///
/// The engine decides synchronously, so the decision happens in `call`: an
/// admitted request returns the inner future directly, a rejected one
/// resolves immediately without touching the inner service.
pub struct GateService<S, F> {
    inner: S,
    limiter: Arc<RateLimiter>,
    config: RateLimitConfig,
    key_fn: Arc<F>,
}

impl<S, F> Clone for GateService<S, F>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: Arc::clone(&self.limiter),
            config: self.config.clone(),
            key_fn: Arc::clone(&self.key_fn),
        }
    }
}

impl<S, F> GateService<S, F> {
    pub(crate) fn new(
        inner: S,
        limiter: Arc<RateLimiter>,
        config: RateLimitConfig,
        key_fn: Arc<F>,
    ) -> Self {
        GateService {
            inner,
            limiter,
            config,
            key_fn,
        }
    }
}

impl<S, F, Req> Service<Req> for GateService<S, F>
where
    S: Service<Req, Error = BoxError>,
    F: Fn(&Req) -> String,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = Either<S::Future, Ready<Result<S::Response, BoxError>>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let key = (self.key_fn)(&req);

        match self.limiter.try_acquire(&key, &self.config) {
            Ok(decision) if decision.admitted => {
                tracing::debug!(
                    key = %key,
                    remaining = decision.remaining,
                    "request admitted"
                );
                Either::Left(self.inner.call(req))
            }
            Ok(decision) => {
                tracing::warn!(
                    key = %key,
                    retry_after_secs = decision.retry_after_secs(),
                    "rate limit exceeded"
                );
                Either::Right(ready(Err(GateError::RateLimited {
                    retry_after: decision.retry_after,
                    message: decision.message,
                }
                .into())))
            }
            Err(err) => Either::Right(ready(Err(GateError::from(err).into()))),
        }
    }
}
