//! # Tower Turnstile
//!
//! `tower-turnstile` puts the [`turnstile`] rate limiting engine in front of
//! a [Tower](https://github.com/tower-rs/tower) service.
//!
//! ## How it fits together
//!
//! 1. **Key derivation**: [`GateLayer`] carries a caller-supplied closure
//!    that derives an opaque key from each request, e.g. a client IP, a
//!    header, a path parameter, or a fixed literal for a global limit.
//! 2. **Decision**: each call runs the engine's synchronous `try_acquire`;
//!    admitted requests proceed to the inner service untouched.
//! 3. **Rejection mapping**: rejected requests resolve immediately to
//!    [`GateError::RateLimited`] carrying the engine's retry hint. Nothing
//!    queues and the inner service is never polled for a rejected request.
//!
//! ## Feature Flags
//! - `axum`: Enables [`axum::response::IntoResponse`] for [`GateError`],
//!   mapping rejections to `429 Too Many Requests` with a `Retry-After`
//!   header and a JSON body.

mod error;
mod layer;
mod service;


pub use error::GateError;
pub use layer::GateLayer;
pub use service::GateService;
