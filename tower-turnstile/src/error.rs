/// Errors produced by the gate middleware.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GateError {
    /// The request was rejected by the rate limiting engine.
    ///
    /// The duration indicates when the client should retry. When the `axum`
    /// feature is enabled, this converts to `429 Too Many Requests` with a
    /// `Retry-After` header and a JSON body.
    #[error("{message}")]
    RateLimited {
        /// How long the caller should wait before retrying.
        retry_after: std::time::Duration,
        /// The engine's rejection reason.
        message: &'static str,
    },

    /// The layer was built with a key or config the engine rejects.
    ///
    /// When the `axum` feature is enabled, this converts to
    /// `500 Internal Server Error`.
    #[error(transparent)]
    Config(#[from] turnstile::Error),

    /// An unexpected error occurred in the inner service.
    #[error("Internal service error: {0}")]
    Inner(String),
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for GateError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        use axum::http::header::RETRY_AFTER;

        let timestamp =
            humantime::format_rfc3339_seconds(std::time::SystemTime::now()).to_string();

        match self {
            Self::RateLimited {
                retry_after,
                message,
            } => {
                let secs = retry_after.as_secs().max(1);
                let body = axum::Json(serde_json::json!({
                    "timestamp": timestamp,
                    "status": 429,
                    "error": "Too Many Requests",
                    "message": message,
                    "retryAfterSeconds": secs,
                }));

                let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();
                response
                    .headers_mut()
                    .insert(RETRY_AFTER, axum::http::HeaderValue::from(secs));
                response
            }
            other => {
                let body = axum::Json(serde_json::json!({
                    "timestamp": timestamp,
                    "status": 500,
                    "error": "Internal Server Error",
                    "message": other.to_string(),
                }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}
