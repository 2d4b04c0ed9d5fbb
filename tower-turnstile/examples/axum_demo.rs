//! Axum demo for keyed rate limiting.
//!
//! Run with any of the five algorithms:
//!
//! ```bash
//! cargo run -p tower-turnstile --features axum --example axum_demo -- \
//!     --algorithm token-bucket --capacity 5 --refill-rate 1.0
//! ```
//!
//! Routes:
//!  - `GET /` is rate limited per client IP with the configured algorithm.
//!  - `POST /probe?key=<key>` takes a JSON config and returns the raw
//!    engine decision for that key, without an HTTP error mapping.
//!  - `DELETE /reset/{algorithm}/{key}` drops one key's state for one
//!    algorithm; `DELETE /reset/{key}` drops it everywhere.
//!  - `GET /health` is never limited.
//!
//! Verify enforcement with `hey` (or your load tool of choice). With the
//! default token bucket of capacity 5 refilling once per second, a burst of
//! 20 sees 5 successes and 15 `429`s carrying `Retry-After`:
//!
//! ```bash
//! hey -n 20 -c 1 http://localhost:3000/
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;

use axum::Json;
use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::extract::ConnectInfo;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::Request;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::{delete, get, post};
use clap::Parser;
use clap::ValueEnum;
use serde::Deserialize;
use serde_json::json;
use tower::BoxError;
use tower::ServiceBuilder;
use tower_turnstile::GateError;
use tower_turnstile::GateLayer;
use tracing_subscriber::EnvFilter;
use turnstile::{Algorithm, RateLimitConfig, RateLimiter, RefillCeiling};

#[derive(ValueEnum, Clone, Debug)]
enum AlgorithmArg {
    TokenBucket,
    LeakyBucket,
    FixedWindow,
    SlidingLog,
    SlidingCounter,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The rate limiting algorithm guarding `/`
    #[arg(short, long, value_enum, default_value_t = AlgorithmArg::TokenBucket)]
    algorithm: AlgorithmArg,

    /// Requests per window (window algorithms)
    #[arg(short, long, default_value_t = 5)]
    limit: u32,

    /// Window size (window algorithms), e.g. "60s", "500ms", "5min"
    #[arg(short, long, value_parser = humantime::parse_duration, default_value = "60s")]
    window: Duration,

    /// Bucket capacity (bucket algorithms)
    #[arg(short, long, default_value_t = 5)]
    capacity: u32,

    /// Tokens refilled or units drained per second (bucket algorithms)
    #[arg(short, long, default_value_t = 1.0)]
    refill_rate: f64,

    /// The address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let config = match args.algorithm {
        AlgorithmArg::TokenBucket => RateLimitConfig::token_bucket(args.capacity, args.refill_rate),
        AlgorithmArg::LeakyBucket => RateLimitConfig::leaky_bucket(args.capacity, args.refill_rate),
        AlgorithmArg::FixedWindow => RateLimitConfig::fixed_window(args.limit, args.window),
        AlgorithmArg::SlidingLog => RateLimitConfig::sliding_log(args.limit, args.window),
        AlgorithmArg::SlidingCounter => RateLimitConfig::sliding_counter(args.limit, args.window),
    };
    config.validate()?;

    let limiter = Arc::new(RateLimiter::new());

    // Demo routes keyed by client IP.
    let gate = GateLayer::new(Arc::clone(&limiter), config.clone(), |req: &Request| {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip().to_string())
            .unwrap_or_else(|| "anonymous".to_owned())
    });

    let limited = Router::new().route("/", get(hello)).layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_gate_error))
            .layer(gate)
            .map_err(BoxError::from),
    );

    let admin = Router::new()
        .route("/probe", post(probe))
        .route("/reset/{algorithm}/{key}", delete(reset))
        .route("/reset/{key}", delete(reset_all))
        .route("/health", get(health))
        .with_state(Arc::clone(&limiter));

    let app = limited.merge(admin);

    tracing::info!(
        algorithm = ?args.algorithm,
        config = ?config,
        "rate limiting / per client IP"
    );

    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn hello() -> &'static str {
    "Hello, turnstile!"
}

/// The signature must match BoxError -> IntoResponse
async fn handle_gate_error(err: BoxError) -> impl IntoResponse {
    if let Ok(gate_err) = err.downcast::<GateError>() {
        gate_err.into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Service Error").into_response()
    }
}

#[derive(Debug, Deserialize)]
struct ProbeParams {
    key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProbeConfig {
    algorithm: String,
    #[serde(default)]
    limit: u32,
    #[serde(default)]
    window_seconds: u64,
    #[serde(default)]
    capacity: u32,
    #[serde(default)]
    refill_rate: f64,
}

/// Raw engine probe: applies the posted config to the query key and returns
/// the decision as JSON, whether admitted or not.
async fn probe(
    State(limiter): State<Arc<RateLimiter>>,
    Query(params): Query<ProbeParams>,
    Json(body): Json<ProbeConfig>,
) -> Response {
    let algorithm = match body.algorithm.parse::<Algorithm>() {
        Ok(algorithm) => algorithm,
        Err(err) => return bad_request(err),
    };

    let config = RateLimitConfig {
        algorithm,
        limit: body.limit,
        window: Duration::from_secs(body.window_seconds),
        capacity: body.capacity,
        refill_rate: body.refill_rate,
        refill_ceiling: RefillCeiling::default(),
    };

    match limiter.try_acquire(&params.key, &config) {
        Ok(decision) => Json(json!({
            "allowed": decision.admitted,
            "remainingTokens": decision.remaining,
            "retryAfterSeconds": decision.retry_after_secs(),
            "message": decision.message,
            "timestamp": timestamp(),
        }))
        .into_response(),
        Err(err) => bad_request(err),
    }
}

async fn reset(
    State(limiter): State<Arc<RateLimiter>>,
    Path((algorithm, key)): Path<(String, String)>,
) -> Response {
    let algorithm = match algorithm.parse::<Algorithm>() {
        Ok(algorithm) => algorithm,
        Err(err) => return bad_request(err),
    };

    limiter.reset(&key, algorithm);
    Json(json!({
        "message": "Rate limiter reset successfully",
        "type": algorithm.to_string(),
        "key": key,
        "timestamp": timestamp(),
    }))
    .into_response()
}

async fn reset_all(
    State(limiter): State<Arc<RateLimiter>>,
    Path(key): Path<String>,
) -> Response {
    limiter.reset_all(&key);
    Json(json!({
        "message": "Rate limiter reset successfully",
        "key": key,
        "timestamp": timestamp(),
    }))
    .into_response()
}

async fn health() -> Response {
    Json(json!({ "status": "UP", "timestamp": timestamp() })).into_response()
}

fn bad_request(err: turnstile::Error) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "status": 400,
            "error": "Bad Request",
            "message": err.to_string(),
            "timestamp": timestamp(),
        })),
    )
        .into_response()
}

fn timestamp() -> String {
    humantime::format_rfc3339_seconds(SystemTime::now()).to_string()
}
