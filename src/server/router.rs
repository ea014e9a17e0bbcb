use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::{Router, routing::get};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tower::ServiceBuilder;
use tracing::Instrument;
use uuid::Uuid;

use super::admin::admin_router;
use super::general::general_router;
use super::response::ApiError;
use super::user::user_router;
use crate::store::Store;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Per client IP limiter; `None` when limiting is disabled.
    pub limiter: Option<DefaultKeyedRateLimiter<IpAddr>>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, rate_limit_per_minute: u32) -> Self {
        let limiter = NonZeroU32::new(rate_limit_per_minute)
            .map(|per_minute| RateLimiter::keyed(Quota::per_minute(per_minute)));
        Self { store, limiter }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!("request", id = %request_id);
    let start = Instant::now();

    let mut response = next.run(request).instrument(span.clone()).await;

    let latency = start.elapsed();
    let status = response.status();

    span.in_scope(|| {
        tracing::info!(
            "{} {} {} {}ms",
            method,
            uri.path(),
            status.as_u16(),
            latency.as_millis()
        );
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

async fn rate_limit(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    let Some(limiter) = &state.limiter else {
        return next.run(request).await;
    };

    // In-process callers have no peer address and share one bucket.
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::LOCALHOST), |info| info.0.ip());

    if limiter.check_key(&ip).is_err() {
        tracing::warn!("Rate limit exceeded for {ip}");
        return ApiError::too_many_requests().into_response();
    }

    next.run(request).await
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/admin", admin_router())
        .nest("/api/v1", general_router().merge(user_router()))
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(log_request))
                .layer(middleware::from_fn_with_state(state.clone(), rate_limit)),
        )
        .with_state(state)
}
