use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Requests admitted in the current window and when that window opened.
#[derive(Debug, Clone, Copy)]
struct Window {
    opened: Instant,
    admitted: usize,
}

/// Per-process budget of upstream-bound requests, reset every `period`.
///
/// Protects the upstream API key's quota when the proxy is public.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    budget: usize,
    period: Duration,
    window: Arc<Mutex<Window>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(budget: usize, period: Duration) -> Self {
        Self {
            budget,
            period,
            window: Arc::new(Mutex::new(Window {
                opened: Instant::now(),
                admitted: 0,
            })),
        }
    }

    #[must_use]
    pub fn per_minute(budget: usize) -> Self {
        Self::new(budget, Duration::from_secs(60))
    }

    /// Admits one request at `now`, or returns how long until the window
    /// reopens.
    async fn try_acquire(&self, now: Instant) -> Result<(), Duration> {
        let mut window = self.window.lock().await;
        let elapsed = now.saturating_duration_since(window.opened);
        if elapsed >= self.period {
            *window = Window {
                opened: now,
                admitted: 0,
            };
        } else if window.admitted >= self.budget {
            return Err(self.period - elapsed);
        }
        window.admitted += 1;
        Ok(())
    }
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Rejects requests over the window budget with 429 and `retry-after`.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let Err(wait) = rate_limit.try_acquire(Instant::now()).await else {
        return next.run(req).await;
    };

    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let retry_after = wait.as_secs().max(1);
    tracing::warn!(path = %req.uri().path(), retry_after, "rate limit exceeded");

    let mut res = ApiError::new(request_id, "rate_limited", "rate limit exceeded").into_response();
    res.headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    res
}
