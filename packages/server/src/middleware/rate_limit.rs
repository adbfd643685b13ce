//! Per-IP fixed-window rate limiting.
//!
//! The client key is taken from `X-Forwarded-For` (leftmost entry), then
//! `X-Real-IP`, then a shared `"unknown"` bucket. Over-limit requests get a
//! 429 envelope with a `Retry-After` header. A limit of `0` disables the
//! limiter.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use hearth_api::Envelope;

/// Fixed-window request counter keyed by client IP.
pub struct RateLimiter {
    state: Mutex<State>,
    max_per_window: u32,
    window: Duration,
}

struct State {
    windows: HashMap<String, Window>,
    last_sweep: Instant,
}

struct Window {
    count: u32,
    started: Instant,
}

impl RateLimiter {
    /// Limit each client to `max_per_minute` requests. `0` disables limiting.
    pub fn new(max_per_minute: u32) -> Self {
        Self::with_window(max_per_minute, Duration::from_secs(60))
    }

    pub fn with_window(max_per_window: u32, window: Duration) -> Self {
        Self {
            state: Mutex::new(State {
                windows: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            max_per_window,
            window,
        }
    }

    /// Count a request from `key`. On refusal returns the whole seconds
    /// until the key's window resets (at least 1).
    pub fn check(&self, key: &str) -> Result<(), u64> {
        if self.max_per_window == 0 {
            return Ok(());
        }

        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());

        // Expired windows are dropped at most once per window length.
        if now.duration_since(state.last_sweep) >= self.window {
            let window = self.window;
            state
                .windows
                .retain(|_, w| now.duration_since(w.started) < window);
            state.last_sweep = now;
        }

        let w = state.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });

        let elapsed = now.duration_since(w.started);
        if elapsed >= self.window {
            w.count = 0;
            w.started = now;
        }

        if w.count >= self.max_per_window {
            let remaining = self.window.saturating_sub(now.duration_since(w.started));
            return Err(remaining.as_secs().max(1));
        }

        w.count += 1;
        Ok(())
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .windows
            .len()
    }
}

/// `from_fn` middleware that applies `limiter` to every request.
pub async fn rate_limit_middleware(
    limiter: Arc<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    let key = client_key(req.headers());
    match limiter.check(&key) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            tracing::warn!(client = %key, retry_after, "rate limit exceeded");
            let mut resp = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(Envelope::error("Too many requests")),
            )
                .into_response();
            if let Ok(v) = HeaderValue::from_str(&retry_after.to_string()) {
                resp.headers_mut().insert("retry-after", v);
            }
            resp
        }
    }
}

fn client_key(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    header("x-forwarded-for")
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .or_else(|| header("x-real-ip"))
        .unwrap_or("unknown")
        .to_string()
}
