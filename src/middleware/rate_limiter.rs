//! Rate limiting middleware
//!
//! Fixed-window counter per client IP: at most `max_requests` within
//! each `window`. Counters reset when their window elapses.

use axum::{
    body::Body,
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct WindowCounter {
    window_start: Instant,
    count: u32,
}

/// Rate limiter state
#[derive(Clone)]
pub struct RateLimiter {
    counters: Arc<RwLock<HashMap<String, WindowCounter>>>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            counters: Arc::new(RwLock::new(HashMap::new())),
            window,
            max_requests,
        }
    }

    /// Check whether a request from `key` is allowed
    pub async fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut counters = self.counters.write().await;

        let counter = counters.entry(key.to_string()).or_insert(WindowCounter {
            window_start: now,
            count: 0,
        });

        if now.duration_since(counter.window_start) >= self.window {
            counter.window_start = now;
            counter.count = 0;
        }

        if counter.count < self.max_requests {
            counter.count += 1;
            true
        } else {
            false
        }
    }

    /// Drop counters whose window has long expired (call periodically)
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut counters = self.counters.write().await;
        counters.retain(|_, c| now.duration_since(c.window_start) < self.window * 2);
    }
}

/// Create rate limiting middleware layer
pub fn rate_limit_layer(
    rate_limiter: RateLimiter,
) -> impl Fn(
    Request<Body>,
    Next,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Response> + Send>>
       + Clone
       + Send {
    move |request: Request<Body>, next: Next| {
        let rate_limiter = rate_limiter.clone();
        Box::pin(async move {
            let client_key = extract_client_ip(&request);

            if !rate_limiter.check(&client_key).await {
                tracing::warn!(client = %client_key, "rate limit exceeded");
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, "1")],
                    "Too many requests. Please try again later.",
                )
                    .into_response();
            }

            next.run(request).await
        })
    }
}

/// Extract client IP from proxy headers
fn extract_client_ip(request: &Request<Body>) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for") {
        if let Ok(s) = forwarded.to_str() {
            if let Some(ip) = s.split(',').next() {
                return ip.trim().to_string();
            }
        }
    }

    if let Some(real_ip) = request.headers().get("x-real-ip") {
        if let Ok(s) = real_ip.to_str() {
            return s.to_string();
        }
    }

    "unknown".to_string()
}
