//! Per-client rate limiting middleware.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::config::RateLimitConfig;
use crate::gateway::GatewayError;
use crate::observability::metrics;

/// A simple token bucket rate limiter.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    /// Tokens available at `now` without consuming any.
    fn available(&self, now: Instant, capacity: f64, refill_rate: f64) -> f64 {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        (self.tokens + elapsed * refill_rate).min(capacity)
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Buckets keyed by client IP. `max_requests` per `window`, refilled continuously.
pub struct RateLimiter {
    buckets: DashMap<String, TokenBucket>,
    capacity: f64,
    refill_per_sec: f64,
    window: Duration,
    exempt: Vec<String>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let capacity = f64::from(max_requests.max(1));
        let window = window.max(Duration::from_secs(1));
        Self {
            buckets: DashMap::new(),
            capacity,
            refill_per_sec: capacity / window.as_secs_f64(),
            window,
            exempt: Vec::new(),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    /// Paths never counted against a client (health and info surfaces).
    pub fn exempt(mut self, paths: impl IntoIterator<Item = String>) -> Self {
        self.exempt.extend(paths);
        self
    }

    pub fn check(&self, client: &str) -> bool {
        let mut bucket = self
            .buckets
            .entry(client.to_string())
            .or_insert_with(|| TokenBucket::new(self.capacity));
        bucket.try_acquire(self.capacity, self.refill_per_sec)
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.buckets.len()
    }

    /// Drop buckets that have refilled to capacity. A dropped client starts
    /// again with a full bucket, so this never changes a decision.
    pub fn prune_idle(&self) -> usize {
        let now = Instant::now();
        let mut pruned = 0;
        self.buckets.retain(|_, bucket| {
            let idle = bucket.available(now, self.capacity, self.refill_per_sec) >= self.capacity;
            if idle {
                pruned += 1;
            }
            !idle
        });
        pruned
    }

    /// Prune idle buckets once per window until shutdown is signalled.
    pub async fn run_pruner(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = time::interval_at(Instant::now() + self.window, self.window);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let pruned = self.prune_idle();
                    if pruned > 0 {
                        tracing::debug!(pruned, remaining = self.tracked_clients(), "Pruned idle rate limit buckets");
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
    }

    fn is_exempt(&self, path: &str) -> bool {
        self.exempt.iter().any(|p| p == path)
    }
}

/// Middleware function for per-client rate limiting.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if limiter.is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    // ConnectInfo is absent when the router is driven without a socket.
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if limiter.check(&client) {
        next.run(request).await
    } else {
        tracing::warn!(client = %client, "Rate limit exceeded");
        metrics::record_rate_limited();
        GatewayError::RateLimited.into_response()
    }
}
