//! Rate limiting middleware for credential endpoints.
//!
//! Provides IP-based rate limiting using the token bucket algorithm. Only
//! requests whose path starts with one of the configured prefixes count
//! against the limit; everything else passes straight through.
//!
//! Clients are keyed on the peer address. Forwarded headers are only read
//! when `trust_proxy` is set, since anyone can send them.
//!
//! # Example
//!
//! ```rust,ignore
//! let rate_limiter = RateLimiter::new(&config.rate_limit);
//! let app = Router::new()
//!     .nest("/api/v1", api)
//!     .layer(rate_limiter.layer());
//! ```

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovRateLimiter,
};
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    task::{Context, Poll},
    time::{Duration, Instant},
};
use tower::{Layer, Service};
use tracing::warn;

use crate::config::RateLimitConfig;
use crate::error::AppError;

type IpLimiter = GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// One client's bucket and when it was last used
struct ClientBucket {
    limiter: Arc<IpLimiter>,
    last_seen: Instant,
}

/// Rate limiter state shared across requests
#[derive(Clone)]
pub struct RateLimiter {
    /// Per-IP rate limiters
    limiters: Arc<DashMap<IpAddr, ClientBucket>>,
    /// Quota applied to each IP; `None` when limiting is disabled
    quota: Option<Quota>,
    /// Path prefixes subject to the limit
    paths: Arc<Vec<String>>,
    /// A bucket unused this long has fully refilled
    idle_after: Duration,
    trust_proxy: bool,
}

impl RateLimiter {
    /// Create a new rate limiter from configuration
    pub fn new(config: &RateLimitConfig) -> Self {
        let quota = if config.enabled {
            quota_for(config.requests_per_window, config.window_seconds)
        } else {
            None
        };

        Self {
            limiters: Arc::new(DashMap::new()),
            quota,
            paths: Arc::new(config.paths.clone()),
            idle_after: Duration::from_secs(config.window_seconds),
            trust_proxy: config.trust_proxy,
        }
    }

    /// Does the limiter apply to `path`
    pub fn applies_to(&self, path: &str) -> bool {
        self.quota.is_some() && self.paths.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Create a Tower Layer for this rate limiter
    pub fn layer(&self) -> RateLimiterLayer {
        RateLimiterLayer {
            rate_limiter: self.clone(),
        }
    }

    /// Check if a request from the given IP is allowed
    pub fn check(&self, ip: IpAddr) -> bool {
        let Some(quota) = self.quota else {
            return true;
        };

        let limiter = {
            let mut bucket = self.limiters.entry(ip).or_insert_with(|| ClientBucket {
                limiter: Arc::new(GovRateLimiter::direct(quota)),
                last_seen: Instant::now(),
            });
            bucket.last_seen = Instant::now();
            Arc::clone(&bucket.limiter)
        };

        limiter.check().is_ok()
    }

    /// Drop buckets that have been idle for a whole window. Those are full
    /// again, so forgetting them changes no client's allowance.
    pub fn cleanup(&self) {
        let idle_after = self.idle_after;
        self.limiters
            .retain(|_, bucket| bucket.last_seen.elapsed() < idle_after);
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.limiters.len()
    }
}

/// Tower Layer for rate limiting
#[derive(Clone)]
pub struct RateLimiterLayer {
    rate_limiter: RateLimiter,
}

impl<S> Layer<S> for RateLimiterLayer {
    type Service = RateLimiterMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimiterMiddleware {
            inner,
            rate_limiter: self.rate_limiter.clone(),
        }
    }
}

/// Rate limiting middleware service
#[derive(Clone)]
pub struct RateLimiterMiddleware<S> {
    inner: S,
    rate_limiter: RateLimiter,
}

impl<S> Service<Request<Body>> for RateLimiterMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let limited = self.rate_limiter.applies_to(req.uri().path());
        let ip = client_ip(&req, self.rate_limiter.trust_proxy);

        let rate_limiter = self.rate_limiter.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if limited && !rate_limiter.check(ip) {
                warn!(ip = %ip, "Rate limit exceeded");
                return Ok(
                    AppError::rate_limit_exceeded("Too many requests. Please try again later.")
                        .into_response(),
                );
            }

            // Proceed with request
            inner.call(req).await
        })
    }
}

/// Client IP for a request: the peer address, or the forwarded headers
/// when the proxy in front is trusted
fn client_ip<B>(req: &Request<B>, trust_proxy: bool) -> IpAddr {
    if trust_proxy {
        if let Some(ip) = forwarded_ip(req) {
            return ip;
        }
    }

    if let Some(connect_info) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return connect_info.0.ip();
    }

    IpAddr::from([127, 0, 0, 1])
}

fn forwarded_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    // X-Forwarded-For first, then X-Real-IP
    if let Some(forwarded) = req.headers().get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            // Take the first IP in the chain
            if let Some(first_ip) = forwarded_str.split(',').next() {
                if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                    return Some(ip);
                }
            }
        }
    }

    req.headers()
        .get("x-real-ip")
        .and_then(|real_ip| real_ip.to_str().ok())
        .and_then(|ip_str| ip_str.trim().parse().ok())
}

/// `requests` per `window_seconds`, replenished evenly, with the whole
/// window's allowance available as burst
fn quota_for(requests: u32, window_seconds: u64) -> Option<Quota> {
    let burst = NonZeroU32::new(requests)?;
    let period = Duration::from_secs(window_seconds) / burst.get();
    Some(Quota::with_period(period)?.allow_burst(burst))
}
