//! Token-bucket rate limiting keyed by remote IP, with a background sweep
//! that evicts buckets idle longer than [`STALE_AFTER`] (`spec.md` §5's
//! "reader-writer lock with periodic cleanup" guidance, §4.15).

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use axum::extract::State;

/// Requests allowed per bucket refill.
const BURST: f64 = 20.0;
/// Tokens restored per second.
const REFILL_PER_SEC: f64 = 5.0;
/// Buckets untouched for this long are dropped by the sweep task.
const STALE_AFTER: Duration = Duration::from_secs(300);
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct Bucket {
    tokens: f64,
    last_refill: Instant,
    last_seen: Instant,
}

impl Bucket {
    fn new() -> Self {
        let now = Instant::now();
        Bucket { tokens: BURST, last_refill: now, last_seen: now }
    }

    fn try_take(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * REFILL_PER_SEC).min(BURST);
        self.last_refill = now;
        self.last_seen = now;
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub struct RateLimiter {
    buckets: RwLock<HashMap<IpAddr, Bucket>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        RateLimiter { buckets: RwLock::new(HashMap::new()) }
    }

    /// Returns `true` if the caller at `addr` is allowed to proceed.
    pub fn check(&self, addr: IpAddr) -> bool {
        if let Some(bucket) = self.buckets.write().unwrap().get_mut(&addr) {
            return bucket.try_take();
        }
        let mut bucket = Bucket::new();
        let allowed = bucket.try_take();
        self.buckets.write().unwrap().insert(addr, bucket);
        allowed
    }

    fn sweep(&self) {
        let now = Instant::now();
        self.buckets.write().unwrap().retain(|_, bucket| now.duration_since(bucket.last_seen) < STALE_AFTER);
    }

    /// Spawns the periodic cleanup task; the returned handle is aborted on
    /// server shutdown.
    pub fn spawn_cleanup(self: &std::sync::Arc<Self>) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                limiter.sweep();
            }
        })
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

/// Middleware form of [`RateLimiter::check`], keyed by the connecting
/// socket's IP (not `X-Forwarded-For` — this control plane is not expected
/// to sit behind a proxy). Reads `ConnectInfo` out of the request
/// extensions rather than as an extractor so the middleware still runs
/// (against a shared fallback bucket) when the server wasn't bound with
/// `into_make_service_with_connect_info`, e.g. under test.
pub async fn enforce(
    State(state): State<crate::state::AppState>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<axum::response::Response, crate::error::ApiError> {
    let ip = req
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip())
        .unwrap_or_else(|| std::net::IpAddr::from([0, 0, 0, 0]));

    if state.rate_limiter.check(ip) {
        Ok(next.run(req).await)
    } else {
        Err(crate::error::ApiError(niac_types::Error::RateLimited))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausts_burst_then_refuses() {
        let limiter = RateLimiter::new();
        let addr: IpAddr = "127.0.0.1".parse().unwrap();
        let mut allowed = 0;
        for _ in 0..(BURST as u32 + 5) {
            if limiter.check(addr) {
                allowed += 1;
            }
        }
        assert_eq!(allowed, BURST as u32);
    }

    #[test]
    fn separate_remotes_get_separate_buckets() {
        let limiter = RateLimiter::new();
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();
        for _ in 0..(BURST as u32) {
            assert!(limiter.check(a));
        }
        assert!(limiter.check(b));
    }
}
