use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::UserId;

/// Policy hook consulted before every provider call.
#[async_trait]
pub trait Guard: Send + Sync {
    async fn allow(&self, user_id: UserId) -> bool;
}

// ============== Rate Limiter (Token Bucket) ==============

#[derive(Clone, Debug)]
struct Bucket {
    tokens: f64,
    last_update: Instant,
}

#[derive(Clone, Debug)]
pub struct RateLimiter {
    enabled: bool,
    max_tokens: f64,
    refill_per_sec: f64,
    window: Duration,
    buckets: HashMap<UserId, Bucket>,
    last_sweep: Instant,
}

impl RateLimiter {
    pub fn new(enabled: bool, max_tokens: u32, window: Duration) -> Self {
        let max_tokens_f = max_tokens as f64;
        let window_secs = window.as_secs_f64().max(1e-9);

        Self {
            enabled,
            max_tokens: max_tokens_f,
            refill_per_sec: max_tokens_f / window_secs,
            window,
            buckets: HashMap::new(),
            last_sweep: Instant::now(),
        }
    }

    pub fn check(&mut self, user_id: UserId) -> (bool, Option<Duration>) {
        self.check_at(user_id, Instant::now())
    }

    pub fn check_at(&mut self, user_id: UserId, now: Instant) -> (bool, Option<Duration>) {
        if !self.enabled {
            return (true, None);
        }

        if now.saturating_duration_since(self.last_sweep) >= self.window {
            self.sweep(now);
        }

        let bucket = self.buckets.entry(user_id).or_insert_with(|| Bucket {
            tokens: self.max_tokens,
            last_update: now,
        });

        let elapsed = now.saturating_duration_since(bucket.last_update).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.max_tokens);
        bucket.last_update = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return (true, None);
        }

        if self.refill_per_sec <= 0.0 {
            return (false, None);
        }
        let secs = (1.0 - bucket.tokens) / self.refill_per_sec;
        (false, Some(Duration::from_secs_f64(secs.max(0.0))))
    }

    /// Drop buckets that have refilled completely; they equal a fresh bucket.
    fn sweep(&mut self, now: Instant) {
        let (max, rate) = (self.max_tokens, self.refill_per_sec);
        self.buckets.retain(|_, b| {
            let elapsed = now.saturating_duration_since(b.last_update).as_secs_f64();
            b.tokens + elapsed * rate < max
        });
        self.last_sweep = now;
    }
}

/// Guard backed by a shared per-user token bucket.
#[derive(Debug)]
pub struct RateLimitGuard {
    limiter: Mutex<RateLimiter>,
}

impl RateLimitGuard {
    pub fn new(limiter: RateLimiter) -> Self {
        Self {
            limiter: Mutex::new(limiter),
        }
    }
}

#[async_trait]
impl Guard for RateLimitGuard {
    async fn allow(&self, user_id: UserId) -> bool {
        let (ok, retry_after) = self.limiter.lock().await.check(user_id);
        if !ok {
            tracing::info!(
                user_id = user_id.0,
                retry_after_secs = retry_after.map(|d| d.as_secs_f64()),
                "rate limited"
            );
        }
        ok
    }
}
