//! Token-bucket rate limiting: a keyed, concurrent-safe bucket store with
//! lazy refill.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// One actor/scope's token bucket.
#[derive(Debug, Clone)]
struct Bucket {
    capacity: f64,
    refill_per_sec: f64,
    tokens: f64,
    last_seen: Instant,
}

impl Bucket {
    fn new(capacity: f64, refill_per_sec: f64) -> Self {
        Self {
            capacity,
            refill_per_sec,
            tokens: capacity,
            last_seen: Instant::now(),
        }
    }

    /// Refill, then attempt to take one token. Returns whether the take
    /// succeeded and the remaining whole-token balance after the attempt.
    fn take(&mut self) -> (bool, u64) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_seen);
        self.last_seen = now;

        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.refill_per_sec).min(self.capacity);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            (true, self.tokens.floor() as u64)
        } else {
            (false, self.tokens.floor().max(0.0) as u64)
        }
    }
}

/// Telemetry attached to `ctx.meta["rate_limit"]` on every limiter call,
/// successful or not.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitTelemetry {
    /// The configured `limit_per_minute`.
    pub limit: u64,
    /// Effective bucket capacity (burst, or `limit` if burst was zero).
    pub burst: u64,
    /// Tokens left in the bucket after this call, floored to a whole number.
    pub remaining: u64,
}

/// In-process, concurrent-safe token-bucket store.
///
/// Sharded by [`DashMap`] rather than one global mutex, since distinct
/// actors rarely contend with each other; within one key, updates are
/// serialized by a per-entry [`Mutex`].
#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: DashMap<String, Mutex<Bucket>>,
}

impl RateLimiter {
    /// A fresh, empty limiter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    /// Attempt to take one token from `key`'s bucket, creating it full on
    /// first sight.
    #[must_use]
    pub fn allow(&self, key: &str, limit_per_minute: u64, burst: u64) -> (bool, RateLimitTelemetry) {
        let capacity = (if burst > 0 { burst } else { limit_per_minute }).max(1) as f64;
        let refill_per_sec = (limit_per_minute as f64 / 60.0).max(0.1);

        let entry = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| Mutex::new(Bucket::new(capacity, refill_per_sec)));

        let (allowed, remaining) = entry
            .lock()
            .expect("bucket mutex poisoned")
            .take();

        let telemetry = RateLimitTelemetry {
            limit: limit_per_minute,
            burst: if burst > 0 { burst } else { capacity as u64 },
            remaining,
        };

        (allowed, telemetry)
    }
}

/// Derive the bucket key for `scope` given the invocation's actor, session
/// id, and tool name.
#[must_use]
pub fn bucket_key(
    scope: crate::schema::RateLimitScope,
    actor: Option<&str>,
    session_id: Option<&str>,
    tool_name: &str,
) -> String {
    use crate::schema::RateLimitScope::{Actor, ActorTool, Session, Tool};
    match scope {
        Actor => format!("actor:{}", actor.unwrap_or("unknown")),
        Session => format!("session:{}", session_id.unwrap_or("unknown")),
        Tool => format!("tool:{tool_name}"),
        ActorTool => format!("actor:{}:tool:{tool_name}", actor.unwrap_or("unknown")),
    }
}
