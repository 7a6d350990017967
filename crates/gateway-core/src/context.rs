//! [`CallContext`]: the mutable, per-invocation state threaded through the
//! enforcement pipeline.

use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;

use crate::decision::{Decision, Layer};
use crate::invocation::Invocation;

/// Mutable state that lives for exactly one `execute`/`enforce` call.
///
/// Never shared across invocations — each call to the pipeline gets a fresh
/// `CallContext`. `start` is a monotonic [`Instant`] rather than a raw
/// nanosecond count; latency is always derived via `start.elapsed()`.
pub struct CallContext {
    /// The invocation being enforced.
    pub invocation: Invocation,
    /// Id of the policy this context is evaluated against.
    pub policy_id: String,
    /// Monotonic start time, for latency accounting.
    pub start: Instant,
    /// The most recent decision produced by any layer, if any.
    pub decision: Option<Decision>,
    /// The tool's return value, set once invocation completes.
    pub tool_result: Option<Value>,
    /// Tag of the last layer to touch this context.
    pub last_layer: Option<Layer>,
    /// Free-form scratch metadata (e.g. rate-limit telemetry).
    pub meta: HashMap<String, Value>,
}

impl CallContext {
    /// Start a fresh context for `invocation` against `policy_id`.
    #[must_use]
    pub fn new(invocation: Invocation, policy_id: impl Into<String>) -> Self {
        Self {
            invocation,
            policy_id: policy_id.into(),
            start: Instant::now(),
            decision: None,
            tool_result: None,
            last_layer: None,
            meta: HashMap::new(),
        }
    }

    /// Milliseconds elapsed since this context was created.
    #[must_use]
    pub fn latency_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Record a decision, also updating `last_layer` from it.
    pub fn record_decision(&mut self, decision: Decision) {
        self.last_layer = decision.layer;
        self.decision = Some(decision);
    }
}
