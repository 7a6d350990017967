//! [`Enforcer`]: the facade that binds a policy engine, rate limiter, and
//! audit sink, and exposes the one-shot and wrapping invocation styles a
//! host actually calls.

use gateway_core::{GatewayError, Invocation};
use serde_json::Value;

use crate::audit::AuditSink;
use crate::engine::PolicyEngine;
use crate::pipeline::Pipeline;
use crate::rate_limit::RateLimiter;
use crate::schema::Policy;
use crate::tool::Tool;

/// Binds a policy, a rate limiter, and an audit sink, and runs invocations
/// through the fixed six-layer pipeline.
///
/// Holds a single [`PolicyEngine`] built from an immutable policy snapshot
/// and its own [`RateLimiter`], so every call to [`Enforcer::enforce`]
/// shares bucket state across invocations the way the limiter's contract
/// requires. Safe to share across threads: nothing here is mutated except
/// through the limiter's own interior mutability.
pub struct Enforcer<S: AuditSink> {
    engine: PolicyEngine,
    limiter: RateLimiter,
    audit_sink: S,
}

impl<S: AuditSink> Enforcer<S> {
    /// Bind an enforcer to `policy`, auditing through `audit_sink`.
    #[must_use]
    pub fn new(policy: Policy, audit_sink: S) -> Self {
        Self {
            engine: PolicyEngine::new(policy),
            limiter: RateLimiter::new(),
            audit_sink,
        }
    }

    /// The policy engine this enforcer evaluates against.
    #[must_use]
    pub fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    /// Run `invocation` against `tool` through the full pipeline.
    ///
    /// # Errors
    /// See [`crate::pipeline::Pipeline::execute`].
    pub fn enforce(&self, invocation: Invocation, tool: &dyn Tool) -> Result<Value, GatewayError> {
        Pipeline::new(&self.engine, &self.limiter, &self.audit_sink).execute(invocation, tool)
    }

    /// Invoke `tool` directly, deriving an [`Invocation`] from its own name
    /// and the supplied arguments.
    ///
    /// Mirrors the decorator-style entry point the source this crate is
    /// modeled on exposes: a caller that already has a named [`Tool`] need
    /// not build an [`Invocation`] by hand for the common case of no actor,
    /// roles, or metadata.
    ///
    /// # Errors
    /// See [`Enforcer::enforce`].
    pub fn invoke(&self, tool: &dyn Tool, arguments: serde_json::Map<String, Value>) -> Result<Value, GatewayError> {
        self.enforce(Invocation::new(tool.name()).with_arguments(arguments), tool)
    }
}
