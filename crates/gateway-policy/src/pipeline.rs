//! The pipeline executor: composes the six enforcement layers around a
//! [`Tool`] invocation, threading a single [`CallContext`] through all of
//! them.
//!
//! Built by structural (indexed) recursion rather than an eagerly-folded
//! chain of closures — one method per layer, each calling the next by
//! name — since every layer needs a different slice of the engine/limiter/
//! audit-sink state rather than a uniform `(ctx, next)` signature. Either
//! construction is an equivalent reading of the fixed order below; see
//! this crate's design notes for why this shape was chosen over a `dyn
//! Fn(&mut CallContext, Next) -> ...` chain.
//!
//! Fixed order, outermost first: audit → redact → validate → rate_limit →
//! authorize → detect_attacks → [tool invocation]. Audit sits outermost so
//! it observes every outcome, including denials raised deep inside the
//! chain; redact sits just inside it so it can rewrite whatever the inner
//! layers (or the tool itself) produced before audit logs it. The inner
//! four pre-invocation checks run validate (size) first, then rate_limit
//! (token take), then authorize (rule evaluation), then detect_attacks
//! (pattern scan), matching the pre-invocation ordering sentence of this
//! gateway's governing spec.

use gateway_core::{CallContext, Decision, GatewayError, Invocation, Layer};
use serde_json::Value;

use crate::attacks;
use crate::audit::{self, AuditDecision, AuditEvent, AuditSink};
use crate::engine::PolicyEngine;
use crate::rate_limit::{bucket_key, RateLimiter};
use crate::redaction::redact;
use crate::schema::OnDetect;
use crate::tool::Tool;

/// Binds the shared, read-only collaborators every layer needs: the policy
/// engine, the rate limiter, and the audit sink.
pub struct Pipeline<'a> {
    engine: &'a PolicyEngine,
    limiter: &'a RateLimiter,
    audit_sink: &'a dyn AuditSink,
}

impl<'a> Pipeline<'a> {
    /// Bind a pipeline to its collaborators.
    #[must_use]
    pub fn new(engine: &'a PolicyEngine, limiter: &'a RateLimiter, audit_sink: &'a dyn AuditSink) -> Self {
        Self {
            engine,
            limiter,
            audit_sink,
        }
    }

    /// Run `invocation` against `tool`, threading a fresh [`CallContext`]
    /// through all six layers.
    ///
    /// # Errors
    /// Returns [`GatewayError::Denied`] if any layer short-circuits,
    /// [`GatewayError::Tool`] if `tool` itself fails.
    pub fn execute(&self, invocation: Invocation, tool: &dyn Tool) -> Result<Value, GatewayError> {
        let mut ctx = CallContext::new(invocation, self.engine.policy().policy_id.clone());
        self.run_audit(&mut ctx, tool)
    }

    fn run_audit(&self, ctx: &mut CallContext, tool: &dyn Tool) -> Result<Value, GatewayError> {
        let cfg = self.engine.policy().audit_config();
        let result = self.run_redact(ctx, tool);

        if cfg.enabled {
            let deny_keys = self.engine.policy().redact_config().deny_keys;
            let (decision_tag, reason, layer, result_value) = match &result {
                Ok(value) => (
                    AuditDecision::Allow,
                    ctx.decision.as_ref().map_or_else(|| "Allowed".to_string(), |d| d.reason.clone()),
                    ctx.last_layer,
                    if cfg.include_result { Some(value.clone()) } else { None },
                ),
                Err(GatewayError::Denied(d)) => (AuditDecision::Deny, d.reason.clone(), d.layer, None),
                Err(GatewayError::Tool(e)) => (AuditDecision::Error, e.to_string(), ctx.last_layer, None),
                Err(GatewayError::Internal(msg)) => (AuditDecision::Error, msg.clone(), ctx.last_layer, None),
            };

            let client = ctx
                .invocation
                .client()
                .map(|c| audit::redact_for_audit(&Value::Object(c.clone()), &deny_keys));
            let arguments = cfg.include_argument_values.then(|| {
                audit::redact_for_audit(&Value::Object(ctx.invocation.arguments().clone()), &deny_keys)
            });
            let result_field = result_value.map(|v| audit::redact_for_audit(&v, &deny_keys));

            self.audit_sink.emit(AuditEvent {
                timestamp: ctx.invocation.iso_timestamp(),
                action: "tool_call",
                tool_name: ctx.invocation.tool_name().to_string(),
                decision: decision_tag,
                reason,
                policy_id: ctx.policy_id.clone(),
                actor: ctx.invocation.actor().map(String::from),
                request_id: ctx.invocation.request_id().map(String::from),
                layer: layer.map(|l| l.to_string()),
                latency_ms: ctx.latency_ms(),
                arguments_summary: audit::summarize_arguments(ctx.invocation.arguments()),
                client,
                arguments,
                result: result_field,
            });
        }

        result
    }

    fn run_redact(&self, ctx: &mut CallContext, tool: &dyn Tool) -> Result<Value, GatewayError> {
        let cfg = self.engine.policy().redact_config();
        let result = self.run_validate(ctx, tool)?;

        if cfg.enabled {
            let rewritten = redact(&result, &cfg);
            ctx.tool_result = Some(rewritten.clone());
            Ok(rewritten)
        } else {
            Ok(result)
        }
    }

    fn run_validate(&self, ctx: &mut CallContext, tool: &dyn Tool) -> Result<Value, GatewayError> {
        let cfg = self.engine.policy().validate_config();

        if cfg.max_arg_bytes > 0 && ctx.invocation.arguments_size_bytes() > cfg.max_arg_bytes {
            let decision = Decision::deny(
                ctx.policy_id.clone(),
                format!("Arguments too large (>{} bytes)", cfg.max_arg_bytes),
                Layer::Validate,
            )
            .with_remediation("Reduce arguments payload size.");
            ctx.record_decision(decision.clone());
            return Err(GatewayError::Denied(decision));
        }

        self.run_rate_limit(ctx, tool)
    }

    fn run_rate_limit(&self, ctx: &mut CallContext, tool: &dyn Tool) -> Result<Value, GatewayError> {
        let cfg = self.engine.policy().rate_limit_config();

        if cfg.enabled && cfg.limit_per_minute > 0 {
            let session_id = ctx
                .invocation
                .client()
                .and_then(|c| c.get("session_id"))
                .and_then(Value::as_str);
            let key = bucket_key(cfg.scope, ctx.invocation.actor(), session_id, ctx.invocation.tool_name());

            let (allowed, telemetry) = self.limiter.allow(&key, cfg.limit_per_minute, cfg.burst);
            ctx.meta
                .insert("rate_limit".to_string(), serde_json::to_value(telemetry).expect("telemetry serializes"));

            if !allowed {
                let decision = Decision::deny(ctx.policy_id.clone(), "Rate limit exceeded", Layer::RateLimit)
                    .with_remediation("Wait and retry later.");
                ctx.record_decision(decision.clone());
                return Err(GatewayError::Denied(decision));
            }
        }

        self.run_authorize(ctx, tool)
    }

    fn run_authorize(&self, ctx: &mut CallContext, tool: &dyn Tool) -> Result<Value, GatewayError> {
        let decision = self.engine.evaluate(&ctx.invocation);
        ctx.record_decision(decision.clone());

        if !decision.allowed {
            return Err(GatewayError::Denied(decision));
        }

        self.run_detect_attacks(ctx, tool)
    }

    fn run_detect_attacks(&self, ctx: &mut CallContext, tool: &dyn Tool) -> Result<Value, GatewayError> {
        let cfg = self.engine.policy().detect_attacks_config();

        if cfg.enabled && attacks::scan(ctx.invocation.arguments(), &cfg.fields) && cfg.on_detect == OnDetect::Deny {
            let decision = Decision::deny(
                ctx.policy_id.clone(),
                "Potential injection/abuse pattern detected in arguments",
                Layer::DetectAttacks,
            )
            .with_remediation("Remove suspicious patterns from arguments.");
            ctx.record_decision(decision.clone());
            return Err(GatewayError::Denied(decision));
        }

        self.invoke(ctx, tool)
    }

    fn invoke(&self, ctx: &mut CallContext, tool: &dyn Tool) -> Result<Value, GatewayError> {
        let result = tool.call(ctx.invocation.arguments()).map_err(GatewayError::Tool)?;
        ctx.tool_result = Some(result.clone());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::RecordingAuditSink;
    use crate::schema::Policy;
    use crate::tool::FnTool;
    use gateway_core::Invocation;
    use serde_json::{json, Map};

    fn policy(v: Value) -> Policy {
        serde_json::from_value(v).unwrap()
    }

    fn echo() -> FnTool<impl Fn(&Map<String, Value>) -> Result<Value, Box<dyn std::error::Error + Send + Sync>>> {
        FnTool::named("echo", |args| Ok(Value::Object(args.clone())))
    }

    #[test]
    fn s2_allow_invokes_tool() {
        let p = policy(json!({
            "policy_id": "p1", "version": "1",
            "allow_rules": [{"tool": "echo", "constraints": {"msg": {"type": "string", "required": true}}}],
        }));
        let engine = PolicyEngine::new(p);
        let limiter = RateLimiter::new();
        let sink = RecordingAuditSink::new();
        let pipeline = Pipeline::new(&engine, &limiter, &sink);

        let mut args = Map::new();
        args.insert("msg".into(), json!("hi"));
        let result = pipeline.execute(Invocation::new("echo").with_arguments(args), &echo());
        assert_eq!(result.unwrap(), json!({"msg": "hi"}));
    }

    #[test]
    fn at_most_once_invocation_on_deny() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let p = policy(json!({"policy_id": "p1", "version": "1", "default": "deny"}));
        let engine = PolicyEngine::new(p);
        let limiter = RateLimiter::new();
        let sink = RecordingAuditSink::new();
        let pipeline = Pipeline::new(&engine, &limiter, &sink);

        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let tool = FnTool::named("hello", move |_args| {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(json!("called"))
        });

        let result = pipeline.execute(Invocation::new("hello"), &tool);
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn audit_completeness_emits_exactly_one_event_on_denial() {
        let p = policy(json!({"policy_id": "p1", "version": "1", "default": "deny"}));
        let engine = PolicyEngine::new(p);
        let limiter = RateLimiter::new();
        let sink = RecordingAuditSink::new();
        let pipeline = Pipeline::new(&engine, &limiter, &sink);

        let _ = pipeline.execute(Invocation::new("hello"), &echo());
        let events = sink.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].decision, AuditDecision::Deny);
    }

    #[test]
    fn audit_completeness_emits_on_allow() {
        let p = policy(json!({"policy_id": "p1", "version": "1", "default": "allow"}));
        let engine = PolicyEngine::new(p);
        let limiter = RateLimiter::new();
        let sink = RecordingAuditSink::new();
        let pipeline = Pipeline::new(&engine, &limiter, &sink);

        let _ = pipeline.execute(Invocation::new("echo"), &echo());
        let events = sink.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].decision, AuditDecision::Allow);
    }

    #[test]
    fn audit_completeness_emits_error_on_tool_failure() {
        let p = policy(json!({"policy_id": "p1", "version": "1", "default": "allow"}));
        let engine = PolicyEngine::new(p);
        let limiter = RateLimiter::new();
        let sink = RecordingAuditSink::new();
        let pipeline = Pipeline::new(&engine, &limiter, &sink);

        let tool = FnTool::named("boom", |_args| Err("kaboom".into()));
        let result = pipeline.execute(Invocation::new("boom"), &tool);
        assert!(result.is_err());
        let events = sink.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].decision, AuditDecision::Error);
    }

    #[test]
    fn s5_attack_detection_denies_before_invocation() {
        let p = policy(json!({
            "policy_id": "p1", "version": "1",
            "allow_rules": [{"tool": "search", "constraints": {}}],
            "detect_attacks": {"enabled": true, "on_detect": "deny", "fields": ["query"]},
        }));
        let engine = PolicyEngine::new(p);
        let limiter = RateLimiter::new();
        let sink = RecordingAuditSink::new();
        let pipeline = Pipeline::new(&engine, &limiter, &sink);

        let mut args = Map::new();
        args.insert("query".into(), json!("1; DROP TABLE users"));
        let result = pipeline.execute(Invocation::new("search").with_arguments(args), &echo());
        match result {
            Err(GatewayError::Denied(d)) => assert_eq!(d.layer, Some(Layer::DetectAttacks)),
            other => panic!("expected detect_attacks denial, got {other:?}"),
        }
    }

    #[test]
    fn s4_rate_limit_denies_third_call() {
        let p = policy(json!({
            "policy_id": "p1", "version": "1",
            "allow_rules": [{"tool": "ping", "constraints": {}}],
            "rate_limit": {"enabled": true, "limit_per_minute": 60, "burst": 2, "scope": "actor"},
        }));
        let engine = PolicyEngine::new(p);
        let limiter = RateLimiter::new();
        let sink = RecordingAuditSink::new();
        let pipeline = Pipeline::new(&engine, &limiter, &sink);
        let ping = || FnTool::named("ping", |_args| Ok(json!("pong")));

        let inv = || Invocation::new("ping").with_actor("a");
        assert!(pipeline.execute(inv(), &ping()).is_ok());
        assert!(pipeline.execute(inv(), &ping()).is_ok());
        match pipeline.execute(inv(), &ping()) {
            Err(GatewayError::Denied(d)) => assert_eq!(d.layer, Some(Layer::RateLimit)),
            other => panic!("expected rate_limit denial, got {other:?}"),
        }
    }

    #[test]
    fn s6_redaction_applies_to_tool_result_and_audit() {
        let p = policy(json!({
            "policy_id": "p1", "version": "1",
            "allow_rules": [{"tool": "profile", "constraints": {}}],
            "redact": {"enabled": true, "deny_keys": ["token"], "pii_emails": true},
            "audit": {"include_result": true},
        }));
        let engine = PolicyEngine::new(p);
        let limiter = RateLimiter::new();
        let sink = RecordingAuditSink::new();
        let pipeline = Pipeline::new(&engine, &limiter, &sink);

        let tool = FnTool::named("profile", |_args| {
            Ok(json!({"token": "abc", "note": "mail me at a@b.co"}))
        });
        let out = pipeline.execute(Invocation::new("profile"), &tool).unwrap();
        assert_eq!(out, json!({"token": "[REDACTED]", "note": "mail me at [REDACTED_EMAIL]"}));

        let events = sink.drain();
        assert_eq!(events[0].result.as_ref().unwrap()["token"], json!("[REDACTED]"));
    }
}
