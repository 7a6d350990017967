use gateway_core::{GatewayError, Invocation, Layer};
use gateway_policy::{Enforcer, FnTool, Policy, RecordingAuditSink};
use serde_json::{json, Map, Value};

fn policy(v: Value) -> Policy {
    serde_json::from_value(v).expect("valid policy document")
}

fn echoing(name: &str) -> FnTool<impl Fn(&Map<String, Value>) -> Result<Value, Box<dyn std::error::Error + Send + Sync>>> {
    FnTool::named(name.to_string(), |args| Ok(Value::Object(args.clone())))
}

#[test]
fn s1_default_deny_no_rules() {
    let enforcer = Enforcer::new(
        policy(json!({"policy_id": "p1", "version": "1", "default": "deny", "allow_rules": [], "deny_rules": []})),
        RecordingAuditSink::new(),
    );
    let err = enforcer
        .enforce(Invocation::new("hello"), &echoing("hello"))
        .unwrap_err();
    let decision = err.decision().expect("denial carries a decision");
    assert!(!decision.allowed);
    assert_eq!(decision.reason, "No matching rule; default deny");
    assert_eq!(decision.layer, Some(Layer::Authorize));
}

#[test]
fn s2_allow_with_constraint_pass() {
    let enforcer = Enforcer::new(
        policy(json!({
            "policy_id": "p1", "version": "1",
            "allow_rules": [{
                "tool": "echo",
                "constraints": {"msg": {"type": "string", "required": true, "pattern": "^[a-z]+$"}},
            }],
        })),
        RecordingAuditSink::new(),
    );
    let mut args = Map::new();
    args.insert("msg".into(), json!("hi"));
    let result = enforcer
        .enforce(Invocation::new("echo").with_arguments(args), &echoing("echo"))
        .expect("constraint pass should allow");
    assert_eq!(result, json!({"msg": "hi"}));
}

#[test]
fn s3_unknown_argument_rejected() {
    let enforcer = Enforcer::new(
        policy(json!({
            "policy_id": "p1", "version": "1",
            "validate": {"reject_unknown_args": true},
            "allow_rules": [{
                "tool": "echo",
                "constraints": {"msg": {"type": "string", "required": true, "pattern": "^[a-z]+$"}},
            }],
        })),
        RecordingAuditSink::new(),
    );
    let mut args = Map::new();
    args.insert("msg".into(), json!("hi"));
    args.insert("extra".into(), json!(1));
    let err = enforcer
        .enforce(Invocation::new("echo").with_arguments(args), &echoing("echo"))
        .unwrap_err();
    let decision = err.decision().unwrap();
    assert_eq!(decision.reason, "Unknown arguments not allowed: ['extra']");
    assert_eq!(decision.layer, Some(Layer::Validate));
}

#[test]
fn s4_rate_limit_third_call_denied() {
    let enforcer = Enforcer::new(
        policy(json!({
            "policy_id": "p1", "version": "1",
            "allow_rules": [{"tool": "ping", "constraints": {}}],
            "rate_limit": {"enabled": true, "limit_per_minute": 60, "burst": 2, "scope": "actor"},
        })),
        RecordingAuditSink::new(),
    );
    let ping = || FnTool::named("ping", |_args: &Map<String, Value>| Ok(json!("pong")));
    let invocation = || Invocation::new("ping").with_actor("a");

    assert!(enforcer.enforce(invocation(), &ping()).is_ok());
    assert!(enforcer.enforce(invocation(), &ping()).is_ok());
    let err = enforcer.enforce(invocation(), &ping()).unwrap_err();
    assert_eq!(err.decision().unwrap().layer, Some(Layer::RateLimit));
}

#[test]
fn s5_attack_detection_denies() {
    let enforcer = Enforcer::new(
        policy(json!({
            "policy_id": "p1", "version": "1",
            "allow_rules": [{"tool": "search", "constraints": {}}],
            "detect_attacks": {"enabled": true, "on_detect": "deny", "fields": ["query"]},
        })),
        RecordingAuditSink::new(),
    );
    let mut args = Map::new();
    args.insert("query".into(), json!("1; DROP TABLE users"));
    let err = enforcer
        .enforce(Invocation::new("search").with_arguments(args), &echoing("search"))
        .unwrap_err();
    assert_eq!(err.decision().unwrap().layer, Some(Layer::DetectAttacks));
}

#[test]
fn s6_redaction_on_result() {
    let sink = RecordingAuditSink::new();
    let enforcer = Enforcer::new(
        policy(json!({
            "policy_id": "p1", "version": "1",
            "allow_rules": [{"tool": "profile", "constraints": {}}],
            "redact": {"enabled": true, "deny_keys": ["token"], "pii_emails": true},
        })),
        sink,
    );
    let tool = FnTool::named("profile", |_args: &Map<String, Value>| {
        Ok(json!({"token": "abc", "note": "mail me at a@b.co"}))
    });
    let result = enforcer.enforce(Invocation::new("profile"), &tool).unwrap();
    assert_eq!(result, json!({"token": "[REDACTED]", "note": "mail me at [REDACTED_EMAIL]"}));
}

#[test]
fn deny_rule_precedence_ignores_matching_allow_rule() {
    let enforcer = Enforcer::new(
        policy(json!({
            "policy_id": "p1", "version": "1",
            "allow_rules": [{"tool": "drop_table", "constraints": {}}],
            "deny_rules": [{"tool": "drop_table", "reason": "destructive operations are never allowed"}],
        })),
        RecordingAuditSink::new(),
    );
    let err = enforcer
        .enforce(Invocation::new("drop_table"), &echoing("drop_table"))
        .unwrap_err();
    assert_eq!(err.decision().unwrap().reason, "destructive operations are never allowed");
}

#[test]
fn tool_error_propagates_as_gateway_error_tool() {
    let enforcer = Enforcer::new(
        policy(json!({"policy_id": "p1", "version": "1", "default": "allow"})),
        RecordingAuditSink::new(),
    );
    let boom = FnTool::named("boom", |_args: &Map<String, Value>| Err("kaboom".into()));
    match enforcer.enforce(Invocation::new("boom"), &boom) {
        Err(GatewayError::Tool(e)) => assert_eq!(e.to_string(), "kaboom"),
        other => panic!("expected a tool error, got {other:?}"),
    }
}
