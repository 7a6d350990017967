//! Structured audit events: the [`AuditEvent`] shape and the [`AuditSink`]
//! trait that receives one per `execute` call.
//!
//! The concrete log sink (stdout, a file, a collector) is a host concern;
//! this crate only defines the event shape and ships two sinks: one that
//! forwards to [`tracing`] for production use, and one that records events
//! in memory for tests and the audit-completeness property.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::redaction::redact;
use crate::schema::RedactConfig;

/// Outcome tag carried by every [`AuditEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditDecision {
    /// The invocation was permitted and the tool ran.
    Allow,
    /// A layer short-circuited with a deny.
    Deny,
    /// The tool itself raised, or an internal invariant was violated.
    Error,
}

/// Summary of an argument mapping's keys, used in place of full values
/// unless `include_argument_values` is set.
#[derive(Debug, Clone, Serialize)]
pub struct ArgumentsSummary {
    /// Argument keys, sorted lexicographically.
    pub keys: Vec<String>,
    /// Number of keys.
    pub key_count: usize,
}

/// One structured record of an `execute` call's outcome.
///
/// Field names and omission rules mirror `audit/logger.py`'s event shape:
/// every field here is serialized, and `None` fields are dropped by
/// `#[serde(skip_serializing_if)]` rather than emitted as JSON `null`.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// UTC ISO-8601 timestamp of emission.
    pub timestamp: String,
    /// Always `"tool_call"`.
    pub action: &'static str,
    /// Tool the invocation targeted.
    pub tool_name: String,
    /// Outcome tag.
    pub decision: AuditDecision,
    /// Human-readable reason for the outcome.
    pub reason: String,
    /// Policy id the decision was evaluated against.
    pub policy_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Claimed actor, if any.
    pub actor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Request correlation id, if any.
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Enforcement stage that produced the outcome.
    pub layer: Option<String>,
    /// Milliseconds elapsed over the whole pipeline.
    pub latency_ms: u64,
    /// Key-list summary of the invocation's arguments.
    pub arguments_summary: ArgumentsSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Client metadata, always redacted when present.
    pub client: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Full (redacted) argument values; only set when configured.
    pub arguments: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// The (redacted) tool result; only set on allow when configured.
    pub result: Option<Value>,
}

/// Build the key-list summary for `arguments`.
#[must_use]
pub fn summarize_arguments(arguments: &Map<String, Value>) -> ArgumentsSummary {
    let mut keys: Vec<String> = arguments.keys().cloned().collect();
    keys.sort_unstable();
    ArgumentsSummary {
        key_count: keys.len(),
        keys,
    }
}

/// Redact `value` with the audit logger's own deny-key list, independent of
/// whether the redact layer itself is enabled — client metadata and, when
/// configured, argument/result values are always passed through this before
/// they reach an audit event.
#[must_use]
pub fn redact_for_audit(value: &Value, deny_keys: &[String]) -> Value {
    let cfg = RedactConfig {
        enabled: true,
        deny_keys: deny_keys.to_vec(),
        pii_emails: true,
        pii_phones: false,
        max_string_len: 2048,
    };
    redact(value, &cfg)
}

/// Receives one [`AuditEvent`] per `execute` call.
pub trait AuditSink: Send + Sync {
    /// Record `event`.
    fn emit(&self, event: AuditEvent);
}

/// Forwards every event to [`tracing`] as a structured `info` record.
///
/// The event is serialized to a JSON string and logged as a single field
/// rather than destructured into individual `tracing` fields, so sinks that
/// ingest raw JSON lines (the same shape the original logger wrote to
/// stdout) don't need to know about `tracing`'s own formatting.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => tracing::info!(target: "gateway_policy::audit", %json, "tool_call"),
            Err(err) => tracing::warn!(target: "gateway_policy::audit", %err, "failed to serialize audit event"),
        }
    }
}

/// Records every event in memory. Used by tests asserting audit
/// completeness and by hosts that want to inspect events without a real
/// logging backend wired up.
#[derive(Debug, Clone, Default)]
pub struct RecordingAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl RecordingAuditSink {
    /// A fresh, empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return every event recorded so far.
    #[must_use]
    pub fn drain(&self) -> Vec<AuditEvent> {
        let mut guard = self.events.lock().expect("audit sink lock poisoned");
        std::mem::take(&mut *guard)
    }
}

impl AuditSink for RecordingAuditSink {
    fn emit(&self, event: AuditEvent) {
        self.events.lock().expect("audit sink lock poisoned").push(event);
    }
}
