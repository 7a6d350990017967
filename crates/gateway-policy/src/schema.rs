//! The declarative policy document: [`Policy`], its rule lists, and the
//! per-layer configuration blocks.
//!
//! Parsing a policy document from YAML/JSON is a host concern; this module
//! only defines the normalized, already-validated shape every engine and
//! layer function agrees on. `#[serde(default = ...)]` on every config block
//! mirrors the defaults a host-side loader would apply, so a `Policy` built
//! directly from `serde_json::from_value` without a loader in front of it
//! still behaves per spec.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Disposition applied when no rule matches an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// Permit the call.
    Allow,
    /// Refuse the call.
    Deny,
}

impl Default for Disposition {
    fn default() -> Self {
        Disposition::Deny
    }
}

/// A typed constraint on one named argument.
///
/// `type_` carries the constraint's type tag verbatim, not a closed Rust
/// enum: a policy document with an unrecognized type string must still
/// construct, so the "unsupported constraint type" error can be raised at
/// evaluation time as a validate-layer denial rather than at parse time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    /// One of `"string"`, `"integer"`, `"number"`, `"boolean"` — or anything
    /// else, which evaluates to an "unsupported constraint type" denial.
    #[serde(rename = "type")]
    pub type_: String,
    /// Human-readable note; carried through but never evaluated.
    #[serde(default)]
    pub description: Option<String>,
    /// Anchored-at-start (prefix) regex the value must match. `string` only.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Allowed literal values. `string` only.
    #[serde(default, rename = "enum")]
    pub enum_values: Option<Vec<Value>>,
    /// Inclusive lower bound. `integer`/`number` only.
    #[serde(default)]
    pub min: Option<f64>,
    /// Inclusive upper bound. `integer`/`number` only.
    #[serde(default)]
    pub max: Option<f64>,
    /// Whether the argument must be present at all.
    #[serde(default)]
    pub required: bool,
}

/// An allow rule: a tool name, its named constraints, and an optional role
/// gate.
///
/// `constraints` preserves the policy source's declaration order — an
/// [`IndexMap`] rather than a [`std::collections::HashMap`] — because
/// constraint evaluation must report the *first* failure in that order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowRule {
    /// Tool this rule governs.
    pub tool: String,
    /// Named constraints, in declaration order.
    #[serde(default)]
    pub constraints: IndexMap<String, Constraint>,
    /// If set, the invocation's roles must intersect this set.
    #[serde(default)]
    pub roles: Option<Vec<String>>,
}

/// A deny rule: a tool name, an optional exact-match condition, and a
/// reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenyRule {
    /// Tool this rule governs.
    pub tool: String,
    /// Exact-equality condition over argument values. Absent means the rule
    /// always fires for this tool.
    #[serde(default)]
    pub condition: Option<IndexMap<String, Value>>,
    /// Reason surfaced in the resulting [`gateway_core::Decision`].
    #[serde(default = "default_deny_reason")]
    pub reason: String,
}

fn default_deny_reason() -> String {
    "Denied by policy".to_string()
}

/// Size-gate and unknown-argument configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidateConfig {
    /// Deny invocations whose argument keys are not a subset of the
    /// matched rule's constraint keys.
    pub reject_unknown_args: bool,
    /// Maximum encoded argument size in bytes. Zero means unlimited.
    pub max_arg_bytes: u64,
}

impl Default for ValidateConfig {
    fn default() -> Self {
        Self {
            reject_unknown_args: false,
            max_arg_bytes: 0,
        }
    }
}

/// Scope a rate-limit bucket key is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitScope {
    /// `actor:<id>`, `unknown` if the invocation has no actor.
    Actor,
    /// `session:<id>`, `unknown` if the client metadata has no session id.
    Session,
    /// `tool:<name>`.
    Tool,
    /// `actor:<id>:tool:<name>`.
    #[serde(rename = "actor+tool")]
    ActorTool,
}

/// Token-bucket rate-limit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether this layer is active at all.
    pub enabled: bool,
    /// Nominal limit; also doubles as bucket capacity when `burst == 0`.
    pub limit_per_minute: u64,
    /// Bucket capacity override. Zero defers to `limit_per_minute`.
    pub burst: u64,
    /// Bucket key derivation strategy.
    pub scope: RateLimitScope,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            limit_per_minute: 0,
            burst: 0,
            scope: RateLimitScope::Actor,
        }
    }
}

/// Disposition applied when the attack-detection layer finds a suspicious
/// pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnDetect {
    /// Short-circuit with a deny.
    Deny,
    /// Log nothing extra and let the call proceed.
    Allow,
}

/// Heuristic attack-pattern scan configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectAttacksConfig {
    /// Whether this layer is active at all.
    pub enabled: bool,
    /// What to do when a pattern is found.
    pub on_detect: OnDetect,
    /// Argument keys whose string values are scanned.
    pub fields: Vec<String>,
}

impl Default for DetectAttacksConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            on_detect: OnDetect::Deny,
            fields: default_detect_fields(),
        }
    }
}

fn default_detect_fields() -> Vec<String> {
    ["query", "sql", "where", "url", "path"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Redaction engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactConfig {
    /// Whether this layer is active at all.
    pub enabled: bool,
    /// Keys redacted wholesale (case-insensitive, exact match).
    pub deny_keys: Vec<String>,
    /// Substitute email-shaped substrings with `[REDACTED_EMAIL]`.
    pub pii_emails: bool,
    /// Substitute phone-shaped substrings with `[REDACTED_PHONE]`.
    pub pii_phones: bool,
    /// Truncate strings longer than this. Zero means unlimited.
    pub max_string_len: u64,
}

impl Default for RedactConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            deny_keys: default_deny_keys(),
            pii_emails: true,
            pii_phones: false,
            max_string_len: 2048,
        }
    }
}

/// Keys redacted wholesale by default, shared with the audit logger's
/// always-on client-metadata redaction.
#[must_use]
pub fn default_deny_keys() -> Vec<String> {
    ["password", "token", "secret", "api_key", "authorization"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Audit event emission configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Whether an event is emitted at all.
    pub enabled: bool,
    /// Include the (redacted) tool result on allow outcomes.
    pub include_result: bool,
    /// Include full (redacted) argument values, not just the key summary.
    pub include_argument_values: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            include_result: false,
            include_argument_values: false,
        }
    }
}

/// A complete, immutable policy snapshot.
///
/// Per-layer config blocks are optional: an absent block means that layer
/// runs with its all-disabled default (audit is the one exception, whose
/// default has `enabled: true`), not that the layer is skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Identifies this policy in decisions and audit events.
    pub policy_id: String,
    /// Free-form version tag, carried through but not interpreted.
    pub version: String,
    /// Disposition when no allow/deny rule matches.
    #[serde(default)]
    pub default: Disposition,
    /// Allow rules, in declaration order.
    #[serde(default)]
    pub allow_rules: Vec<AllowRule>,
    /// Deny rules, in declaration order.
    #[serde(default)]
    pub deny_rules: Vec<DenyRule>,
    /// Validate-layer / size-gate configuration.
    #[serde(default)]
    pub validate: Option<ValidateConfig>,
    /// Rate-limit-layer configuration.
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
    /// Detect-attacks-layer configuration.
    #[serde(default)]
    pub detect_attacks: Option<DetectAttacksConfig>,
    /// Redact-layer configuration.
    #[serde(default)]
    pub redact: Option<RedactConfig>,
    /// Audit-layer configuration.
    #[serde(default)]
    pub audit: Option<AuditConfig>,
}

impl Policy {
    /// The effective validate config, defaulted if the policy omits it.
    #[must_use]
    pub fn validate_config(&self) -> ValidateConfig {
        self.validate.clone().unwrap_or_default()
    }

    /// The effective rate-limit config, defaulted if the policy omits it.
    #[must_use]
    pub fn rate_limit_config(&self) -> RateLimitConfig {
        self.rate_limit.clone().unwrap_or_default()
    }

    /// The effective detect-attacks config, defaulted if the policy omits it.
    #[must_use]
    pub fn detect_attacks_config(&self) -> DetectAttacksConfig {
        self.detect_attacks.clone().unwrap_or_default()
    }

    /// The effective redact config, defaulted if the policy omits it.
    #[must_use]
    pub fn redact_config(&self) -> RedactConfig {
        self.redact.clone().unwrap_or_default()
    }

    /// The effective audit config, defaulted (enabled) if the policy omits it.
    #[must_use]
    pub fn audit_config(&self) -> AuditConfig {
        self.audit.clone().unwrap_or_default()
    }
}
