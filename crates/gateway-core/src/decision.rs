//! The [`Decision`]: the structured outcome of evaluating policy (or any
//! other enforcement layer) against an [`crate::Invocation`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which pipeline stage produced a [`Decision`].
///
/// Spec invariant: a denying decision always carries a layer tag. Allowing
/// decisions from the policy engine also carry one (always `Authorize`),
/// but the field stays optional on [`Decision`] because not every producer
/// of a `Decision` is required to set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    /// Argument-shape / size / constraint checking.
    Validate,
    /// Token-bucket rate limiting.
    RateLimit,
    /// Policy rule matching (allow/deny rules, default disposition).
    Authorize,
    /// Heuristic pattern scan for injection/SSRF/traversal attempts.
    DetectAttacks,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Layer::Validate => "validate",
            Layer::RateLimit => "rate_limit",
            Layer::Authorize => "authorize",
            Layer::DetectAttacks => "detect_attacks",
        };
        f.write_str(s)
    }
}

/// The structured outcome of evaluating an [`crate::Invocation`]: allow or
/// deny, with a human-readable reason and enough metadata to audit or remediate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Whether the invocation may proceed.
    pub allowed: bool,
    /// Human-readable reason for the decision.
    pub reason: String,
    /// Id of the policy that produced this decision.
    pub policy_id: String,
    /// Optional suggestion for how the caller could satisfy policy.
    pub remediation: Option<String>,
    /// Which enforcement stage produced this decision.
    pub layer: Option<Layer>,
}

impl Decision {
    /// Build an allow decision.
    #[must_use]
    pub fn allow(policy_id: impl Into<String>, reason: impl Into<String>, layer: Layer) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
            policy_id: policy_id.into(),
            remediation: None,
            layer: Some(layer),
        }
    }

    /// Build a deny decision.
    #[must_use]
    pub fn deny(policy_id: impl Into<String>, reason: impl Into<String>, layer: Layer) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            policy_id: policy_id.into(),
            remediation: None,
            layer: Some(layer),
        }
    }

    /// Attach a remediation suggestion.
    #[must_use]
    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }
}
