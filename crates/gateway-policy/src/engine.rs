//! [`PolicyEngine`]: evaluates an [`Invocation`] against a [`Policy`],
//! producing a [`Decision`].

use gateway_core::{Decision, Invocation, Layer};
use regex::Regex;
use serde_json::{Map, Value};

use crate::schema::{AllowRule, Constraint, Policy};

/// Stateless evaluator bound to one immutable [`Policy`] snapshot.
///
/// Holds no mutable state of its own — safe to share across threads behind
/// an `Arc` without synchronization, since every invocation only reads the
/// policy it was built from.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    policy: Policy,
}

impl PolicyEngine {
    /// Bind an evaluator to `policy`.
    #[must_use]
    pub fn new(policy: Policy) -> Self {
        Self { policy }
    }

    /// The policy this engine evaluates against.
    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Evaluate `invocation`, returning the resulting [`Decision`].
    #[must_use]
    pub fn evaluate(&self, invocation: &Invocation) -> Decision {
        let policy_id = self.policy.policy_id.as_str();
        let vcfg = self.policy.validate_config();

        if vcfg.max_arg_bytes > 0 && invocation.arguments_size_bytes() > vcfg.max_arg_bytes {
            return Decision::deny(
                policy_id,
                format!("Arguments too large (>{} bytes)", vcfg.max_arg_bytes),
                Layer::Validate,
            )
            .with_remediation("Reduce arguments payload size.");
        }

        if let Some(reason) = self.match_deny(invocation) {
            return Decision::deny(policy_id, reason, Layer::Authorize);
        }

        if let Some(rule) = self.match_allow(invocation) {
            if let Some(roles) = &rule.roles {
                let permitted = roles.iter().any(|r| invocation.roles().contains(r));
                if !permitted {
                    return Decision::deny(
                        policy_id,
                        "Actor role not permitted for this tool",
                        Layer::Validate,
                    );
                }
            }

            if let Err(reason) = validate_constraints(&rule.constraints, invocation.arguments()) {
                return Decision::deny(policy_id, reason, Layer::Validate)
                    .with_remediation("Fix tool arguments to satisfy policy constraints.");
            }

            if vcfg.reject_unknown_args {
                let mut extras: Vec<&str> = invocation
                    .arguments()
                    .keys()
                    .filter(|k| !rule.constraints.contains_key(k.as_str()))
                    .map(String::as_str)
                    .collect();
                if !extras.is_empty() {
                    extras.sort_unstable();
                    let quoted: Vec<String> = extras.iter().map(|e| format!("'{e}'")).collect();
                    return Decision::deny(
                        policy_id,
                        format!("Unknown arguments not allowed: [{}]", quoted.join(", ")),
                        Layer::Validate,
                    )
                    .with_remediation("Remove unknown arguments.");
                }
            }

            return Decision::allow(policy_id, "Matched allow rule", Layer::Authorize);
        }

        if self.policy.default == crate::schema::Disposition::Allow {
            return Decision::allow(policy_id, "No matching rule; default allow", Layer::Authorize);
        }

        Decision::deny(policy_id, "No matching rule; default deny", Layer::Authorize)
            .with_remediation("Request access via policy update.")
    }

    fn match_deny(&self, invocation: &Invocation) -> Option<String> {
        for rule in &self.policy.deny_rules {
            if rule.tool != invocation.tool_name() {
                continue;
            }
            let matches = match &rule.condition {
                None => true,
                Some(condition) => condition
                    .iter()
                    .all(|(k, v)| invocation.arguments().get(k) == Some(v)),
            };
            if matches {
                return Some(rule.reason.clone());
            }
        }
        None
    }

    fn match_allow(&self, invocation: &Invocation) -> Option<&AllowRule> {
        self.policy
            .allow_rules
            .iter()
            .find(|rule| rule.tool == invocation.tool_name())
    }
}

/// Two-pass constraint validation: required-presence, then typed predicate,
/// both walked in the constraint mapping's declaration order. Returns the
/// first failure reason, if any.
fn validate_constraints(
    constraints: &indexmap::IndexMap<String, Constraint>,
    args: &Map<String, Value>,
) -> Result<(), String> {
    for (name, c) in constraints {
        if c.required && !args.contains_key(name) {
            return Err(format!("Missing required argument: {name}"));
        }
    }

    for (name, c) in constraints {
        let Some(value) = args.get(name) else {
            continue;
        };

        if value.is_null() {
            return Err(format!("Argument '{name}' must not be null"));
        }

        match c.type_.as_str() {
            "string" => {
                let Some(s) = value.as_str() else {
                    return Err(format!("Argument '{name}' must be a string"));
                };
                if let Some(pattern) = &c.pattern {
                    match prefix_regex(pattern) {
                        Ok(re) => {
                            if !re.is_match(s) {
                                return Err(format!("Argument '{name}' does not match pattern"));
                            }
                        }
                        Err(_) => {
                            return Err(format!("Invalid regex pattern in policy for '{name}'"));
                        }
                    }
                }
                if let Some(enum_values) = &c.enum_values {
                    if !enum_values.iter().any(|v| v == value) {
                        return Err(format!("Argument '{name}' must be one of {enum_values:?}"));
                    }
                }
            }
            "boolean" => {
                if !value.is_boolean() {
                    return Err(format!("Argument '{name}' must be a boolean"));
                }
            }
            "integer" => {
                if value.is_boolean() || !value.is_i64() && !value.is_u64() {
                    return Err(format!("Argument '{name}' must be an integer"));
                }
                check_bounds(name, value.as_f64().unwrap_or_default(), c)?;
            }
            "number" => {
                if value.is_boolean() || !value.is_number() {
                    return Err(format!("Argument '{name}' must be a number"));
                }
                check_bounds(name, value.as_f64().unwrap_or_default(), c)?;
            }
            other => {
                return Err(format!("Unsupported constraint type for '{name}': {other}"));
            }
        }
    }

    Ok(())
}

fn check_bounds(name: &str, num: f64, c: &Constraint) -> Result<(), String> {
    if let Some(min) = c.min {
        if num < min {
            return Err(format!("Argument '{name}' must be >= {min}"));
        }
    }
    if let Some(max) = c.max {
        if num > max {
            return Err(format!("Argument '{name}' must be <= {max}"));
        }
    }
    Ok(())
}

/// Wrap `pattern` so matching is anchored at the start of the haystack but
/// not at the end, mirroring Python's `re.match` semantics the constraint
/// language was modeled on.
fn prefix_regex(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})"))
}
