//! [`GatewayError`]: the error taxonomy raised by the enforcement pipeline.

use thiserror::Error;

use crate::decision::Decision;

/// Errors the pipeline can raise.
///
/// `PolicyLoadError` (a malformed policy document) is deliberately not a
/// variant here: parsing a policy document is the host's job (the YAML/JSON
/// format is out of scope for this crate), so a host-side loader defines
/// its own error type and only ever hands this crate an already-validated
/// [`crate::decision::Decision`]-producing policy.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A layer produced `allowed = false`. Expected and always audited.
    #[error("denied: {}", .0.reason)]
    Denied(Decision),

    /// The wrapped tool function itself raised an error. Not recovered;
    /// audited with decision tag `error`, then re-raised to the caller.
    #[error("tool error: {0}")]
    Tool(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A limiter/redactor invariant was violated (e.g. an unparseable
    /// constraint regex slipped past policy construction).
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// The [`Decision`] carried by a `Denied` error, if this is one.
    #[must_use]
    pub fn decision(&self) -> Option<&Decision> {
        match self {
            GatewayError::Denied(d) => Some(d),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Layer;

    #[test]
    fn denied_error_carries_decision() {
        let d = Decision::deny("p1", "no thanks", Layer::Authorize);
        let err = GatewayError::Denied(d);
        assert_eq!(err.decision().unwrap().reason, "no thanks");
        assert_eq!(err.to_string(), "denied: no thanks");
    }
}
