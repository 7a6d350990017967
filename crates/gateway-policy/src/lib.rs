//! Declarative policy engine and enforcement pipeline for a zero-trust
//! tool-call gateway.
//!
//! A [`Policy`] is evaluated by a [`PolicyEngine`] (allow/deny rule
//! matching and constraint checking). An [`Enforcer`] binds that engine to
//! a [`RateLimiter`] and an [`AuditSink`], and runs each [`Invocation`]
//! through a fixed six-layer [`Pipeline`]: audit, redact, validate,
//! rate_limit, authorize, detect_attacks, wrapping the caller-supplied
//! [`Tool`].
//!
//! [`Invocation`]: gateway_core::Invocation

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod attacks;
pub mod audit;
pub mod engine;
pub mod enforcer;
pub mod pipeline;
pub mod rate_limit;
pub mod redaction;
pub mod schema;
pub mod tool;

pub use audit::{AuditDecision, AuditEvent, AuditSink, RecordingAuditSink, TracingAuditSink};
pub use engine::PolicyEngine;
pub use enforcer::Enforcer;
pub use pipeline::Pipeline;
pub use rate_limit::{RateLimitTelemetry, RateLimiter};
pub use schema::Policy;
pub use tool::{FnTool, Tool};
