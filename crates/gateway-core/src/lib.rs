//! Shared primitives for the zero-trust tool-call enforcement gateway.
//!
//! This crate holds the data model that every layer of the pipeline agrees
//! on: the immutable [`Invocation`] a caller submits, the [`Decision`] a
//! layer produces, the per-call [`CallContext`] that carries both plus
//! scratch metadata through the pipeline, and the [`GatewayError`] taxonomy
//! raised when a call is denied or a tool misbehaves.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod decision;
pub mod error;
pub mod ids;
pub mod invocation;

pub use context::CallContext;
pub use decision::{Decision, Layer};
pub use error::GatewayError;
pub use invocation::Invocation;
