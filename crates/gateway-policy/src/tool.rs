//! [`Tool`]: the contract a function being enforced must satisfy.

use std::error::Error;
use std::fmt;

use serde_json::{Map, Value};

/// A named, server-side function the gateway may invoke once a call clears
/// every pre-invocation layer.
///
/// The pipeline is the only component allowed to call this; it is invoked
/// synchronously, at most once per `execute` call, from the caller's thread.
pub trait Tool: Send + Sync {
    /// Stable name used for rule matching, audit events, and bucket keys.
    fn name(&self) -> &str;

    /// Execute the tool with the invocation's arguments.
    ///
    /// # Errors
    /// Returns whatever error the underlying function raised; the pipeline
    /// wraps it in [`crate::GatewayError::Tool`] and never inspects it.
    fn call(&self, arguments: &Map<String, Value>) -> Result<Value, Box<dyn Error + Send + Sync>>;
}

/// Adapts a plain closure into a [`Tool`].
///
/// Mirrors `_callable_name` in the source this crate's enforcer is modeled
/// on: an explicit name is preferred; an un-named closure falls back to its
/// monomorphized type name, which has no runtime equivalent of Python's
/// `__name__` but is at least stable and unique per call site.
pub struct FnTool<F> {
    name: String,
    func: F,
}

impl<F> FnTool<F>
where
    F: Fn(&Map<String, Value>) -> Result<Value, Box<dyn Error + Send + Sync>> + Send + Sync,
{
    /// Wrap `func` under an explicit `name`.
    #[must_use]
    pub fn named(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    /// Wrap `func`, deriving its name from its monomorphized type.
    #[must_use]
    pub fn new(func: F) -> Self {
        Self {
            name: std::any::type_name::<F>().to_string(),
            func,
        }
    }
}

impl<F> fmt::Debug for FnTool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool").field("name", &self.name).finish()
    }
}

impl<F> Tool for FnTool<F>
where
    F: Fn(&Map<String, Value>) -> Result<Value, Box<dyn Error + Send + Sync>> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, arguments: &Map<String, Value>) -> Result<Value, Box<dyn Error + Send + Sync>> {
        (self.func)(arguments)
    }
}
