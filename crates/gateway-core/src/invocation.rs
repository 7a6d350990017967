//! The [`Invocation`]: an immutable description of one tool call.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::now_iso;

/// One attempt to call a named server-side tool with structured arguments,
/// plus whatever identity/context the caller claims.
///
/// Immutable after construction: every `with_*` builder consumes and
/// returns `Self`. Arguments are an ordered JSON object
/// (`serde_json::Map` with the `preserve_order` feature) because
/// constraint evaluation must walk them in policy-source insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invocation {
    tool_name: String,
    arguments: Map<String, Value>,
    actor: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    request_id: Option<String>,
    client: Option<Map<String, Value>>,
    context: Option<Map<String, Value>>,
    auth: Option<Map<String, Value>>,
    source: Option<Map<String, Value>>,
    timestamp: Option<String>,
}

impl Invocation {
    /// Start building an invocation for `tool_name` with empty arguments.
    #[must_use]
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments: Map::new(),
            actor: None,
            roles: Vec::new(),
            request_id: None,
            client: None,
            context: None,
            auth: None,
            source: None,
            timestamp: None,
        }
    }

    /// Replace the argument map.
    #[must_use]
    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Set the claimed actor identifier.
    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Set the claimed roles for RBAC-style allow-rule matching.
    #[must_use]
    pub fn with_roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Set the request correlation id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Set client metadata (may contain a `session_id` used by rate-limit scoping).
    #[must_use]
    pub fn with_client(mut self, client: Map<String, Value>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set execution-context metadata (e.g. transport, server name).
    #[must_use]
    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = Some(context);
        self
    }

    /// Set authentication metadata (e.g. scheme, claims).
    #[must_use]
    pub fn with_auth(mut self, auth: Map<String, Value>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set source metadata (e.g. ip, user-agent).
    #[must_use]
    pub fn with_source(mut self, source: Map<String, Value>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set an explicit ISO-8601 timestamp for the call.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Tool/function name.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Tool arguments.
    #[must_use]
    pub fn arguments(&self) -> &Map<String, Value> {
        &self.arguments
    }

    /// Claimed actor identifier, if any.
    #[must_use]
    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    /// Roles claimed by the actor.
    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Request correlation id, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Client metadata, if any.
    #[must_use]
    pub fn client(&self) -> Option<&Map<String, Value>> {
        self.client.as_ref()
    }

    /// Execution-context metadata, if any.
    #[must_use]
    pub fn context(&self) -> Option<&Map<String, Value>> {
        self.context.as_ref()
    }

    /// Authentication metadata, if any.
    #[must_use]
    pub fn auth(&self) -> Option<&Map<String, Value>> {
        self.auth.as_ref()
    }

    /// Source metadata, if any.
    #[must_use]
    pub fn source(&self) -> Option<&Map<String, Value>> {
        self.source.as_ref()
    }

    /// The call's timestamp, defaulting to "now, UTC" if none was set.
    #[must_use]
    pub fn iso_timestamp(&self) -> String {
        self.timestamp.clone().unwrap_or_else(now_iso)
    }

    /// UTF-8 length of a canonical JSON encoding of the arguments.
    ///
    /// If encoding fails, treated as effectively infinite so any finite
    /// `max_arg_bytes` limit rejects it. `serde_json::Value` can't itself
    /// hold a non-serializable payload, so this branch is defensive rather
    /// than reachable today — kept for parity with hosts that build
    /// `Invocation` from a less strictly-typed source.
    #[must_use]
    pub fn arguments_size_bytes(&self) -> u64 {
        match serde_json::to_vec(&self.arguments) {
            Ok(bytes) => bytes.len() as u64,
            Err(_) => u64::MAX,
        }
    }
}
