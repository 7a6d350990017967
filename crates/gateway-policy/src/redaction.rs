//! The redaction engine: a shape-preserving, recursive rewrite of a
//! [`Value`] tree that masks deny-listed keys and PII-shaped substrings.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::schema::RedactConfig;

const REDACTED: &str = "[REDACTED]";
const REDACTED_EMAIL: &str = "[REDACTED_EMAIL]";
const REDACTED_PHONE: &str = "[REDACTED_PHONE]";
const TRUNCATION_MARKER: char = '\u{2026}';

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b").expect("static email regex")
});

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\+?\d{1,3}[-.\s]?)?(?:\(?\d{3}\)?[-.\s]?)\d{3}[-.\s]?\d{4}\b")
        .expect("static phone regex")
});

/// Recursively rewrite `value` per `cfg`, preserving its shape.
///
/// Never returns an alias into `value`: every array and object along the
/// path to a rewritten leaf is rebuilt as a fresh container, even where
/// nothing under it needed changing.
#[must_use]
pub fn redact(value: &Value, cfg: &RedactConfig) -> Value {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
        Value::String(s) => Value::String(redact_string(s, cfg)),
        Value::Array(items) => Value::Array(items.iter().map(|v| redact(v, cfg)).collect()),
        Value::Object(map) => Value::Object(redact_object(map, cfg)),
    }
}

fn redact_string(s: &str, cfg: &RedactConfig) -> String {
    let mut out = if cfg.max_string_len > 0 && s.chars().count() as u64 > cfg.max_string_len {
        let mut truncated: String = s.chars().take(cfg.max_string_len as usize).collect();
        truncated.push(TRUNCATION_MARKER);
        truncated
    } else {
        s.to_string()
    };

    if cfg.pii_emails {
        out = EMAIL_RE.replace_all(&out, REDACTED_EMAIL).into_owned();
    }
    if cfg.pii_phones {
        out = PHONE_RE.replace_all(&out, REDACTED_PHONE).into_owned();
    }
    out
}

fn redact_object(map: &Map<String, Value>, cfg: &RedactConfig) -> Map<String, Value> {
    let mut out = Map::with_capacity(map.len());
    for (k, v) in map {
        if is_denied_key(k, &cfg.deny_keys) {
            out.insert(k.clone(), Value::String(REDACTED.to_string()));
        } else {
            out.insert(k.clone(), redact(v, cfg));
        }
    }
    out
}

fn is_denied_key(key: &str, deny_keys: &[String]) -> bool {
    deny_keys.iter().any(|dk| dk.eq_ignore_ascii_case(key))
}
