//! Heuristic pattern scan for injection, traversal, and SSRF attempts in
//! selected argument fields.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static SQLI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(select|union|insert|update|delete|drop|alter)\b").expect("static sqli regex"));

static TRAVERSAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\.\./|\.\.\\)").expect("static traversal regex"));

static SSRF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(169\.254\.169\.254|localhost|127\.0\.0\.1)\b").expect("static ssrf regex"));

/// Whether any string reachable from `arguments` under a key in `fields`
/// matches a known dangerous pattern.
#[must_use]
pub fn scan(arguments: &Map<String, Value>, fields: &[String]) -> bool {
    let keys: HashSet<&str> = fields.iter().map(String::as_str).collect();
    collect_strings(arguments, &keys)
        .iter()
        .any(|s| SQLI_RE.is_match(s) || TRAVERSAL_RE.is_match(s) || SSRF_RE.is_match(s))
}

/// Recursively collect every string value whose immediate parent key is in
/// `keys_of_interest`, walking nested objects and arrays.
fn collect_strings<'a>(arguments: &'a Map<String, Value>, keys_of_interest: &HashSet<&str>) -> Vec<&'a str> {
    let mut out = Vec::new();
    walk_map(arguments, keys_of_interest, &mut out);
    out
}

fn walk_map<'a>(map: &'a Map<String, Value>, keys_of_interest: &HashSet<&str>, out: &mut Vec<&'a str>) {
    for (k, v) in map {
        if keys_of_interest.contains(k.as_str()) {
            if let Some(s) = v.as_str() {
                out.push(s);
            }
        }
        walk(v, keys_of_interest, out);
    }
}

fn walk<'a>(value: &'a Value, keys_of_interest: &HashSet<&str>, out: &mut Vec<&'a str>) {
    match value {
        Value::Object(map) => walk_map(map, keys_of_interest, out),
        Value::Array(items) => {
            for v in items {
                walk(v, keys_of_interest, out);
            }
        }
        _ => {}
    }
}
