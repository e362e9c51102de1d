//! Prompt-injection screening
//!
//! Runs on every string in the context, as decoded text, before anything is
//! sent to the oracle. Matching the escaped JSON would miss payloads whose
//! words are separated by newlines or tabs. A single match fails the evaluation closed; the text is never "cleaned"
//! and forwarded.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    static ref INJECTION_PATTERNS: Vec<(&'static str, Regex)> = [
        ("ignore_instructions", r"(?i)ignore\s+(previous|all|your)\s+(instructions|rules)"),
        ("forget_rules", r"(?i)forget\s+(your|all)\s+rules"),
        ("act_as", r"(?i)\bact\s+as\b"),
        ("you_are_now", r"(?i)\byou\s+are\s+now\b"),
        ("system_role", r"(?i)\bsystem\s*:"),
        ("inst_tag", r"(?i)\[/?INST\]"),
        ("sys_tag", r"(?i)<</?SYS>>"),
        ("roleplay", r"(?i)\broleplay\s+as\b"),
        ("pretend", r"(?i)\bpretend\s+(to\s+be|you'?re|you\s+are)\b"),
        ("new_instructions", r"(?i)\bnew\s+instructions\s*:"),
    ]
    .into_iter()
    .filter_map(|(name, pattern)| Regex::new(pattern).ok().map(|re| (name, re)))
    .collect();
}

/// A detected injection attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionMatch {
    /// Name of the pattern that fired
    pub pattern: &'static str,
    /// The matched text
    pub excerpt: String,
}

/// Return the first injection pattern found in `input`, if any
pub fn inspect(input: &str) -> Option<InjectionMatch> {
    INJECTION_PATTERNS.iter().find_map(|(name, re)| {
        re.find(input).map(|m| InjectionMatch {
            pattern: name,
            excerpt: m.as_str().to_string(),
        })
    })
}

/// Inspect every string value and object key in a JSON document
pub fn inspect_value(value: &Value) -> Option<InjectionMatch> {
    match value {
        Value::String(s) => inspect(s),
        Value::Array(items) => items.iter().find_map(inspect_value),
        Value::Object(map) => map
            .iter()
            .find_map(|(key, item)| inspect(key).or_else(|| inspect_value(item))),
        Value::Null | Value::Bool(_) | Value::Number(_) => None,
    }
}

pub fn is_suspicious(input: &str) -> bool {
    inspect(input).is_some()
}
