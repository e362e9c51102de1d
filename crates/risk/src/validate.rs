//! Oracle output validation
//!
//! Pure functions: raw oracle text in, bounded [`RiskVerdict`] out. Nothing
//! here can fail the pipeline. Every rejection maps to the safe default with
//! a flag naming the reason.

use guardian_core::assessment::{FLAG_PARSE_ERROR, FLAG_VALIDATION_ERROR};
use guardian_core::{OracleDecision, RiskVerdict, VerdictSource};
use serde_json::Value;

/// Score substituted whenever the oracle cannot be trusted
pub const SAFE_DEFAULT_SCORE: f64 = 0.7;

const SAFE_DEFAULT_EXPLANATION: &str = "Automated analysis unavailable. Manual review required.";
const MISSING_EXPLANATION: &str = "No explanation provided";

/// Bounds applied to oracle output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLimits {
    pub explanation_max_chars: usize,
    pub max_flags: usize,
    pub max_flag_chars: usize,
}

impl Default for OutputLimits {
    fn default() -> Self {
        Self {
            explanation_max_chars: 200,
            max_flags: 5,
            max_flag_chars: 64,
        }
    }
}

/// Why an oracle answer was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No balanced JSON object, or it did not parse
    Unparseable,
    /// Score missing, non-numeric or outside [0, 1]
    InvalidScore,
}

impl Rejection {
    pub fn flag(&self) -> &'static str {
        match self {
            Rejection::Unparseable => FLAG_PARSE_ERROR,
            Rejection::InvalidScore => FLAG_VALIDATION_ERROR,
        }
    }
}

/// Risk-averse verdict used under uncertainty
pub fn safe_default(flag: &str) -> RiskVerdict {
    RiskVerdict {
        score: SAFE_DEFAULT_SCORE,
        recommendation: OracleDecision::Quarantine,
        explanation: SAFE_DEFAULT_EXPLANATION.to_string(),
        flags: vec![flag.to_string()],
        confidence: 0.0,
        requires_human_review: true,
        source: VerdictSource::Fallback,
    }
}

/// Validate raw oracle text, substituting the safe default on rejection
pub fn validate_output(raw: &str, limits: &OutputLimits) -> RiskVerdict {
    match parse_verdict(raw, limits) {
        Ok(verdict) => verdict,
        Err(rejection) => {
            tracing::warn!(reason = rejection.flag(), "Oracle output rejected");
            safe_default(rejection.flag())
        }
    }
}

/// Parse and bound an oracle answer
pub fn parse_verdict(raw: &str, limits: &OutputLimits) -> Result<RiskVerdict, Rejection> {
    let object = extract_json_object(raw).ok_or(Rejection::Unparseable)?;
    let data: Value = serde_json::from_str(object).map_err(|_| Rejection::Unparseable)?;
    if !data.is_object() {
        return Err(Rejection::Unparseable);
    }

    let raw_score = data
        .get("riskScore")
        .or_else(|| data.get("score"))
        .and_then(Value::as_f64)
        .ok_or(Rejection::InvalidScore)?;
    if !(0.0..=1.0).contains(&raw_score) {
        return Err(Rejection::InvalidScore);
    }
    let score = (raw_score * 100.0).round() / 100.0;

    let recommendation = data
        .get("decision")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<OracleDecision>().ok())
        .unwrap_or_else(|| OracleDecision::from_score(raw_score));

    let explanation = match data.get("explanation") {
        None | Some(Value::Null) => MISSING_EXPLANATION.to_string(),
        Some(Value::String(s)) if s.is_empty() => MISSING_EXPLANATION.to_string(),
        Some(value) => truncate_chars(&coerce_string(value), limits.explanation_max_chars),
    };

    let flags = match data.get("flags") {
        Some(Value::Array(items)) => items
            .iter()
            .take(limits.max_flags)
            .map(|item| truncate_chars(&coerce_string(item), limits.max_flag_chars))
            .collect(),
        _ => Vec::new(),
    };

    let confidence = data
        .get("confidence")
        .and_then(Value::as_f64)
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(0.5);

    let requires_human_review = match data.get("requiresHumanReview") {
        Some(Value::Bool(b)) => *b,
        None | Some(Value::Null) => raw_score > 0.6,
        Some(other) => is_truthy(other),
    };

    Ok(RiskVerdict {
        score,
        recommendation,
        explanation,
        flags,
        confidence,
        requires_human_review,
        source: VerdictSource::Oracle,
    })
}

/// Locate the first balanced `{...}` block in free text.
///
/// Braces inside JSON strings (including escaped quotes) do not count.
/// Returns `None` when the first object never closes.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> OutputLimits {
        OutputLimits::default()
    }

    #[test]
    fn test_extract_ignores_braces_in_strings() {
        let text = r#"Sure! {"explanation":"uses } and { \" inside","riskScore":0.2} trailing {junk}"#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"explanation":"uses } and { \" inside","riskScore":0.2}"#)
        );
    }

    #[test]
    fn test_extract_nested_and_unbalanced() {
        assert_eq!(extract_json_object(r#"x {"a":{"b":1}} y"#), Some(r#"{"a":{"b":1}}"#));
        assert_eq!(extract_json_object(r#"{"a":1"#), None);
        assert_eq!(extract_json_object("no json here"), None);
    }

    #[test]
    fn test_valid_output() {
        let raw = r#"```json
{"riskScore":0.856,"decision":"QUARANTINE","explanation":"Large transfer to new address","flags":["NEW_COUNTERPARTY","LARGE_AMOUNT"],"confidence":0.8,"requiresHumanReview":true}
```"#;
        let verdict = validate_output(raw, &limits());
        assert_eq!(verdict.score, 0.86);
        assert_eq!(verdict.recommendation, OracleDecision::Quarantine);
        assert_eq!(verdict.flags, vec!["NEW_COUNTERPARTY", "LARGE_AMOUNT"]);
        assert_eq!(verdict.confidence, 0.8);
        assert!(verdict.requires_human_review);
        assert_eq!(verdict.source, VerdictSource::Oracle);
    }

    #[test]
    fn test_no_json_is_parse_error() {
        let verdict = validate_output("I cannot help with that.", &limits());
        assert_eq!(verdict.flags, vec![FLAG_PARSE_ERROR]);
        assert_eq!(verdict.score, SAFE_DEFAULT_SCORE);
        assert_eq!(verdict.confidence, 0.0);
        assert!(verdict.requires_human_review);
        assert_eq!(verdict.source, VerdictSource::Fallback);

        let broken = validate_output("{riskScore: 0.2}", &limits());
        assert_eq!(broken.flags, vec![FLAG_PARSE_ERROR]);
    }

    #[test]
    fn test_bad_scores_are_validation_errors() {
        for raw in [
            r#"{"decision":"APPROVE"}"#,
            r#"{"riskScore":"0.1"}"#,
            r#"{"riskScore":1.5}"#,
            r#"{"riskScore":-0.1}"#,
        ] {
            let verdict = validate_output(raw, &limits());
            assert_eq!(verdict.flags, vec![FLAG_VALIDATION_ERROR], "input: {}", raw);
            assert_eq!(verdict.recommendation, OracleDecision::Quarantine);
        }
    }

    #[test]
    fn test_score_alias_and_decision_recomputed() {
        let verdict = validate_output(r#"{"score":0.75,"decision":"ESCALATE"}"#, &limits());
        assert_eq!(verdict.score, 0.75);
        assert_eq!(verdict.recommendation, OracleDecision::Block);
        assert_eq!(verdict.explanation, MISSING_EXPLANATION);
        assert_eq!(verdict.confidence, 0.5);
        assert!(verdict.requires_human_review);
        assert!(verdict.flags.is_empty());
    }

    #[test]
    fn test_bounds_applied() {
        let long = "x".repeat(500);
        let raw = serde_json::json!({
            "riskScore": 0.3,
            "explanation": long,
            "flags": ["A", 2, true, null, {"k": "v"}, "F", "G"],
            "confidence": 7,
            "requiresHumanReview": "yes",
        })
        .to_string();

        let verdict = validate_output(&raw, &limits());
        assert_eq!(verdict.explanation.chars().count(), 200);
        assert_eq!(verdict.flags, vec!["A", "2", "true", "null", r#"{"k":"v"}"#]);
        assert_eq!(verdict.confidence, 1.0);
        assert!(verdict.requires_human_review);
    }

    #[test]
    fn test_long_flag_truncated() {
        let raw = serde_json::json!({"riskScore": 0.1, "flags": ["Z".repeat(100)]}).to_string();
        let verdict = validate_output(&raw, &limits());
        assert_eq!(verdict.flags[0].len(), 64);
        assert!(!verdict.requires_human_review);
    }
}
