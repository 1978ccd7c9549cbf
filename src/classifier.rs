//! Comparison intent classifier
//!
//! Cheap lexical gate in front of the model backend. Recall matters more than
//! precision here: a stray "than" lets a query through, which only costs one
//! model call.

use lazy_static::lazy_static;
use regex::Regex;

/// Comparison indicators, joined into a single alternation
const COMPARISON_PATTERNS: &[&str] = &[
    r"\bbetter\b",
    r"\bworse\b",
    r"\bcompare\b",
    r"\bcomparing\b",
    r"\bcomparison\b",
    r"\bversus\b",
    r"\bvs\b",
    r"\bvs\.",
    r"\bagainst\b",
    r"\bbetween\b",
    r"\bdifference\s+(between|of)\b",
    r"\bhow\s+does\b.*\bcompare\b.*\bto\b",
    r"\bhow\s+do\b.*\bcompare\b",
    r"\bwhich\s+(is|has|performs|does)\b.*\b(better|worse|higher|lower|more|less)\b",
    r"\b(is|are)\s+(better|worse|higher|lower|more|less)\b",
    r"\bthan\b",
    r"\brelative\s+to\b",
    r"\bversus\s+each\s+other\b",
    r"\bcompare\s+(the|these|those)\b",
    r"\bhow\s+different\s+(is|are)\b",
];

lazy_static! {
    static ref COMPARISON_RE: Regex = Regex::new(&format!(
        "(?i)(?:{})",
        COMPARISON_PATTERNS.join("|")
    ))
    .expect("comparison patterns are valid");
}

/// Returns true when the text looks like a request to compare two entities.
pub fn is_comparison(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }
    COMPARISON_RE.is_match(text)
}
