//! Content classification: sensitive values and legal flags.
//!
//! Pure functions over the payload text; no I/O, no state.

use std::sync::LazyLock;

use regex::Regex;

use super::types::ClassificationVerdict;

/// Field value that flags a row for legal review.
pub const LEGAL_FLAG_FIELD: &str = "legal";

/// Kind of sensitive value a pattern detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensitiveKind {
    SocialSecurityNumber,
    GroupedCardNumber,
    BareCardNumber,
    CardVerificationCode,
}

impl SensitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SocialSecurityNumber => "social_security_number",
            Self::GroupedCardNumber => "grouped_card_number",
            Self::BareCardNumber => "bare_card_number",
            Self::CardVerificationCode => "card_verification_code",
        }
    }
}

/// A compiled pattern with its kind.
struct SensitivePattern {
    regex: Regex,
    kind: SensitiveKind,
}

/// Evaluated in order; the first match wins.
static SENSITIVE_PATTERNS: LazyLock<Vec<SensitivePattern>> = LazyLock::new(|| {
    vec![
        pattern(r"\b\d{3}-\d{2}-\d{4}\b", SensitiveKind::SocialSecurityNumber),
        pattern(r"\b\d{4}-\d{4}-\d{4}-\d{4}\b", SensitiveKind::GroupedCardNumber),
        pattern(r"\b\d{16}\b", SensitiveKind::BareCardNumber),
        pattern(r"\b\d{3}\b", SensitiveKind::CardVerificationCode),
    ]
});

fn pattern(regex_str: &str, kind: SensitiveKind) -> SensitivePattern {
    SensitivePattern {
        regex: Regex::new(regex_str).expect("Invalid sensitive-value regex pattern"),
        kind,
    }
}

/// Classify a (transformed) payload.
pub fn classify(payload: &str) -> ClassificationVerdict {
    let sensitive_kind = first_sensitive_match(payload);
    ClassificationVerdict {
        has_sensitive_data: sensitive_kind.is_some(),
        has_legal_flag: has_legal_flag(payload),
        sensitive_kind,
    }
}

/// Kind of the first sensitive pattern that matches, in pattern order.
pub fn first_sensitive_match(payload: &str) -> Option<SensitiveKind> {
    SENSITIVE_PATTERNS
        .iter()
        .find(|p| p.regex.is_match(payload))
        .map(|p| p.kind)
}

/// True if any comma-delimited row has a field exactly equal to `legal`.
///
/// Quoted fields are unquoted before comparison and ragged rows are fine.
/// Rows the reader rejects are skipped.
pub fn has_legal_flag(payload: &str) -> bool {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(payload.as_bytes());

    reader
        .records()
        .filter_map(Result::ok)
        .any(|row| row.iter().any(|field| field == LEGAL_FLAG_FIELD))
}
