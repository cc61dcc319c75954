//! Validation issues and the severity taxonomy.
//!
//! Issues never abort processing. CRITICAL issues gate the
//! `needs_human_review` flag on the final document; WARN issues are
//! informational for the reviewer.

use serde::{Deserialize, Serialize};

/// Severity of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Informational; surfaced in the review log, never forces human review.
    Warn,
    /// Gates the `needs_human_review` flag.
    Critical,
}

impl std::fmt::Display for Severity {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warn => write!(f, "WARN"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "WARN" | "WARNING" => Ok(Self::Warn),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(format!("unknown severity: '{s}' (expected: WARN, CRITICAL)")),
        }
    }
}

/// A single validation finding attached to a record path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// WARN or CRITICAL.
    pub severity: Severity,
    /// Stable machine-readable code, see [`codes`].
    pub code: String,
    /// Human-readable description.
    pub message: String,
    /// Pointer to the implicated record location.
    pub path: String,
}

impl ValidationIssue {
    /// A WARN-level issue.
    #[must_use]
    pub fn warn(code: &str, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warn,
            code: code.to_string(),
            message: message.into(),
            path: path.into(),
        }
    }

    /// A CRITICAL issue.
    #[must_use]
    pub fn critical(code: &str, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            severity: Severity::Critical,
            code: code.to_string(),
            message: message.into(),
            path: path.into(),
        }
    }
}

/// Whether any issue in the list is CRITICAL (the `needs_human_review` rule).
#[inline]
#[must_use]
pub fn needs_human_review(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(|i| i.severity == Severity::Critical)
}

/// Stable issue codes.
pub mod codes {
    /// A critical decision had no verifier review in any pass.
    pub const MISSING_VERIFIER_REVIEW: &str = "MISSING_VERIFIER_REVIEW";
    /// The latest verifier review for a path was DISAGREE.
    pub const VERIFIER_DISAGREE: &str = "VERIFIER_DISAGREE";
    /// The latest verifier review for a path was UNSURE.
    pub const VERIFIER_UNSURE: &str = "VERIFIER_UNSURE";
    /// No lesion-site flag is set.
    pub const SITE_EMPTY: &str = "SITE_EMPTY";
    /// Multiple site flags set without the "both" flag.
    pub const SITE_INCONSISTENT: &str = "SITE_INCONSISTENT";
    /// No administration-route flag is set.
    pub const ROUTE_EMPTY: &str = "ROUTE_EMPTY";
    /// "Both routes" set without any specific route.
    pub const ROUTE_BOTH_NO_DETAILS: &str = "ROUTE_BOTH_NO_DETAILS";
    /// "Route not reported" set alongside specific route flags.
    pub const ROUTE_NR_CONFLICT: &str = "ROUTE_NR_CONFLICT";
    /// Outcome field holds a non-canonical token.
    pub const MRONJ_DEV_UNEXPECTED: &str = "MRONJ_DEV_UNEXPECTED";
    /// Appraisal sheets are inconsistent with the classified study type.
    pub const APPRAISAL_SHEET_MISMATCH: &str = "APPRAISAL_SHEET_MISMATCH";
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_severity_roundtrip() {
        for sev in [Severity::Warn, Severity::Critical] {
            assert_eq!(Severity::from_str(&sev.to_string()).unwrap(), sev);
        }
        assert!(Severity::from_str("fatal").is_err());
    }

    #[test]
    fn test_severity_wire_format() {
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"CRITICAL\"");
        assert_eq!(serde_json::to_string(&Severity::Warn).unwrap(), "\"WARN\"");
    }

    #[test]
    fn test_needs_human_review_rule() {
        let warn_only = vec![ValidationIssue::warn(codes::SITE_EMPTY, "m", "/p")];
        assert!(!needs_human_review(&warn_only));

        let with_critical = vec![
            ValidationIssue::warn(codes::SITE_EMPTY, "m", "/p"),
            ValidationIssue::critical(codes::VERIFIER_UNSURE, "m", "/q"),
        ];
        assert!(needs_human_review(&with_critical));
        assert!(!needs_human_review(&[]));
    }
}
