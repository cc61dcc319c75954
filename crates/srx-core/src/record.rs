//! Paper identity, study-type classification, and the fixed sheet layout.

use crate::issue::{codes, ValidationIssue};
use crate::value::{Node, Scalar};
use serde::{Deserialize, Serialize};

/// External identifier bundle; each part independently nullable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperId {
    /// PubMed identifier.
    pub pmid: Option<i64>,
    /// Digital object identifier.
    pub doi: Option<String>,
    /// Paper title.
    pub title: Option<String>,
}

/// Study design classification driving which appraisal sheet applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyType {
    /// Randomized controlled trial.
    Rct,
    /// Cohort study.
    Cohort,
    /// Case series.
    CaseSeries,
    /// Case-control study.
    CaseControl,
    /// Systematic review.
    SystematicReview,
    /// A design outside the appraisal taxonomy.
    Other,
    /// Could not be classified from the paper text.
    #[default]
    Unclear,
}

impl StudyType {
    /// The appraisal sheet key this study type must populate, if any.
    #[must_use]
    pub const fn appraisal_sheet(self) -> Option<&'static str> {
        match self {
            Self::Rct => Some(RCT_APPRAISAL),
            Self::Cohort => Some(COHORT_APPRAISAL),
            Self::CaseSeries => Some(CASE_SERIES_APPRAISAL),
            Self::CaseControl => Some(CASE_CONTROL_APPRAISAL),
            Self::SystematicReview => Some(SYSTEMATIC_APPRAISAL),
            Self::Other | Self::Unclear => None,
        }
    }

    /// Wire token, e.g. `case_series`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rct => "rct",
            Self::Cohort => "cohort",
            Self::CaseSeries => "case_series",
            Self::CaseControl => "case_control",
            Self::SystematicReview => "systematic_review",
            Self::Other => "other",
            Self::Unclear => "unclear",
        }
    }
}

impl std::fmt::Display for StudyType {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StudyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rct" => Ok(Self::Rct),
            "cohort" => Ok(Self::Cohort),
            "case_series" => Ok(Self::CaseSeries),
            "case_control" => Ok(Self::CaseControl),
            "systematic_review" => Ok(Self::SystematicReview),
            "other" => Ok(Self::Other),
            "unclear" => Ok(Self::Unclear),
            _ => Err(format!("unknown study type: '{s}'")),
        }
    }
}

/// Demographics and outcomes sheet.
pub const INCLUDED_ARTICLES: &str = "included_articles";
/// Evidence-level sheet.
pub const LEVEL_OF_EVIDENCE: &str = "level_of_evidence";
/// RCT critical-appraisal sheet.
pub const RCT_APPRAISAL: &str = "rct_appraisal";
/// Cohort critical-appraisal sheet.
pub const COHORT_APPRAISAL: &str = "cohort_appraisal";
/// Case-series critical-appraisal sheet.
pub const CASE_SERIES_APPRAISAL: &str = "case_series_appraisal";
/// Case-control critical-appraisal sheet.
pub const CASE_CONTROL_APPRAISAL: &str = "case_control_appraisal";
/// Systematic-review critical-appraisal sheet.
pub const SYSTEMATIC_APPRAISAL: &str = "systematic_appraisal";

/// The fixed sheet set, in workbook order.
pub const SHEET_KEYS: [&str; 7] = [
    INCLUDED_ARTICLES,
    LEVEL_OF_EVIDENCE,
    RCT_APPRAISAL,
    COHORT_APPRAISAL,
    CASE_SERIES_APPRAISAL,
    CASE_CONTROL_APPRAISAL,
    SYSTEMATIC_APPRAISAL,
];

/// The appraisal sheets (one per appraisable study type).
pub const APPRAISAL_SHEETS: [&str; 5] = [
    RCT_APPRAISAL,
    COHORT_APPRAISAL,
    CASE_SERIES_APPRAISAL,
    CASE_CONTROL_APPRAISAL,
    SYSTEMATIC_APPRAISAL,
];

/// Read the study type out of a working record tree, defaulting to unclear.
#[must_use]
pub fn study_type_of(root: &Node) -> StudyType {
    root.child("study_type")
        .and_then(Node::as_scalar)
        .and_then(Scalar::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

/// Read the paper identity out of a working record tree.
#[must_use]
pub fn paper_id_of(root: &Node) -> PaperId {
    let pid = root.child("paper_id");
    let scalar = |key: &str| pid.and_then(|p| p.child(key)).and_then(Node::as_scalar).cloned();
    PaperId {
        pmid: match scalar("pmid") {
            Some(Scalar::Int(i)) => Some(i),
            Some(Scalar::Float(f)) if f.fract() == 0.0 => Some(f as i64),
            _ => None,
        },
        doi: scalar("doi").as_ref().and_then(Scalar::as_str).map(str::to_string),
        title: scalar("title").as_ref().and_then(Scalar::as_str).map(str::to_string),
    }
}

/// Check the appraisal-sheet invariant against the classified study type.
///
/// Exactly one study-type-specific appraisal sheet must be non-null and it
/// must be the one matching `study_type`; for `other`/`unclear` all appraisal
/// sheets must be null. Violations are WARN issues, never errors: the
/// verifier may still fix the classification in a later pass.
#[must_use]
pub fn check_sheet_consistency(root: &Node) -> Vec<ValidationIssue> {
    let study_type = study_type_of(root);
    let sheets = root
        .child("record")
        .and_then(|r| r.child("sheets"))
        .and_then(Node::as_group);

    let mut populated: Vec<&str> = Vec::new();
    if let Some(sheets) = sheets {
        for key in APPRAISAL_SHEETS {
            if sheets.get(key).is_some_and(|n| n.as_group().is_some()) {
                populated.push(key);
            }
        }
    }

    let expected = study_type.appraisal_sheet();
    let consistent = match expected {
        Some(sheet) => populated == [sheet],
        None => populated.is_empty(),
    };
    if consistent {
        return Vec::new();
    }

    vec![ValidationIssue::warn(
        codes::APPRAISAL_SHEET_MISMATCH,
        format!(
            "study_type {study_type} expects appraisal sheet {}, found populated: [{}]",
            expected.unwrap_or("none"),
            populated.join(", "),
        ),
        "/record/sheets",
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(json: &str) -> Node {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_study_type_roundtrip() {
        for st in [
            StudyType::Rct,
            StudyType::Cohort,
            StudyType::CaseSeries,
            StudyType::CaseControl,
            StudyType::SystematicReview,
            StudyType::Other,
            StudyType::Unclear,
        ] {
            assert_eq!(st.as_str().parse::<StudyType>().unwrap(), st);
        }
        assert!("meta_analysis".parse::<StudyType>().is_err());
    }

    #[test]
    fn test_study_type_wire_token() {
        assert_eq!(
            serde_json::to_string(&StudyType::SystematicReview).unwrap(),
            "\"systematic_review\""
        );
        let st: StudyType = serde_json::from_str("\"case_series\"").unwrap();
        assert_eq!(st, StudyType::CaseSeries);
    }

    #[test]
    fn test_study_type_of_defaults_to_unclear() {
        assert_eq!(study_type_of(&Node::group()), StudyType::Unclear);
        assert_eq!(
            study_type_of(&node(r#"{"study_type": "rct"}"#)),
            StudyType::Rct
        );
        assert_eq!(
            study_type_of(&node(r#"{"study_type": "nonsense"}"#)),
            StudyType::Unclear
        );
    }

    #[test]
    fn test_paper_id_of_tolerates_partial_identity() {
        let root = node(r#"{"paper_id": {"pmid": 123456.0, "doi": null, "title": "T"}}"#);
        let pid = paper_id_of(&root);
        assert_eq!(pid.pmid, Some(123_456));
        assert_eq!(pid.doi, None);
        assert_eq!(pid.title.as_deref(), Some("T"));
    }

    #[test]
    fn test_sheet_consistency_accepts_matching_sheet() {
        let root = node(
            r#"{"study_type": "rct", "record": {"sheets": {"rct_appraisal": {"q1_randomized": 1}, "cohort_appraisal": null}}}"#,
        );
        assert!(check_sheet_consistency(&root).is_empty());
    }

    #[test]
    fn test_sheet_consistency_flags_wrong_sheet() {
        let root = node(
            r#"{"study_type": "rct", "record": {"sheets": {"cohort_appraisal": {"q1_clear_question": 1}}}}"#,
        );
        let issues = check_sheet_consistency(&root);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, codes::APPRAISAL_SHEET_MISMATCH);
    }

    #[test]
    fn test_sheet_consistency_unclear_requires_all_null() {
        let root = node(r#"{"study_type": "unclear", "record": {"sheets": {}}}"#);
        assert!(check_sheet_consistency(&root).is_empty());

        let root = node(
            r#"{"study_type": "unclear", "record": {"sheets": {"rct_appraisal": {"q1_randomized": 1}}}}"#,
        );
        assert_eq!(check_sheet_consistency(&root).len(), 1);
    }
}
