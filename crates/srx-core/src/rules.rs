//! Domain consistency checks and deterministic score computation.
//!
//! Both operate on the merged working record after all verifier patches are
//! folded. The rule validator emits WARN issues only - a flag inconsistency
//! is reviewer information, not grounds to block output on its own.

use crate::issue::{codes, ValidationIssue};
use crate::record::{
    CASE_CONTROL_APPRAISAL, CASE_SERIES_APPRAISAL, COHORT_APPRAISAL, INCLUDED_ARTICLES,
    RCT_APPRAISAL, SYSTEMATIC_APPRAISAL,
};
use crate::value::{Group, Node, Scalar};

/// The five fixed RCT appraisal question keys.
const RCT_QUESTIONS: [&str; 5] = [
    "q1_randomized",
    "q2_randomization_method",
    "q3_double_blind",
    "q4_blinding_method",
    "q5_withdrawals",
];

/// Accepted literal spellings of an affirmative answer.
#[must_use]
pub fn is_affirmative(value: &Scalar) -> bool {
    match value {
        Scalar::Bool(b) => *b,
        Scalar::Int(i) => *i == 1,
        Scalar::Float(f) => *f == 1.0,
        Scalar::Str(s) => matches!(s.as_str(), "1" | "true" | "True" | "YES" | "Yes"),
        Scalar::Null => false,
    }
}

fn is_negative_contribution(value: &Scalar) -> bool {
    match value {
        Scalar::Int(i) => *i == -1,
        Scalar::Float(f) => *f == -1.0,
        Scalar::Str(s) => s.trim() == "-1",
        _ => false,
    }
}

fn sheets_mut(root: &mut Node) -> Option<&mut Group> {
    root.as_group_mut()?
        .get_mut("record")?
        .as_group_mut()?
        .get_mut("sheets")?
        .as_group_mut()
}

fn sheet<'a>(root: &'a Node, key: &str) -> Option<&'a Group> {
    root.child("record")?.child("sheets")?.child(key)?.as_group()
}

/// Compute `total_score` for every populated appraisal sheet, in place.
///
/// The RCT sheet sums +1 over its five fixed questions. The other appraisal
/// sheets sum over every `q*` key, where an affirmative answer contributes
/// +1 and a signed `-1` answer contributes -1; the total is floored at zero.
pub fn compute_scores(root: &mut Node) {
    let Some(sheets) = sheets_mut(root) else {
        return;
    };

    if let Some(rct) = sheets.get_mut(RCT_APPRAISAL).and_then(Node::as_group_mut) {
        let score: i64 = RCT_QUESTIONS
            .iter()
            .filter_map(|k| rct.get(*k))
            .filter_map(Node::as_scalar)
            .filter(|v| is_affirmative(v))
            .count() as i64;
        rct.insert("total_score".to_string(), Node::Scalar(Scalar::Int(score)));
    }

    for key in [
        COHORT_APPRAISAL,
        CASE_SERIES_APPRAISAL,
        CASE_CONTROL_APPRAISAL,
        SYSTEMATIC_APPRAISAL,
    ] {
        let Some(group) = sheets.get_mut(key).and_then(Node::as_group_mut) else {
            continue;
        };
        let mut score: i64 = 0;
        for (field, value) in group.iter() {
            if !field.starts_with('q') {
                continue;
            }
            if let Some(v) = value.as_scalar() {
                if is_affirmative(v) {
                    score += 1;
                } else if is_negative_contribution(v) {
                    score -= 1;
                }
            }
        }
        group.insert(
            "total_score".to_string(),
            Node::Scalar(Scalar::Int(score.max(0))),
        );
    }
}

fn count_affirmative(group: &Group, keys: &[&str]) -> usize {
    keys.iter()
        .filter_map(|k| group.get(*k))
        .filter_map(Node::as_scalar)
        .filter(|v| is_affirmative(v))
        .count()
}

fn flag_set(group: &Group, key: &str) -> bool {
    group
        .get(key)
        .and_then(Node::as_scalar)
        .is_some_and(is_affirmative)
}

const SITE_KEYS: [&str; 3] = ["site_maxilla", "site_mandible", "site_both"];
const SPECIFIC_ROUTE_KEYS: [&str; 4] = ["route_iv", "route_oral", "route_im", "route_subcutaneous"];
const ROUTE_KEYS: [&str; 6] = [
    "route_iv",
    "route_oral",
    "route_im",
    "route_subcutaneous",
    "route_both",
    "route_not_reported",
];

/// Structural consistency checks over the demographics sheet.
///
/// All findings are WARN-level: they surface to the human reviewer but never
/// force `needs_human_review` by themselves.
#[must_use]
pub fn rule_validation(root: &Node) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let sheet_path = format!("/record/sheets/{INCLUDED_ARTICLES}");
    let Some(inc) = sheet(root, INCLUDED_ARTICLES) else {
        return issues;
    };

    let sites = count_affirmative(inc, &SITE_KEYS);
    if sites == 0 {
        issues.push(ValidationIssue::warn(
            codes::SITE_EMPTY,
            "No site marked (maxilla/mandible/both).",
            &sheet_path,
        ));
    }
    if sites > 1 && !flag_set(inc, "site_both") {
        issues.push(ValidationIssue::warn(
            codes::SITE_INCONSISTENT,
            "Multiple site flags set but site_both not set.",
            &sheet_path,
        ));
    }

    if count_affirmative(inc, &ROUTE_KEYS) == 0 {
        issues.push(ValidationIssue::warn(
            codes::ROUTE_EMPTY,
            "No route marked.",
            &sheet_path,
        ));
    }
    if flag_set(inc, "route_both") && count_affirmative(inc, &SPECIFIC_ROUTE_KEYS) == 0 {
        issues.push(ValidationIssue::warn(
            codes::ROUTE_BOTH_NO_DETAILS,
            "route_both is set but no specific route marked.",
            &sheet_path,
        ));
    }
    if flag_set(inc, "route_not_reported") {
        let others = count_affirmative(inc, &SPECIFIC_ROUTE_KEYS) + usize::from(flag_set(inc, "route_both"));
        if others > 0 {
            issues.push(ValidationIssue::warn(
                codes::ROUTE_NR_CONFLICT,
                "route_not_reported is set but other route flags are also set.",
                &sheet_path,
            ));
        }
    }

    if let Some(Scalar::Str(dev)) = inc.get("mronj_development").and_then(Node::as_scalar) {
        let token = dev.trim().to_lowercase();
        if !matches!(
            token.as_str(),
            "yes" | "no" | "unclear" | "n/a" | "na" | "nr" | "not reported"
        ) {
            issues.push(ValidationIssue::warn(
                codes::MRONJ_DEV_UNEXPECTED,
                "mronj_development is not a standard token (Yes/No/Unclear).",
                format!("{sheet_path}/mronj_development"),
            ));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointer::get_scalar;

    fn node(json: &str) -> Node {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_rct_score_counts_affirmative_spellings() {
        let mut root = node(
            r#"{"record": {"sheets": {"rct_appraisal": {
                "q1_randomized": 1,
                "q2_randomization_method": "Yes",
                "q3_double_blind": true,
                "q4_blinding_method": 0,
                "q5_withdrawals": null
            }}}}"#,
        );
        compute_scores(&mut root);
        assert_eq!(
            get_scalar(&root, "/record/sheets/rct_appraisal/total_score"),
            Scalar::Int(3)
        );
    }

    #[test]
    fn test_rct_score_ignores_non_question_keys() {
        let mut root = node(
            r#"{"record": {"sheets": {"rct_appraisal": {"author": "Yes", "q1_randomized": 1}}}}"#,
        );
        compute_scores(&mut root);
        assert_eq!(
            get_scalar(&root, "/record/sheets/rct_appraisal/total_score"),
            Scalar::Int(1)
        );
    }

    #[test]
    fn test_signed_scale_floors_at_zero() {
        let mut root = node(
            r#"{"record": {"sheets": {"case_control_appraisal": {
                "q1_clear_question": -1,
                "q2_cases_representative": -1,
                "q3_controls_selected": 1
            }}}}"#,
        );
        compute_scores(&mut root);
        assert_eq!(
            get_scalar(&root, "/record/sheets/case_control_appraisal/total_score"),
            Scalar::Int(0)
        );
    }

    #[test]
    fn test_signed_scale_mixed_contributions() {
        let mut root = node(
            r#"{"record": {"sheets": {"cohort_appraisal": {
                "q1_clear_question": "Yes",
                "q2_cohort_recruited": 1,
                "q3_exposure_measured": -1,
                "q4_outcome_measured": 0
            }}}}"#,
        );
        compute_scores(&mut root);
        assert_eq!(
            get_scalar(&root, "/record/sheets/cohort_appraisal/total_score"),
            Scalar::Int(1)
        );
    }

    #[test]
    fn test_null_sheets_are_skipped() {
        let mut root = node(r#"{"record": {"sheets": {"rct_appraisal": null}}}"#);
        compute_scores(&mut root);
        assert!(root
            .child("record")
            .and_then(|r| r.child("sheets"))
            .and_then(|s| s.child("rct_appraisal"))
            .is_some_and(Node::is_null));
    }

    #[test]
    fn test_site_rules() {
        let root = node(
            r#"{"record": {"sheets": {"included_articles": {"site_maxilla": 1, "site_mandible": 1, "route_iv": 1}}}}"#,
        );
        let issues = rule_validation(&root);
        assert!(issues.iter().any(|i| i.code == codes::SITE_INCONSISTENT));
        assert!(!issues.iter().any(|i| i.code == codes::SITE_EMPTY));
    }

    #[test]
    fn test_route_rules() {
        let root = node(
            r#"{"record": {"sheets": {"included_articles": {"site_both": 1, "route_both": "Yes"}}}}"#,
        );
        let issues = rule_validation(&root);
        assert!(issues.iter().any(|i| i.code == codes::ROUTE_BOTH_NO_DETAILS));

        let root = node(
            r#"{"record": {"sheets": {"included_articles": {"site_both": 1, "route_not_reported": 1, "route_oral": 1}}}}"#,
        );
        let issues = rule_validation(&root);
        assert!(issues.iter().any(|i| i.code == codes::ROUTE_NR_CONFLICT));
    }

    #[test]
    fn test_empty_flags_warn() {
        let root = node(r#"{"record": {"sheets": {"included_articles": {"pmid": 1}}}}"#);
        let issues = rule_validation(&root);
        assert!(issues.iter().any(|i| i.code == codes::SITE_EMPTY));
        assert!(issues.iter().any(|i| i.code == codes::ROUTE_EMPTY));
    }

    #[test]
    fn test_mronj_development_token_check() {
        let root = node(
            r#"{"record": {"sheets": {"included_articles": {"site_both": 1, "route_iv": 1, "mronj_development": "maybe"}}}}"#,
        );
        let issues = rule_validation(&root);
        assert!(issues.iter().any(|i| i.code == codes::MRONJ_DEV_UNEXPECTED));

        let root = node(
            r#"{"record": {"sheets": {"included_articles": {"site_both": 1, "route_iv": 1, "mronj_development": "Yes"}}}}"#,
        );
        let issues = rule_validation(&root);
        assert!(!issues.iter().any(|i| i.code == codes::MRONJ_DEV_UNEXPECTED));

        // all findings are WARN
        let root = node(r#"{"record": {"sheets": {"included_articles": {}}}}"#);
        assert!(rule_validation(&root)
            .iter()
            .all(|i| i.severity == crate::issue::Severity::Warn));
    }
}
