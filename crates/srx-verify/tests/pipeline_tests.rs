//! End-to-end pipeline tests with scripted agents.

use async_trait::async_trait;
use srx_core::{pointer, Decision, Node, PaperId, Scalar, StudyType};
use srx_verify::{
    abba, pipeline, DecisionReview, DriverOutput, Extractor, PipelineConfig, PipelineError,
    ReviewStatus, Verifier, VerifierPass,
};
use std::sync::Mutex;

fn node(json: &str) -> Node {
    serde_json::from_str(json).unwrap()
}

fn rct_driver_output() -> DriverOutput {
    DriverOutput {
        paper_id: PaperId {
            pmid: Some(123_456),
            doi: Some("10.1000/x".to_string()),
            title: Some("Prevention trial".to_string()),
        },
        study_type: StudyType::Rct,
        record: node(
            r#"{"sheets": {
                "included_articles": {"n_pts": 40, "site_both": 1, "route_iv": 1},
                "rct_appraisal": {"q1_randomized": 1, "q2_randomization_method": 0}
            }}"#,
        ),
        critical_decisions: vec![Decision::new(
            "/record/sheets/included_articles/n_pts",
            Scalar::Int(40),
            "Forty patients were enrolled.",
        )],
        confidence: Some(0.9),
        notes: None,
    }
}

struct FixedExtractor(DriverOutput);

#[async_trait]
impl Extractor for FixedExtractor {
    async fn extract(&self, _view: &str) -> anyhow::Result<DriverOutput> {
        Ok(self.0.clone())
    }
}

/// Agrees with every decision it is shown.
struct AgreeingVerifier;

#[async_trait]
impl Verifier for AgreeingVerifier {
    async fn verify_chunk(
        &self,
        _view: &str,
        _record: &Node,
        decisions: &[Decision],
    ) -> anyhow::Result<VerifierPass> {
        Ok(VerifierPass {
            verdict: Some("PASS".to_string()),
            critical_errors: Vec::new(),
            decision_reviews: decisions
                .iter()
                .map(|d| DecisionReview {
                    path: d.path.clone(),
                    is_critical: d.is_critical,
                    status: ReviewStatus::Agree,
                    driver_value: d.value.clone(),
                    proposed_value: None,
                    explanation: "Supported by the text.".to_string(),
                    evidence: "Stated in methods.".to_string(),
                })
                .collect(),
            suggested_patch: None,
            rationale: None,
            confidence: Some(0.95),
        })
    }
}

/// Disagrees on one path in its first call, patching the record; agrees on
/// everything afterwards.
struct DisagreeOnceVerifier {
    target: String,
    corrected: Scalar,
    fired: Mutex<bool>,
}

#[async_trait]
impl Verifier for DisagreeOnceVerifier {
    async fn verify_chunk(
        &self,
        _view: &str,
        _record: &Node,
        decisions: &[Decision],
    ) -> anyhow::Result<VerifierPass> {
        let mut fired = self.fired.lock().unwrap();
        let first_call = !*fired;
        *fired = true;

        let reviews = decisions
            .iter()
            .map(|d| {
                let disagree = first_call && d.path == self.target;
                DecisionReview {
                    path: d.path.clone(),
                    is_critical: d.is_critical,
                    status: if disagree {
                        ReviewStatus::Disagree
                    } else {
                        ReviewStatus::Agree
                    },
                    driver_value: d.value.clone(),
                    proposed_value: disagree.then(|| self.corrected.clone()),
                    explanation: String::new(),
                    evidence: String::new(),
                }
            })
            .collect();

        let suggested_patch = first_call.then(|| {
            node(&format!(
                r#"{{"record": {{"sheets": {{"included_articles": {{"n_pts": {}}}}}}}}}"#,
                serde_json::to_string(&self.corrected).unwrap()
            ))
        });

        Ok(VerifierPass {
            verdict: None,
            critical_errors: Vec::new(),
            decision_reviews: reviews,
            suggested_patch,
            rationale: None,
            confidence: None,
        })
    }
}

/// Reviews nothing at all.
struct SilentVerifier;

#[async_trait]
impl Verifier for SilentVerifier {
    async fn verify_chunk(
        &self,
        _view: &str,
        _record: &Node,
        _decisions: &[Decision],
    ) -> anyhow::Result<VerifierPass> {
        Ok(VerifierPass {
            verdict: None,
            critical_errors: Vec::new(),
            decision_reviews: Vec::new(),
            suggested_patch: None,
            rationale: None,
            confidence: None,
        })
    }
}

/// Always fails.
struct BrokenVerifier;

#[async_trait]
impl Verifier for BrokenVerifier {
    async fn verify_chunk(
        &self,
        _view: &str,
        _record: &Node,
        _decisions: &[Decision],
    ) -> anyhow::Result<VerifierPass> {
        anyhow::bail!("verifier offline")
    }
}

fn fast_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.retry.max_attempts = 2;
    config.retry.base_delay_ms = 1;
    config.retry.max_delay_ms = 2;
    config
}

#[tokio::test]
async fn clean_rct_document_passes_without_human_review() {
    let config = fast_config();
    let document = pipeline::run_document(
        &FixedExtractor(rct_driver_output()),
        &AgreeingVerifier,
        None,
        &config,
        "Methods. Forty patients were randomized.",
    )
    .await
    .unwrap();

    assert_eq!(document.study_type, StudyType::Rct);
    assert_eq!(document.paper_id.pmid, Some(123_456));
    assert!(!document.validation.needs_human_review);
    assert!(document.validation.issues.is_empty());

    // every leaf path got a verdict; none is MISSING
    assert!(document
        .verification
        .critical_decisions
        .iter()
        .all(|cd| cd.status == srx_verify::DecisionStatus::Agree));
    assert!(document
        .verification
        .critical_decisions
        .iter()
        .any(|cd| cd.path == "/study_type"));

    // score computed from the one affirmative RCT question
    assert_eq!(
        pointer::get_scalar(&document.record, "/sheets/rct_appraisal/total_score"),
        Scalar::Int(1)
    );
}

#[tokio::test]
async fn disagreement_is_patched_and_re_reviewed() {
    let config = fast_config();
    let verifier = DisagreeOnceVerifier {
        target: "/record/sheets/included_articles/n_pts".to_string(),
        corrected: Scalar::Int(44),
        fired: Mutex::new(false),
    };

    let document = pipeline::run_document(
        &FixedExtractor(rct_driver_output()),
        &verifier,
        None,
        &config,
        "text",
    )
    .await
    .unwrap();

    // the patch landed in the final record
    assert_eq!(
        pointer::get_scalar(&document.record, "/sheets/included_articles/n_pts"),
        Scalar::Int(44)
    );
    // round 2 re-reviewed the flagged path and now agrees, so nothing is critical
    assert!(!document.validation.needs_human_review);
    assert!(document.verification.passes.len() >= 2);
    let n_pts = document
        .verification
        .critical_decisions
        .iter()
        .find(|cd| cd.path == "/record/sheets/included_articles/n_pts")
        .unwrap();
    assert_eq!(n_pts.status, srx_verify::DecisionStatus::Agree);
    assert_eq!(n_pts.final_value, Scalar::Int(44));
}

#[tokio::test]
async fn unreviewed_decisions_force_human_review() {
    let config = fast_config();
    let document = pipeline::run_document(
        &FixedExtractor(rct_driver_output()),
        &SilentVerifier,
        None,
        &config,
        "text",
    )
    .await
    .unwrap();

    assert!(document.validation.needs_human_review);
    assert!(document
        .verification
        .critical_decisions
        .iter()
        .all(|cd| cd.status == srx_verify::DecisionStatus::Missing));
    assert!(document
        .validation
        .issues
        .iter()
        .any(|i| i.code == "MISSING_VERIFIER_REVIEW"));
}

#[tokio::test]
async fn verifier_failure_aborts_the_document() {
    let config = fast_config();
    let err = pipeline::run_document(
        &FixedExtractor(rct_driver_output()),
        &BrokenVerifier,
        None,
        &config,
        "text",
    )
    .await
    .unwrap_err();

    match err {
        PipelineError::ExternalCall { role, attempts, .. } => {
            assert_eq!(role, "verifier");
            assert_eq!(attempts, 2);
        }
        other => panic!("expected ExternalCall, got {other:?}"),
    }
}

#[tokio::test]
async fn abba_refuses_when_runs_disagree_without_adjudication() {
    let config = fast_config();
    let doc_a = pipeline::run_document(
        &FixedExtractor(rct_driver_output()),
        &AgreeingVerifier,
        None,
        &config,
        "text",
    )
    .await
    .unwrap();

    let mut output_b = rct_driver_output();
    output_b.record = node(
        r#"{"sheets": {
            "included_articles": {"n_pts": 44, "site_both": 1, "route_iv": 1},
            "rct_appraisal": {"q1_randomized": 1, "q2_randomization_method": 0}
        }}"#,
    );
    let doc_b = pipeline::run_document(
        &FixedExtractor(output_b),
        &AgreeingVerifier,
        None,
        &config,
        "text",
    )
    .await
    .unwrap();

    let err = abba::run_abba(&doc_a, &doc_b, None, &config, "text")
        .await
        .unwrap_err();
    match err {
        PipelineError::UnresolvedMismatches(mismatches) => {
            assert_eq!(mismatches.len(), 1);
            assert_eq!(mismatches[0].path, "/record/sheets/included_articles/n_pts");
        }
        other => panic!("expected UnresolvedMismatches, got {other:?}"),
    }
}

#[tokio::test]
async fn abba_identical_runs_reconcile_to_a() {
    let config = fast_config();
    let doc = pipeline::run_document(
        &FixedExtractor(rct_driver_output()),
        &AgreeingVerifier,
        None,
        &config,
        "text",
    )
    .await
    .unwrap();

    let reconciled = abba::run_abba(&doc, &doc, None, &config, "text")
        .await
        .unwrap();
    assert_eq!(
        pointer::get_scalar(&reconciled, "/record/sheets/included_articles/n_pts"),
        Scalar::Int(40)
    );
    assert_eq!(
        pointer::get_scalar(&reconciled, "/paper_id/pmid"),
        Scalar::Int(123_456)
    );
}
