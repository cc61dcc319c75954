//! Wire types exchanged with the agents and written to the audit trail.

use serde::{Deserialize, Serialize};
use srx_core::{Decision, Node, PaperId, Scalar, StudyType, ValidationIssue};

/// Schema version stamped on every final document.
pub const DOCUMENT_VERSION: &str = "srx/3";

/// The full output of one driver (extraction) run over a paper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverOutput {
    /// Extracted paper identity.
    #[serde(default)]
    pub paper_id: PaperId,
    /// Classified study design.
    #[serde(default)]
    pub study_type: StudyType,
    /// The extracted working record tree.
    pub record: Node,
    /// Field-level claims flagged for mandatory verification.
    #[serde(default)]
    pub critical_decisions: Vec<Decision>,
    /// Driver's self-reported confidence, 0.0-1.0.
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Free-text extraction notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Verifier's judgment on a single reviewed decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReviewStatus {
    /// The driver's value is supported by the paper.
    Agree,
    /// The driver's value contradicts the paper.
    Disagree,
    /// The paper does not settle the question.
    Unsure,
}

impl std::fmt::Display for ReviewStatus {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Agree => write!(f, "AGREE"),
            Self::Disagree => write!(f, "DISAGREE"),
            Self::Unsure => write!(f, "UNSURE"),
        }
    }
}

/// Per-path status in the critical-decision report.
///
/// Extends [`ReviewStatus`] with `Missing` for paths no verifier pass
/// reviewed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DecisionStatus {
    /// Latest review agreed.
    Agree,
    /// Latest review disagreed.
    Disagree,
    /// Latest review was unsure.
    Unsure,
    /// No pass reviewed this path.
    Missing,
}

impl std::fmt::Display for DecisionStatus {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Agree => write!(f, "AGREE"),
            Self::Disagree => write!(f, "DISAGREE"),
            Self::Unsure => write!(f, "UNSURE"),
            Self::Missing => write!(f, "MISSING"),
        }
    }
}

impl From<ReviewStatus> for DecisionStatus {
    #[inline]
    fn from(status: ReviewStatus) -> Self {
        match status {
            ReviewStatus::Agree => Self::Agree,
            ReviewStatus::Disagree => Self::Disagree,
            ReviewStatus::Unsure => Self::Unsure,
        }
    }
}

/// One verifier review of one decision path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionReview {
    /// Pointer into the working record.
    pub path: String,
    /// Whether the reviewed decision was critical.
    #[serde(default)]
    pub is_critical: bool,
    /// The verifier's judgment.
    pub status: ReviewStatus,
    /// The driver value the verifier was shown.
    #[serde(default)]
    pub driver_value: Scalar,
    /// The verifier's replacement value, when it proposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_value: Option<Scalar>,
    /// One-sentence explanation of the judgment.
    #[serde(default)]
    pub explanation: String,
    /// Supporting quote or location in the paper.
    #[serde(default)]
    pub evidence: String,
}

/// One verifier pass over a chunk of decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierPass {
    /// Overall verdict for the chunk.
    #[serde(default)]
    pub verdict: Option<String>,
    /// Free-text critical errors the verifier noticed beyond the chunk.
    #[serde(default)]
    pub critical_errors: Vec<String>,
    /// Per-decision reviews.
    #[serde(default)]
    pub decision_reviews: Vec<DecisionReview>,
    /// A record patch to fold into the working record, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_patch: Option<Node>,
    /// The verifier's overall rationale.
    #[serde(default)]
    pub rationale: Option<String>,
    /// Verifier's self-reported confidence, 0.0-1.0.
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Final per-path entry in the critical-decision report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalDecision {
    /// Pointer into the working record.
    pub path: String,
    /// The value the entry settles on, see [`crate::reconcile::compile_report`].
    pub final_value: Scalar,
    /// Latest review status, or MISSING.
    pub status: DecisionStatus,
    /// Latest review explanation, if any.
    #[serde(default)]
    pub explanation: String,
    /// Latest review evidence, if any.
    #[serde(default)]
    pub evidence: String,
}

/// The verification section of the final document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verification {
    /// Model that produced the verifier passes.
    pub verifier_model: String,
    /// All passes, in chunk order (round one then round two).
    pub passes: Vec<VerifierPass>,
    /// The compiled critical-decision report.
    pub critical_decisions: Vec<CriticalDecision>,
}

/// The validation section of the final document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Validation {
    /// True when any issue is CRITICAL.
    pub needs_human_review: bool,
    /// All findings, rule checks and reconciliation gaps alike.
    pub issues: Vec<ValidationIssue>,
}

/// The complete per-paper audit document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalDocument {
    /// Schema version, see [`DOCUMENT_VERSION`].
    pub version: String,
    /// When this document was assembled.
    pub generated_at: chrono::DateTime<chrono::Utc>,
    /// Paper identity.
    pub paper_id: PaperId,
    /// Classified study design.
    pub study_type: StudyType,
    /// The reconciled working record.
    pub record: Node,
    /// Verification trail.
    pub verification: Verification,
    /// Validation outcome.
    pub validation: Validation,
}

/// One path where two independent drivers disagreed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mismatch {
    /// Pointer into the comparison payload.
    pub path: String,
    /// Driver A's value.
    pub value_a: Scalar,
    /// Driver B's value.
    pub value_b: Scalar,
}

/// Adjudicator's pick for one mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjudicationPick {
    /// Driver A's value is correct.
    PickA,
    /// Driver B's value is correct.
    PickB,
    /// The paper does not settle it.
    Unsure,
}

/// One adjudication verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adjudication {
    /// Pointer the verdict applies to.
    pub path: String,
    /// The pick.
    pub pick: AdjudicationPick,
    /// One-sentence rationale.
    #[serde(default)]
    pub rationale: Option<String>,
}
