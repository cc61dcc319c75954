//! Core data model and pure algorithms for extraction reconciliation.
//!
//! Everything in this crate is synchronous and deterministic: the working
//! record tree, pointer addressing, patch merging, decision bookkeeping,
//! value normalization, and the rule validator. The async pipeline in
//! `srx-verify` builds on these primitives.

pub mod decision;
pub mod error;
pub mod issue;
pub mod leaf;
pub mod merge;
pub mod normalize;
pub mod pointer;
pub mod record;
pub mod rules;
pub mod value;

pub use decision::{dedupe_decisions, Decision};
pub use error::{CoreError, Result};
pub use issue::{needs_human_review, Severity, ValidationIssue};
pub use leaf::{leaf_paths, STUDY_TYPE_PATH};
pub use merge::merge;
pub use normalize::{normalize_pmid, values_match, values_match_default};
pub use record::{study_type_of, PaperId, StudyType};
pub use value::{Group, Node, Scalar};
