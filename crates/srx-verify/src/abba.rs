//! Cross-driver (ABBA) comparison and supervisor adjudication.
//!
//! Two independent pipelines run with the extractor/verifier roles swapped.
//! Their final documents are compared leaf by leaf; disagreements either go
//! to the adjudicator or abort the run. There is no silent preference for
//! either run: every unresolved mismatch is a hard refusal.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::external::Adjudicator;
use crate::retry::with_backoff;
use crate::types::{AdjudicationPick, FinalDocument, Mismatch};
use srx_core::{leaf_paths, normalize_pmid, pointer, values_match, Group, Node, Scalar};

const PMID_PATH: &str = "/paper_id/pmid";
const IDENTITY_PATHS: [&str; 3] = [PMID_PATH, "/paper_id/doi", "/paper_id/title"];

/// Build the comparison payload for one final document.
///
/// Only identity, classification, and the record tree participate; the
/// verification trail is run-specific and never compared.
#[must_use]
pub fn comparison_payload(document: &FinalDocument) -> Node {
    let mut paper_id = Group::new();
    paper_id.insert(
        "pmid".to_string(),
        document
            .paper_id
            .pmid
            .map_or_else(Node::null, |p| Node::Scalar(Scalar::Int(p))),
    );
    paper_id.insert(
        "doi".to_string(),
        document
            .paper_id
            .doi
            .as_deref()
            .map_or_else(Node::null, |d| Node::Scalar(Scalar::Str(d.to_string()))),
    );
    paper_id.insert(
        "title".to_string(),
        document
            .paper_id
            .title
            .as_deref()
            .map_or_else(Node::null, |t| Node::Scalar(Scalar::Str(t.to_string()))),
    );

    let mut group = Group::new();
    group.insert("paper_id".to_string(), Node::Group(paper_id));
    group.insert(
        "study_type".to_string(),
        Node::Scalar(Scalar::Str(document.study_type.to_string())),
    );
    group.insert("record".to_string(), document.record.clone());
    Node::Group(group)
}

/// Paths compared between the two payloads: A's leaf paths in order, then
/// B's paths A lacks, then the identity paths.
#[must_use]
pub fn comparison_paths(a: &Node, b: &Node) -> Vec<String> {
    let mut paths = leaf_paths(a);
    let mut seen: std::collections::HashSet<String> = paths.iter().cloned().collect();
    for path in leaf_paths(b) {
        if seen.insert(path.clone()) {
            paths.push(path);
        }
    }
    for path in IDENTITY_PATHS {
        if seen.insert(path.to_string()) {
            paths.push(path.to_string());
        }
    }
    paths
}

/// Compare the two payloads, returning every mismatching path.
///
/// PMIDs are canonicalized before comparison so `123456`, `"123456"`, and
/// `"123456.0"` never count as a mismatch. All other values compare through
/// the configured numeric tolerances.
#[must_use]
pub fn compare(a: &Node, b: &Node, config: &PipelineConfig) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();
    for path in comparison_paths(a, b) {
        let value_a = pointer::get_scalar(a, &path);
        let value_b = pointer::get_scalar(b, &path);

        let matches = if path == PMID_PATH {
            normalize_pmid(&value_a) == normalize_pmid(&value_b)
        } else {
            values_match(&value_a, &value_b, config.abs_tol, config.rel_tol)
        };

        if !matches {
            mismatches.push(Mismatch {
                path,
                value_a,
                value_b,
            });
        }
    }
    mismatches
}

/// Resolve mismatches into a reconciled payload seeded from A.
///
/// With no mismatches, A wins outright. Otherwise each adjudicator PICK_B
/// overwrites A's value at that path; PICK_A keeps it. Paths the adjudicator
/// left UNSURE, skipped, or could not be reached at all stay unresolved and
/// the whole run is refused with the surviving mismatch list.
///
/// # Errors
/// - [`PipelineError::UnresolvedMismatches`] when any mismatch survives.
/// - [`PipelineError::ExternalCall`] when the adjudicator fails after retries.
pub async fn resolve(
    a: &Node,
    b: &Node,
    mismatches: Vec<Mismatch>,
    adjudicator: Option<&dyn Adjudicator>,
    config: &PipelineConfig,
    view: &str,
) -> Result<Node> {
    if mismatches.is_empty() {
        return Ok(a.clone());
    }

    let Some(adjudicator) = adjudicator else {
        return Err(PipelineError::UnresolvedMismatches(mismatches));
    };

    let verdicts = with_backoff(&config.retry, "adjudicator", || {
        adjudicator.adjudicate(view, &mismatches)
    })
    .await
    .map_err(|source| PipelineError::ExternalCall {
        role: "adjudicator",
        attempts: config.retry.max_attempts,
        source,
    })?;

    let picks: std::collections::HashMap<&str, AdjudicationPick> = verdicts
        .iter()
        .map(|v| (v.path.as_str(), v.pick))
        .collect();

    let mut reconciled = a.clone();
    let mut unresolved = Vec::new();
    for mismatch in mismatches {
        match picks.get(mismatch.path.as_str()) {
            Some(AdjudicationPick::PickA) => {}
            Some(AdjudicationPick::PickB) => {
                let value = pointer::get(b, &mismatch.path)
                    .cloned()
                    .unwrap_or_else(Node::null);
                pointer::set(&mut reconciled, &mismatch.path, value)?;
            }
            Some(AdjudicationPick::Unsure) | None => unresolved.push(mismatch),
        }
    }

    if !unresolved.is_empty() {
        return Err(PipelineError::UnresolvedMismatches(unresolved));
    }
    Ok(reconciled)
}

/// Compare two final documents and produce the reconciled payload.
///
/// # Errors
/// See [`resolve`].
pub async fn run_abba(
    doc_a: &FinalDocument,
    doc_b: &FinalDocument,
    adjudicator: Option<&dyn Adjudicator>,
    config: &PipelineConfig,
    view: &str,
) -> Result<Node> {
    let payload_a = comparison_payload(doc_a);
    let payload_b = comparison_payload(doc_b);
    let mismatches = compare(&payload_a, &payload_b, config);
    tracing::info!(mismatches = mismatches.len(), "cross-driver comparison");
    resolve(&payload_a, &payload_b, mismatches, adjudicator, config, view).await
}
