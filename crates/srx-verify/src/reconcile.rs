//! Two-round verification reconciliation.
//!
//! Round 1 reviews every decision (driver claims plus the leaf-path union).
//! Suggested patches fold into the working record in chunk-index order, so
//! each chunk's verifier sees every earlier chunk's corrections. Round 2
//! re-reviews only the paths round 1 flagged DISAGREE or UNSURE, with fresh
//! values read from the patched record.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::external::Verifier;
use crate::retry::with_backoff;
use crate::types::{
    CriticalDecision, DecisionReview, DecisionStatus, FinalDocument, ReviewStatus, Validation,
    Verification, VerifierPass, DOCUMENT_VERSION,
};
use srx_core::issue::codes;
use srx_core::{
    dedupe_decisions, leaf_paths, merge, needs_human_review, pointer, record, rules, Decision,
    Node, Scalar, ValidationIssue, STUDY_TYPE_PATH,
};
use std::collections::HashMap;

/// Build the round-1 review list from the driver's output.
///
/// Driver decisions come first (first-seen wins per path), `/study_type` is
/// guaranteed present, and every leaf path not already claimed is appended
/// with its current record value and empty evidence. Null leaves are still
/// decisions.
#[must_use]
pub fn build_review_list(root: &Node, driver_decisions: &[Decision]) -> Vec<Decision> {
    let mut out: Vec<Decision> = Vec::new();
    let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();

    for decision in driver_decisions {
        if decision.path.is_empty() || seen.contains(&decision.path) {
            continue;
        }
        let mut decision = decision.clone();
        decision.is_critical = true;
        decision.backfill_page();
        seen.insert(decision.path.clone());
        out.push(decision);
    }

    if !seen.contains(STUDY_TYPE_PATH) {
        out.push(Decision::new(
            STUDY_TYPE_PATH,
            pointer::get_scalar(root, STUDY_TYPE_PATH),
            "Driver classification; verify against methods/abstract.",
        ));
        seen.insert(STUDY_TYPE_PATH.to_string());
    }

    for path in leaf_paths(root) {
        if seen.contains(&path) {
            continue;
        }
        let value = pointer::get_scalar(root, &path);
        seen.insert(path.clone());
        out.push(Decision::new(path, value, ""));
    }

    out
}

/// Split decisions into verifier chunks.
#[must_use]
pub fn chunk_decisions(decisions: &[Decision], chunk_size: usize) -> Vec<Vec<Decision>> {
    decisions
        .chunks(chunk_size.max(1))
        .map(<[Decision]>::to_vec)
        .collect()
}

/// Strip keys the verifier must not see from a record copy.
///
/// The working record can carry `verification`/`validation` sections when a
/// document is re-run from a prior audit dump; reviewing those would let the
/// verifier grade its own homework.
#[must_use]
pub fn sanitize_for_review(root: &Node) -> Node {
    let mut copy = root.clone();
    if let Some(group) = copy.as_group_mut() {
        group.shift_remove("verification");
        group.shift_remove("validation");
    }
    copy
}

/// Run both verification rounds, folding patches as they arrive.
///
/// Returns the patched working record and every pass in call order.
///
/// # Errors
/// Fails closed: a chunk that exhausts its retries aborts the document.
pub async fn verify_document(
    verifier: &dyn Verifier,
    config: &PipelineConfig,
    view: &str,
    root: &Node,
    driver_decisions: &[Decision],
) -> Result<(Node, Vec<VerifierPass>)> {
    let mut working = root.clone();
    let mut passes: Vec<VerifierPass> = Vec::new();

    let decisions = build_review_list(&working, driver_decisions);
    let chunks = chunk_decisions(&decisions, config.chunk_size);
    tracing::info!(decisions = decisions.len(), chunks = chunks.len(), "verifier round 1");

    for (idx, chunk) in chunks.iter().enumerate() {
        tracing::debug!(chunk = idx + 1, total = chunks.len(), "verifier round 1 chunk");
        run_chunk(verifier, config, view, &mut working, chunk, &mut passes).await?;
    }

    // round 2: only the paths round 1 flagged, with fresh values
    let mut flagged: Vec<String> = Vec::new();
    let mut flagged_seen: std::collections::HashSet<&str> = std::collections::HashSet::new();
    for pass in &passes {
        for review in &pass.decision_reviews {
            if matches!(review.status, ReviewStatus::Disagree | ReviewStatus::Unsure)
                && !review.path.is_empty()
                && flagged_seen.insert(review.path.as_str())
            {
                flagged.push(review.path.clone());
            }
        }
    }

    if flagged.is_empty() {
        tracing::info!("verifier round 2 skipped (no flagged decisions)");
        return Ok((working, passes));
    }

    tracing::info!(flagged = flagged.len(), "verifier round 2");
    let round2: Vec<Decision> = flagged
        .iter()
        .map(|path| Decision::new(path.clone(), pointer::get_scalar(&working, path), ""))
        .collect();

    let chunks = chunk_decisions(&round2, config.chunk_size);
    for (idx, chunk) in chunks.iter().enumerate() {
        tracing::debug!(chunk = idx + 1, total = chunks.len(), "verifier round 2 chunk");
        run_chunk(verifier, config, view, &mut working, chunk, &mut passes).await?;
    }

    Ok((working, passes))
}

async fn run_chunk(
    verifier: &dyn Verifier,
    config: &PipelineConfig,
    view: &str,
    working: &mut Node,
    chunk: &[Decision],
    passes: &mut Vec<VerifierPass>,
) -> Result<()> {
    let sanitized = sanitize_for_review(working);
    let pass = with_backoff(&config.retry, "verifier", || {
        verifier.verify_chunk(view, &sanitized, chunk)
    })
    .await
    .map_err(|source| PipelineError::ExternalCall {
        role: "verifier",
        attempts: config.retry.max_attempts,
        source,
    })?;

    if let Some(patch) = &pass.suggested_patch {
        if patch.as_group().is_some_and(|g| !g.is_empty()) {
            *working = merge(working, patch);
        }
    }
    passes.push(pass);
    Ok(())
}

/// Compile the per-path critical-decision report from all passes.
///
/// The latest review of a path (across both rounds, in pass order) wins.
/// Paths no pass reviewed are MISSING and CRITICAL. AGREE entries settle on
/// the merged record's value; DISAGREE/UNSURE settle on the verifier's
/// `proposed_value` when present, else the `driver_value` it was shown, and
/// raise a CRITICAL issue.
#[must_use]
pub fn compile_report(
    passes: &[VerifierPass],
    critical_paths: &[String],
    merged: &Node,
) -> (Vec<CriticalDecision>, Vec<ValidationIssue>) {
    let mut latest: HashMap<&str, &DecisionReview> = HashMap::new();
    for pass in passes {
        for review in &pass.decision_reviews {
            if !review.path.is_empty() {
                latest.insert(review.path.as_str(), review);
            }
        }
    }

    let mut report = Vec::with_capacity(critical_paths.len());
    let mut issues = Vec::new();

    for path in critical_paths {
        let Some(review) = latest.get(path.as_str()) else {
            report.push(CriticalDecision {
                path: path.clone(),
                final_value: pointer::get_scalar(merged, path),
                status: DecisionStatus::Missing,
                explanation: "Missing verifier review for critical decision.".to_string(),
                evidence: String::new(),
            });
            issues.push(ValidationIssue::critical(
                codes::MISSING_VERIFIER_REVIEW,
                format!("Critical decision not reviewed by verifier: {path}"),
                path.clone(),
            ));
            continue;
        };

        let final_value = match review.status {
            ReviewStatus::Agree => pointer::get_scalar(merged, path),
            ReviewStatus::Disagree | ReviewStatus::Unsure => review
                .proposed_value
                .clone()
                .unwrap_or_else(|| review.driver_value.clone()),
        };

        report.push(CriticalDecision {
            path: path.clone(),
            final_value,
            status: review.status.into(),
            explanation: review.explanation.clone(),
            evidence: review.evidence.clone(),
        });

        match review.status {
            ReviewStatus::Agree => {}
            ReviewStatus::Disagree => issues.push(ValidationIssue::critical(
                codes::VERIFIER_DISAGREE,
                format!("Verifier status DISAGREE for critical decision: {path}"),
                path.clone(),
            )),
            ReviewStatus::Unsure => issues.push(ValidationIssue::critical(
                codes::VERIFIER_UNSURE,
                format!("Verifier status UNSURE for critical decision: {path}"),
                path.clone(),
            )),
        }
    }

    (report, issues)
}

/// Assemble the final per-paper document from the patched record and passes.
///
/// Computes appraisal scores, compiles the critical-decision report, runs the
/// rule validator and the sheet-consistency check, and sets
/// `needs_human_review` from the combined issue list.
#[must_use]
pub fn build_final_document(
    merged: Node,
    passes: Vec<VerifierPass>,
    verifier_model: &str,
) -> FinalDocument {
    let mut merged = merged;
    // enumerate before scoring so derived total_score leaves never demand a review
    let critical_paths = leaf_paths(&merged);
    rules::compute_scores(&mut merged);

    let (critical_decisions, mut issues) = compile_report(&passes, &critical_paths, &merged);
    issues.extend(rules::rule_validation(&merged));
    issues.extend(record::check_sheet_consistency(&merged));

    let paper_id = record::paper_id_of(&merged);
    let study_type = record::study_type_of(&merged);
    let record_tree = merged
        .child("record")
        .cloned()
        .unwrap_or_else(|| {
            let mut group = srx_core::Group::new();
            group.insert("sheets".to_string(), Node::group());
            Node::Group(group)
        });

    FinalDocument {
        version: DOCUMENT_VERSION.to_string(),
        generated_at: chrono::Utc::now(),
        paper_id,
        study_type,
        record: record_tree,
        verification: Verification {
            verifier_model: verifier_model.to_string(),
            passes,
            critical_decisions,
        },
        validation: Validation {
            needs_human_review: needs_human_review(&issues),
            issues,
        },
    }
}

/// Resolve a missing PMID through the resolver, writing it into the record.
///
/// Lookup failures are logged at WARN and treated as not-found.
pub async fn backfill_pmid(
    resolver: &dyn crate::external::PmidResolver,
    root: &mut Node,
) -> Result<()> {
    let id = record::paper_id_of(root);
    if id.pmid.is_some() {
        return Ok(());
    }
    let Some(title) = id.title.as_deref().filter(|t| !t.trim().is_empty()) else {
        return Ok(());
    };

    let looked_up = match resolver.resolve(title, id.doi.as_deref()).await {
        Ok(result) => result,
        Err(err) => {
            tracing::warn!(error = %err, "PMID lookup failed, leaving pmid null");
            None
        }
    };

    if let Some(pmid) = looked_up {
        let scalar = pmid
            .parse::<i64>()
            .map_or_else(|_| Scalar::Str(pmid), Scalar::Int);
        pointer::set(root, "/paper_id/pmid", Node::Scalar(scalar))?;
    }
    Ok(())
}

/// Collapse repeated driver claims before building the review list.
#[inline]
#[must_use]
pub fn collapse_driver_decisions(task_results: &[Vec<Decision>]) -> Vec<Decision> {
    dedupe_decisions(task_results)
}
