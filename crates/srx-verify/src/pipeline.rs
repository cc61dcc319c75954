//! End-to-end document pipeline.
//!
//! One document flows view -> driver -> two verification rounds -> final
//! document. Documents in a batch run strictly sequentially because each
//! workbook append feeds the next paper's template.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::external::{Extractor, PmidResolver, Verifier};
use crate::reconcile::{backfill_pmid, build_final_document, verify_document};
use crate::retry::with_backoff;
use crate::types::{DriverOutput, FinalDocument};
use crate::view::make_view;
use srx_core::{Group, Node, Scalar};

/// Assemble the working record tree from one driver output.
#[must_use]
pub fn driver_root(output: &DriverOutput) -> Node {
    let mut group = Group::new();

    let mut paper_id = Group::new();
    paper_id.insert(
        "pmid".to_string(),
        output
            .paper_id
            .pmid
            .map_or_else(Node::null, |p| Node::Scalar(Scalar::Int(p))),
    );
    paper_id.insert(
        "doi".to_string(),
        output
            .paper_id
            .doi
            .as_deref()
            .map_or_else(Node::null, |d| Node::Scalar(Scalar::Str(d.to_string()))),
    );
    paper_id.insert(
        "title".to_string(),
        output
            .paper_id
            .title
            .as_deref()
            .map_or_else(Node::null, |t| Node::Scalar(Scalar::Str(t.to_string()))),
    );

    group.insert("paper_id".to_string(), Node::Group(paper_id));
    group.insert(
        "study_type".to_string(),
        Node::Scalar(Scalar::Str(output.study_type.to_string())),
    );
    group.insert("record".to_string(), output.record.clone());
    Node::Group(group)
}

/// Run the full pipeline for one paper's text.
///
/// # Errors
/// Fails closed on any driver or verifier failure after retries.
pub async fn run_document(
    extractor: &dyn Extractor,
    verifier: &dyn Verifier,
    resolver: Option<&dyn PmidResolver>,
    config: &PipelineConfig,
    full_text: &str,
) -> Result<FinalDocument> {
    let view = make_view(full_text, config.max_view_chars);
    tracing::info!(view_chars = view.len(), "view built, calling driver");

    let output = with_backoff(&config.retry, "driver", || extractor.extract(&view))
        .await
        .map_err(|source| PipelineError::ExternalCall {
            role: "driver",
            attempts: config.retry.max_attempts,
            source,
        })?;

    let mut root = driver_root(&output);
    if let Some(resolver) = resolver {
        backfill_pmid(resolver, &mut root).await?;
    }

    let (merged, passes) = verify_document(
        verifier,
        config,
        &view,
        &root,
        &output.critical_decisions,
    )
    .await?;

    Ok(build_final_document(merged, passes, &config.verifier_model))
}
