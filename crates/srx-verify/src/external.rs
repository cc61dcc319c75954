//! Agent and output seams.
//!
//! The pipeline is written against these traits so tests can substitute
//! deterministic fakes for the live LLM adapters in [`crate::client`].

use crate::types::{Adjudication, DriverOutput, Mismatch, VerifierPass};
use async_trait::async_trait;
use srx_core::{Decision, Node};

/// Extraction agent: turns paper text into a structured record plus claims.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Run one extraction over the condensed paper view.
    async fn extract(&self, view: &str) -> anyhow::Result<DriverOutput>;
}

/// Verification agent: reviews one chunk of decisions against the paper.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Review `decisions` against the paper view and current record.
    async fn verify_chunk(
        &self,
        view: &str,
        record: &Node,
        decisions: &[Decision],
    ) -> anyhow::Result<VerifierPass>;
}

/// Supervisor agent: settles cross-driver mismatches.
#[async_trait]
pub trait Adjudicator: Send + Sync {
    /// Adjudicate the given mismatches against the paper view.
    async fn adjudicate(
        &self,
        view: &str,
        mismatches: &[Mismatch],
    ) -> anyhow::Result<Vec<Adjudication>>;
}

/// PMID lookup for papers whose extraction left the identifier null.
#[async_trait]
pub trait PmidResolver: Send + Sync {
    /// Resolve a PMID from the paper's title and optional DOI.
    /// `Ok(None)` means not found.
    async fn resolve(&self, title: &str, doi: Option<&str>) -> anyhow::Result<Option<String>>;
}

/// Sink for the reconciled record (spreadsheet row, database row, ...).
pub trait WorkbookWriter: Send + Sync {
    /// Append one reconciled document to the workbook.
    ///
    /// # Errors
    /// Returns an error if the sink cannot be written.
    fn append(&mut self, document: &crate::types::FinalDocument) -> anyhow::Result<()>;
}

/// Sink for the human-review log.
pub trait ReviewLogWriter: Send + Sync {
    /// Append one document's review summary to the log.
    ///
    /// # Errors
    /// Returns an error if the sink cannot be written.
    fn append(&mut self, document: &crate::types::FinalDocument) -> anyhow::Result<()>;
}
