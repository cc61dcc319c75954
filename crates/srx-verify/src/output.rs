//! Audit and review outputs.

use crate::error::{PipelineError, Result};
use crate::external::{ReviewLogWriter, WorkbookWriter};
use crate::types::FinalDocument;
use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Write the pretty-printed audit document for one paper.
///
/// # Errors
/// Returns an error on serialization or filesystem failure.
pub fn write_audit_json(path: &Path, document: &FinalDocument) -> Result<()> {
    let json = serde_json::to_string_pretty(document)?;
    fs::write(path, json)?;
    Ok(())
}

/// Persist one document through both output sinks.
///
/// Refuses outright when the document carries zero verifier passes: an
/// unverified record must never reach the workbook.
///
/// # Errors
/// - [`PipelineError::RefusedNoVerifierPasses`] when no pass exists.
/// - Any sink failure, wrapped as an external-call error.
pub fn apply_outputs(
    document: &FinalDocument,
    workbook: &mut dyn WorkbookWriter,
    review_log: &mut dyn ReviewLogWriter,
) -> Result<()> {
    if document.verification.passes.is_empty() {
        return Err(PipelineError::RefusedNoVerifierPasses);
    }
    workbook
        .append(document)
        .map_err(|source| PipelineError::ExternalCall {
            role: "workbook",
            attempts: 1,
            source,
        })?;
    review_log
        .append(document)
        .map_err(|source| PipelineError::ExternalCall {
            role: "review log",
            attempts: 1,
            source,
        })?;
    Ok(())
}

/// Render the human-review summary for one document.
#[must_use]
pub fn render_summary(document: &FinalDocument) -> String {
    let mut out = String::new();
    let pmid = document
        .paper_id
        .pmid
        .map_or_else(|| "null".to_string(), |p| p.to_string());
    let _ = writeln!(out, "PMID: {pmid}");
    if let Some(title) = &document.paper_id.title {
        let _ = writeln!(out, "Title: {title}");
    }
    if let Some(doi) = &document.paper_id.doi {
        let _ = writeln!(out, "DOI: {doi}");
    }
    let _ = writeln!(out, "Study type: {}", document.study_type);
    let _ = writeln!(
        out,
        "Needs human review: {}",
        if document.validation.needs_human_review {
            "YES"
        } else {
            "NO"
        }
    );

    let _ = writeln!(out, "\nCritical decisions (verifier):");
    for cd in &document.verification.critical_decisions {
        let _ = writeln!(
            out,
            "  {path}\t{status}\t{explanation}\t{evidence}",
            path = cd.path,
            status = cd.status,
            explanation = cd.explanation,
            evidence = cd.evidence,
        );
    }

    let _ = writeln!(out, "\nValidation issues:");
    if document.validation.issues.is_empty() {
        let _ = writeln!(out, "  None.");
    } else {
        for issue in &document.validation.issues {
            let _ = writeln!(
                out,
                "  [{severity}] {code}: {message} (path={path})",
                severity = issue.severity,
                code = issue.code,
                message = issue.message,
                path = issue.path,
            );
        }
    }

    let _ = writeln!(out, "\nVerifier passes summary:");
    for (i, pass) in document.verification.passes.iter().enumerate() {
        let _ = writeln!(
            out,
            "  pass {n}: verdict={verdict} confidence={confidence} errors={errors}",
            n = i + 1,
            verdict = pass.verdict.as_deref().unwrap_or("-"),
            confidence = pass
                .confidence
                .map_or_else(|| "-".to_string(), |c| format!("{c:.2}")),
            errors = pass.critical_errors.join("; "),
        );
    }

    out
}

/// Workbook sink that appends one JSON line per reconciled document.
#[derive(Debug)]
pub struct JsonlWorkbook {
    path: PathBuf,
}

impl JsonlWorkbook {
    /// Bind the sink to a file path; the file is created on first append.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl WorkbookWriter for JsonlWorkbook {
    fn append(&mut self, document: &FinalDocument) -> anyhow::Result<()> {
        let mut row = serde_json::Map::new();
        row.insert("paper_id".to_string(), serde_json::to_value(&document.paper_id)?);
        row.insert(
            "study_type".to_string(),
            serde_json::to_value(document.study_type)?,
        );
        row.insert("record".to_string(), serde_json::to_value(&document.record)?);

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        serde_json::to_writer(&mut file, &row)?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

/// Review-log sink that appends plain-text summaries.
#[derive(Debug)]
pub struct TextReviewLog {
    path: PathBuf,
}

impl TextReviewLog {
    /// Bind the sink to a file path; the file is created on first append.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReviewLogWriter for TextReviewLog {
    fn append(&mut self, document: &FinalDocument) -> anyhow::Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(render_summary(document).as_bytes())?;
        file.write_all(b"\n---\n\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Validation, Verification, VerifierPass};
    use srx_core::{Node, PaperId, StudyType};

    fn empty_doc(passes: Vec<VerifierPass>) -> FinalDocument {
        FinalDocument {
            version: "srx/3".to_string(),
            generated_at: chrono::Utc::now(),
            paper_id: PaperId {
                pmid: Some(123),
                doi: None,
                title: Some("T".to_string()),
            },
            study_type: StudyType::Rct,
            record: Node::group(),
            verification: Verification {
                verifier_model: "m".to_string(),
                passes,
                critical_decisions: Vec::new(),
            },
            validation: Validation {
                needs_human_review: false,
                issues: Vec::new(),
            },
        }
    }

    fn blank_pass() -> VerifierPass {
        VerifierPass {
            verdict: Some("PASS".to_string()),
            critical_errors: Vec::new(),
            decision_reviews: Vec::new(),
            suggested_patch: None,
            rationale: None,
            confidence: Some(0.9),
        }
    }

    #[test]
    fn test_apply_outputs_refuses_without_passes() {
        let dir = tempfile::tempdir().unwrap();
        let mut workbook = JsonlWorkbook::new(dir.path().join("out.jsonl"));
        let mut log = TextReviewLog::new(dir.path().join("review.txt"));
        let err = apply_outputs(&empty_doc(vec![]), &mut workbook, &mut log).unwrap_err();
        assert!(matches!(err, PipelineError::RefusedNoVerifierPasses));
        assert!(!dir.path().join("out.jsonl").exists());
    }

    #[test]
    fn test_apply_outputs_writes_both_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let workbook_path = dir.path().join("out.jsonl");
        let log_path = dir.path().join("review.txt");
        let mut workbook = JsonlWorkbook::new(&workbook_path);
        let mut log = TextReviewLog::new(&log_path);

        apply_outputs(&empty_doc(vec![blank_pass()]), &mut workbook, &mut log).unwrap();

        let row = fs::read_to_string(&workbook_path).unwrap();
        assert!(row.contains("\"study_type\":\"rct\""));
        let summary = fs::read_to_string(&log_path).unwrap();
        assert!(summary.contains("PMID: 123"));
        assert!(summary.contains("Needs human review: NO"));
    }

    #[test]
    fn test_audit_json_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.json");
        write_audit_json(&path, &empty_doc(vec![blank_pass()])).unwrap();
        let loaded: FinalDocument =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.paper_id.pmid, Some(123));
        assert_eq!(loaded.verification.passes.len(), 1);
    }

    #[test]
    fn test_summary_lists_passes() {
        let summary = render_summary(&empty_doc(vec![blank_pass(), blank_pass()]));
        assert!(summary.contains("pass 1: verdict=PASS"));
        assert!(summary.contains("pass 2:"));
        assert!(summary.contains("None."));
    }
}
