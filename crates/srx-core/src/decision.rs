//! Field-level extraction claims and their deduplication.

use crate::value::Scalar;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// A single field-level extraction claim with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Pointer into the working record.
    pub path: String,
    /// The claimed value.
    #[serde(default)]
    pub value: Scalar,
    /// Short free-text justification, one sentence.
    #[serde(default)]
    pub evidence: String,
    /// Whether the claim requires mandatory verifier sign-off.
    #[serde(default = "default_critical")]
    pub is_critical: bool,
    /// 1-based source-page hint, backfilled from evidence when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

const fn default_critical() -> bool {
    true
}

impl Decision {
    /// A critical decision with the given path and value.
    #[must_use]
    pub fn new(path: impl Into<String>, value: Scalar, evidence: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value,
            evidence: evidence.into(),
            is_critical: true,
            page: None,
        }
    }

    /// Fill a missing `page` by parsing `PAGE <n>` out of the evidence text.
    pub fn backfill_page(&mut self) {
        if self.page.is_none() {
            self.page = extract_page_from_evidence(&self.evidence);
        }
    }
}

/// Parse a 1-based page hint of the form `PAGE <n>` out of evidence text.
#[must_use]
pub fn extract_page_from_evidence(evidence: &str) -> Option<u32> {
    static PAGE_RE: OnceLock<Regex> = OnceLock::new();
    let re = PAGE_RE.get_or_init(|| Regex::new(r"\bPAGE\s+(\d+)\b").expect("valid regex"));
    re.captures(evidence)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Collapse repeated claims across extraction task results, latest-wins.
///
/// Maintains an insertion-ordered path list and a path-to-decision map. A
/// path seen again is removed from its old position and appended at the end,
/// so the final ordering reflects each path's *latest* occurrence (this is
/// move-to-end on update, not a stable sort). Decisions without a path are
/// dropped silently.
#[must_use]
pub fn dedupe_decisions(task_results: &[Vec<Decision>]) -> Vec<Decision> {
    let mut ordered_paths: Vec<String> = Vec::new();
    let mut by_path: HashMap<String, Decision> = HashMap::new();

    for result in task_results {
        for decision in result {
            if decision.path.is_empty() {
                continue;
            }
            if by_path.contains_key(&decision.path) {
                ordered_paths.retain(|p| p != &decision.path);
            }
            ordered_paths.push(decision.path.clone());
            by_path.insert(decision.path.clone(), decision.clone());
        }
    }

    ordered_paths
        .into_iter()
        .map(|p| by_path.remove(&p).expect("path tracked in map"))
        .collect()
}
