//! Canonical enumeration of addressable leaf paths.
//!
//! The leaf list decides what must be verified: every populated sheet field,
//! including null-valued ones ("field exists but has no reported value" is
//! itself a reviewable decision). The walk is deterministic - depth-first,
//! group keys in insertion order, no sorting - so chunk boundaries and report
//! ordering are reproducible run to run.

use crate::pointer::escape;
use crate::value::Node;
use std::collections::HashSet;

/// The study-type path, always enumerated first regardless of value.
pub const STUDY_TYPE_PATH: &str = "/study_type";

/// Enumerate every addressable leaf path of the working record.
///
/// `/study_type` is always the first entry. For each sheet under
/// `record/sheets` that is a populated group, every key is visited: groups
/// recurse, sequences recurse per index, and anything else (including null)
/// is emitted as a leaf. Duplicates keep the first occurrence.
#[must_use]
pub fn leaf_paths(root: &Node) -> Vec<String> {
    let mut paths = vec![STUDY_TYPE_PATH.to_string()];

    let sheets = root
        .child("record")
        .and_then(|record| record.child("sheets"))
        .and_then(Node::as_group);

    if let Some(sheets) = sheets {
        for (sheet_key, payload) in sheets {
            if payload.as_group().is_some() {
                let base = format!("/record/sheets/{}", escape(sheet_key));
                walk(&base, payload, &mut paths);
            }
        }
    }

    let mut seen = HashSet::new();
    paths.retain(|p| seen.insert(p.clone()));
    paths
}

fn walk(base: &str, node: &Node, paths: &mut Vec<String>) {
    match node {
        Node::Group(group) => {
            for (key, child) in group {
                walk(&format!("{base}/{}", escape(key)), child, paths);
            }
        }
        Node::Seq(items) => {
            for (i, item) in items.iter().enumerate() {
                walk(&format!("{base}/{i}"), item, paths);
            }
        }
        Node::Scalar(_) => paths.push(base.to_string()),
    }
}
