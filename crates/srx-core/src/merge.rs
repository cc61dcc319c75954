//! Structural merge of a partial-record patch into a working record.
//!
//! Verifier passes return `suggested_patch` fragments containing only the
//! corrected fields. Folding a patch is a pure, recursive merge: groups merge
//! key-wise, everything else (scalars and sequences alike) is replaced
//! wholesale by the patch side. The base is never mutated - callers build
//! alternative merges from one snapshot.

use crate::value::Node;

/// Merge `patch` into `base`, returning a new tree.
///
/// If either side is not a group, the patch wins wholesale. For groups, keys
/// present only in the base are kept, keys present in the patch overwrite or
/// insert, and when both sides hold groups the merge recurses. A sequence at
/// any key replaces the base value like any other non-group.
#[must_use = "merge returns a new tree and leaves base unmodified"]
pub fn merge(base: &Node, patch: &Node) -> Node {
    let (Node::Group(base_group), Node::Group(patch_group)) = (base, patch) else {
        return patch.clone();
    };
    let mut out = base_group.clone();
    for (key, patch_value) in patch_group {
        match (out.get(key), patch_value) {
            (Some(Node::Group(_)), Node::Group(_)) => {
                let merged = merge(&out[key], patch_value);
                out.insert(key.clone(), merged);
            }
            _ => {
                out.insert(key.clone(), patch_value.clone());
            }
        }
    }
    Node::Group(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Scalar;

    fn node(json: &str) -> Node {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_merge_overwrites_and_keeps() {
        let base = node(r#"{"a": 1, "nested": {"x": 1, "y": 2}}"#);
        let patch = node(r#"{"b": 3, "nested": {"y": 9}}"#);
        let merged = merge(&base, &patch);
        assert_eq!(merged, node(r#"{"a": 1, "nested": {"x": 1, "y": 9}, "b": 3}"#));
    }

    #[test]
    fn test_merge_never_mutates_base() {
        let base = node(r#"{"nested": {"x": 1}}"#);
        let snapshot = base.clone();
        let _ = merge(&base, &node(r#"{"nested": {"x": 2}}"#));
        assert_eq!(base, snapshot);
    }

    #[test]
    fn test_merge_empty_patch_is_identity() {
        let base = node(r#"{"a": 1, "nested": {"x": [1, 2]}}"#);
        assert_eq!(merge(&base, &Node::group()), base);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let base = node(r#"{"a": 1, "nested": {"x": 1}}"#);
        let patch = node(r#"{"nested": {"x": 2, "z": null}}"#);
        let once = merge(&base, &patch);
        let twice = merge(&once, &patch);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_patch_can_null_out_a_subtree() {
        let base = node(r#"{"sheets": {"rct_appraisal": {"q1": 1}}}"#);
        let patch = node(r#"{"sheets": {"rct_appraisal": null}}"#);
        let merged = merge(&base, &patch);
        assert!(merged
            .child("sheets")
            .and_then(|s| s.child("rct_appraisal"))
            .is_some_and(Node::is_null));
    }

    #[test]
    fn test_sequences_replace_wholesale() {
        let base = node(r#"{"xs": [1, 2, 3]}"#);
        let patch = node(r#"{"xs": [9]}"#);
        let merged = merge(&base, &patch);
        assert_eq!(
            merged.child("xs"),
            Some(&Node::Seq(vec![Node::Scalar(Scalar::Int(9))]))
        );
    }

    #[test]
    fn test_non_group_base_is_replaced() {
        let base = Node::Scalar(Scalar::Int(1));
        let patch = node(r#"{"a": 1}"#);
        assert_eq!(merge(&base, &patch), patch);
        assert_eq!(merge(&patch, &base), base);
    }
}
