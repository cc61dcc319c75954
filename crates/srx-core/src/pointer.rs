//! JSON-pointer addressing into the record tree.
//!
//! Pointers use `/`-separated segments with `~1` and `~0` escaping for
//! literal `/` and `~`. The read path is lenient (missing data returns
//! `None`); the write path is strict and returns typed errors. The asymmetry
//! is intentional: extraction produces partial records, so absent fields are
//! normal on read, but a malformed write address is always a bug upstream.

use crate::error::{CoreError, Result};
use crate::value::{Node, Scalar};

/// Unescape one pointer segment (`~1` -> `/`, then `~0` -> `~`).
#[inline]
#[must_use]
pub fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Escape a key for use as a pointer segment (`~` -> `~0`, then `/` -> `~1`).
#[inline]
#[must_use]
pub fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

#[inline]
fn is_root(pointer: &str) -> bool {
    pointer.is_empty() || pointer == "/"
}

fn segments(pointer: &str) -> impl Iterator<Item = String> + '_ {
    pointer.trim_start_matches('/').split('/').map(unescape)
}

/// Resolve a pointer against the tree, leniently.
///
/// Returns the root for an empty or `/` pointer. Returns `None` (never an
/// error) when a group key is missing, a sequence index is non-numeric or
/// out of range, or traversal passes through a scalar.
#[must_use]
pub fn get<'a>(root: &'a Node, pointer: &str) -> Option<&'a Node> {
    if is_root(pointer) {
        return Some(root);
    }
    let mut cur = root;
    for token in segments(pointer) {
        match cur {
            Node::Seq(items) => {
                let idx: usize = token.parse().ok()?;
                cur = items.get(idx)?;
            }
            Node::Group(group) => {
                cur = group.get(&token)?;
            }
            Node::Scalar(_) => return None,
        }
    }
    Some(cur)
}

/// Resolve a pointer to a scalar value, treating anything else as null.
///
/// Convenience for report compilation: a missing path, or a path addressing
/// a container, reads as "no reported value".
#[must_use]
pub fn get_scalar(root: &Node, pointer: &str) -> Scalar {
    match get(root, pointer) {
        Some(Node::Scalar(s)) => s.clone(),
        _ => Scalar::Null,
    }
}

/// Write a value at the pointer, strictly.
///
/// Intermediate group keys that are missing or hold a scalar are replaced
/// with a fresh empty group (auto-vivification). Sequences are never
/// auto-created: a non-numeric or out-of-range index is an error, as is
/// traversal through a scalar inside a sequence.
///
/// # Errors
///
/// Returns [`CoreError::EmptyPointer`] for an empty or `/` pointer,
/// [`CoreError::IndexNotNumeric`] / [`CoreError::IndexOutOfRange`] for bad
/// sequence indexes, and [`CoreError::NotAContainer`] when a scalar blocks
/// traversal.
pub fn set(root: &mut Node, pointer: &str, value: Node) -> Result<()> {
    if is_root(pointer) {
        return Err(CoreError::EmptyPointer);
    }
    let tokens: Vec<String> = segments(pointer).collect();
    let mut cur = root;
    let last = tokens.len() - 1;
    for (i, token) in tokens.into_iter().enumerate() {
        let is_last = i == last;
        match cur {
            Node::Seq(items) => {
                let idx: usize = token.parse().map_err(|_| CoreError::IndexNotNumeric {
                    token: token.clone(),
                })?;
                if idx >= items.len() {
                    return Err(CoreError::IndexOutOfRange {
                        index: idx,
                        len: items.len(),
                    });
                }
                if is_last {
                    items[idx] = value;
                    return Ok(());
                }
                cur = &mut items[idx];
            }
            Node::Group(group) => {
                if is_last {
                    group.insert(token, value);
                    return Ok(());
                }
                let entry = group.entry(token).or_insert_with(Node::group);
                if matches!(entry, Node::Scalar(_)) {
                    *entry = Node::group();
                }
                cur = entry;
            }
            Node::Scalar(_) => {
                return Err(CoreError::NotAContainer { segment: token });
            }
        }
    }
    unreachable!("loop returns on the last segment")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Node {
        serde_json::from_str(r#"{"items": [{"value": 10}, {"value": 20}]}"#).unwrap()
    }

    #[test]
    fn test_get_handles_lists_and_invalid_indexes() {
        let data = sample();
        assert_eq!(
            get_scalar(&data, "/items/1/value"),
            crate::value::Scalar::Int(20)
        );
        assert!(get(&data, "/items/2/value").is_none());
        assert!(get(&data, "/items/not-an-index/value").is_none());
    }

    #[test]
    fn test_get_root_and_missing_key() {
        let data = sample();
        assert_eq!(get(&data, ""), Some(&data));
        assert_eq!(get(&data, "/"), Some(&data));
        assert!(get(&data, "/missing").is_none());
        assert!(get(&data, "/items/0/value/deeper").is_none());
    }

    #[test]
    fn test_set_rejects_invalid_indexes() {
        let mut data: Node = serde_json::from_str(r#"{"items": ["a", "b"]}"#).unwrap();
        set(&mut data, "/items/1", Node::Scalar("c".into())).unwrap();
        assert_eq!(get_scalar(&data, "/items/1"), "c".into());

        let err = set(&mut data, "/items/3", Node::Scalar("d".into())).unwrap_err();
        assert!(matches!(err, CoreError::IndexOutOfRange { index: 3, .. }));

        let err = set(&mut data, "/items/x", Node::null()).unwrap_err();
        assert!(matches!(err, CoreError::IndexNotNumeric { .. }));
    }

    #[test]
    fn test_set_rejects_empty_pointer() {
        let mut data = sample();
        assert!(matches!(
            set(&mut data, "", Node::null()),
            Err(CoreError::EmptyPointer)
        ));
        assert!(matches!(
            set(&mut data, "/", Node::null()),
            Err(CoreError::EmptyPointer)
        ));
    }

    #[test]
    fn test_set_autovivifies_groups_not_sequences() {
        let mut data = Node::group();
        set(&mut data, "/a/b/c", Node::Scalar(Scalar::Int(1))).unwrap();
        assert_eq!(get_scalar(&data, "/a/b/c"), Scalar::Int(1));

        // a scalar intermediate is replaced with a fresh group
        set(&mut data, "/a/b", Node::Scalar(Scalar::Int(9))).unwrap();
        set(&mut data, "/a/b/d", Node::Scalar(Scalar::Int(2))).unwrap();
        assert_eq!(get_scalar(&data, "/a/b/d"), Scalar::Int(2));
    }

    #[test]
    fn test_set_then_get_roundtrip_preserves_siblings() {
        let mut data = sample();
        let sibling_before = get_scalar(&data, "/items/0/value");
        set(&mut data, "/items/1/value", Node::Scalar(Scalar::Int(99))).unwrap();
        assert_eq!(get_scalar(&data, "/items/1/value"), Scalar::Int(99));
        assert_eq!(get_scalar(&data, "/items/0/value"), sibling_before);
    }

    #[test]
    fn test_escape_roundtrip() {
        let key = "odd/key~name";
        assert_eq!(unescape(&escape(key)), key);
        assert_eq!(escape(key), "odd~1key~0name");
    }

    #[test]
    fn test_escaped_segment_addresses_literal_key() {
        let mut data = Node::group();
        set(&mut data, "/a~1b", Node::Scalar(Scalar::Int(7))).unwrap();
        let group = data.as_group().unwrap();
        assert_eq!(group["a/b"], Node::Scalar(Scalar::Int(7)));
        assert_eq!(get_scalar(&data, "/a~1b"), Scalar::Int(7));
    }
}
