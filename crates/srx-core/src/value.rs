//! Tagged scalar values and the record tree.
//!
//! Extraction records are trees of named groups holding scalar fields.
//! Rather than threading an untyped JSON value through the engine, the core
//! works on two explicit types:
//!
//! - [`Scalar`] - a single field value (null, boolean, integer, float, string)
//! - [`Node`] - a tree node (scalar leaf, sequence, or order-preserving group)
//!
//! Both serialize to and from the plain JSON wire form (no tags), so a
//! verifier patch like `{"record": {"sheets": {"rct_appraisal": {"q1": 1}}}}`
//! deserializes directly into a [`Node`]. Groups use [`IndexMap`] because
//! leaf enumeration and report ordering depend on insertion order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single field-level value as produced by extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Field exists but has no reported value.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integer (counts, scores, appraisal answers).
    Int(i64),
    /// Floating-point (means, percentages).
    Float(f64),
    /// Free text or enumerated token.
    Str(String),
}

impl Scalar {
    /// Returns true for [`Scalar::Null`].
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the string content, if this is a string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl Default for Scalar {
    #[inline]
    fn default() -> Self {
        Self::Null
    }
}

impl From<bool> for Scalar {
    #[inline]
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Scalar {
    #[inline]
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Scalar {
    #[inline]
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Scalar {
    #[inline]
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    #[inline]
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Order-preserving map of field name to child node.
pub type Group = IndexMap<String, Node>;

/// A node in the record tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    /// Leaf value.
    Scalar(Scalar),
    /// Sequence of nodes; replaced wholesale by patches, never merged.
    Seq(Vec<Node>),
    /// Named group; merged key-wise by patches.
    Group(Group),
}

impl Node {
    /// An empty group node.
    #[inline]
    #[must_use]
    pub fn group() -> Self {
        Self::Group(Group::new())
    }

    /// A null leaf node.
    #[inline]
    #[must_use]
    pub const fn null() -> Self {
        Self::Scalar(Scalar::Null)
    }

    /// Returns true if this node is a null scalar.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Scalar::Null))
    }

    /// Borrow as a group, if this node is a group.
    #[inline]
    #[must_use]
    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Self::Group(g) => Some(g),
            _ => None,
        }
    }

    /// Mutably borrow as a group, if this node is a group.
    #[inline]
    #[must_use]
    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            Self::Group(g) => Some(g),
            _ => None,
        }
    }

    /// Borrow the scalar leaf, if this node is a scalar.
    #[inline]
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Direct child of a group node by key. Returns `None` for non-groups.
    #[inline]
    #[must_use]
    pub fn child(&self, key: &str) -> Option<&Node> {
        self.as_group().and_then(|g| g.get(key))
    }
}

impl Default for Node {
    #[inline]
    fn default() -> Self {
        Self::null()
    }
}

impl From<Scalar> for Node {
    #[inline]
    fn from(s: Scalar) -> Self {
        Self::Scalar(s)
    }
}
