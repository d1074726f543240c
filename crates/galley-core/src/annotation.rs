//! Annotation data model
//!
//! Defines the unit of proofreading output and the list the pipeline
//! returns:
//! - [`AnnotationKind`] severity levels
//! - [`Span`] half-open offsets into the caller's document
//! - [`AnnotationItem`] one finding
//! - [`AnnotationList`] ordered, never-empty collection of findings

use crate::id::AnnotationId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a proofreading finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    /// Definite mistake (spelling, grammar, wrong term)
    Error,
    /// Probable problem that needs a human look
    #[default]
    Warning,
    /// Optional stylistic improvement
    Suggestion,
}

impl AnnotationKind {
    /// Lowercase wire name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationKind::Error => "error",
            AnnotationKind::Warning => "warning",
            AnnotationKind::Suggestion => "suggestion",
        }
    }

    /// Parse a model-supplied label, falling back to [`AnnotationKind::Warning`]
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or_default()
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized annotation kind label
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized annotation kind: '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for AnnotationKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(AnnotationKind::Error),
            "warning" => Ok(AnnotationKind::Warning),
            "suggestion" => Ok(AnnotationKind::Suggestion),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Half-open `[start, end)` offset pair into the original document
///
/// Offsets count Unicode scalar values. They are not clamped to the
/// document; the renderer owns clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// Inclusive start offset
    pub start: usize,
    /// Exclusive end offset
    pub end: usize,
}

impl Span {
    /// Create span, reordering the pair so that `end >= start`
    #[inline]
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        if end < start {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    /// Zero-length span at `offset`
    #[inline]
    #[must_use]
    pub fn empty_at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Span length
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if span is zero-length
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// One proofreading finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationItem {
    /// Identifier, unique within one recovery run
    pub id: AnnotationId,
    /// Severity
    pub kind: AnnotationKind,
    /// Location in the original document
    pub span: Span,
    /// Quoted source text the finding refers to (never empty)
    pub original: String,
    /// Proposed replacement text
    pub suggestion: String,
    /// Human-readable justification
    pub reason: String,
    /// Free-form classification label
    pub category: String,
}

impl AnnotationItem {
    /// Create item with default span
    #[must_use]
    pub fn new(
        id: AnnotationId,
        kind: AnnotationKind,
        original: impl Into<String>,
        suggestion: impl Into<String>,
        reason: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id,
            kind,
            span: Span::default(),
            original: original.into(),
            suggestion: suggestion.into(),
            reason: reason.into(),
            category: category.into(),
        }
    }

    /// With span
    #[inline]
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// Ordered, non-empty sequence of annotations
///
/// Order is the model's emission order. The only constructor refuses an
/// empty vector, so a list obtained from the pipeline always has at least
/// one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AnnotationList(Vec<AnnotationItem>);

impl AnnotationList {
    /// Wrap items, returning `None` if there are none
    #[inline]
    #[must_use]
    pub fn from_items(items: Vec<AnnotationItem>) -> Option<Self> {
        if items.is_empty() {
            None
        } else {
            Some(Self(items))
        }
    }

    /// List holding exactly one item
    #[inline]
    #[must_use]
    pub fn single(item: AnnotationItem) -> Self {
        Self(vec![item])
    }

    /// Number of items (always at least one)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; provided for API symmetry
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First item
    #[inline]
    #[must_use]
    pub fn first(&self) -> &AnnotationItem {
        &self.0[0]
    }

    /// Iterate items in emission order
    pub fn iter(&self) -> std::slice::Iter<'_, AnnotationItem> {
        self.0.iter()
    }

    /// Items as slice
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[AnnotationItem] {
        &self.0
    }

    /// Sort by span start, then end (stable)
    pub fn sort_by_span(&mut self) {
        self.0.sort_by_key(|item| item.span);
    }

    /// Consume into the inner vector
    #[inline]
    #[must_use]
    pub fn into_vec(self) -> Vec<AnnotationItem> {
        self.0
    }
}

impl<'a> IntoIterator for &'a AnnotationList {
    type Item = &'a AnnotationItem;
    type IntoIter = std::slice::Iter<'a, AnnotationItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for AnnotationList {
    type Item = AnnotationItem;
    type IntoIter = std::vec::IntoIter<AnnotationItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
