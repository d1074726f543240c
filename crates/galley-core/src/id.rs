//! Annotation identifiers
//!
//! Model-supplied ids are kept when they are unique within the run.
//! Missing or duplicate ids are synthesized from a millisecond timestamp,
//! a per-run sequence number and a short random suffix. Uniqueness, not
//! unguessability, is the only requirement.

use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Length of the random suffix in synthesized ids
const SUFFIX_LEN: usize = 6;

/// Annotation identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(String);

impl AnnotationId {
    /// Synthesize a fresh id for the given per-run sequence number
    #[must_use]
    pub fn synthesize(sequence: usize) -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let suffix: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(char::from)
            .collect();
        Self(format!("ann-{millis}-{sequence}-{suffix}"))
    }

    /// Borrow as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AnnotationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AnnotationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands out ids that are unique within one recovery run
///
/// Owned by a single pipeline invocation; never shared between runs.
#[derive(Debug, Default)]
pub struct IdAllocator {
    seen: HashSet<String>,
    sequence: usize,
}

impl IdAllocator {
    /// Create empty allocator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a model-supplied id if unused, otherwise synthesize one
    pub fn claim(&mut self, proposed: Option<&str>) -> AnnotationId {
        if let Some(proposed) = proposed.map(str::trim).filter(|p| !p.is_empty()) {
            if self.seen.insert(proposed.to_string()) {
                return AnnotationId::from(proposed);
            }
        }
        self.fresh()
    }

    /// Synthesize an id that has not been handed out in this run
    pub fn fresh(&mut self) -> AnnotationId {
        loop {
            self.sequence += 1;
            let id = AnnotationId::synthesize(self.sequence);
            if self.seen.insert(id.as_str().to_string()) {
                return id;
            }
        }
    }

    /// Number of ids handed out so far
    #[inline]
    #[must_use]
    pub fn issued(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesized_id_shape() {
        let id = AnnotationId::synthesize(3);
        let parts: Vec<_> = id.as_str().split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "ann");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2], "3");
        assert_eq!(parts[3].len(), SUFFIX_LEN);
    }

    #[test]
    fn claim_keeps_unique_model_ids() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.claim(Some("e1")).as_str(), "e1");
        assert_eq!(alloc.claim(Some(" e2 ")).as_str(), "e2");
    }

    #[test]
    fn claim_replaces_duplicates_and_blanks() {
        let mut alloc = IdAllocator::new();
        let first = alloc.claim(Some("dup"));
        let second = alloc.claim(Some("dup"));
        let third = alloc.claim(Some("   "));
        let fourth = alloc.claim(None);
        assert_eq!(first.as_str(), "dup");
        assert_ne!(second, first);
        assert!(second.as_str().starts_with("ann-"));
        assert!(third.as_str().starts_with("ann-"));
        assert_ne!(third, fourth);
        assert_eq!(alloc.issued(), 4);
    }

    #[test]
    fn fresh_ids_are_unique() {
        let mut alloc = IdAllocator::new();
        let ids: HashSet<_> = (0..500).map(|_| alloc.fresh()).collect();
        assert_eq!(ids.len(), 500);
    }
}
