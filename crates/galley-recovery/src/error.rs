//! Error types for the recovery pipeline
//!
//! None of these ever reach the caller of
//! [`recover_annotations`](crate::recover_annotations). They are control
//! signals between stages: a structural parse failure moves the ladder to
//! its next rung, a validation failure does the same, and both are reported
//! to the observer hook for diagnostics.

/// Structural parse failures
#[derive(Debug, thiserror::Error)]
pub enum StructuralError {
    /// Candidate text is empty or whitespace
    #[error("empty candidate")]
    Empty,

    /// Candidate is not syntactically valid JSON
    #[error("syntax error: {0}")]
    Syntax(#[from] serde_json::Error),

    /// Candidate parsed to a scalar rather than an object or array
    #[error("expected object or array, got {0}")]
    NotStructured(&'static str),
}

/// Validation failures for a structurally parsed value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Value is neither a bare list nor an object holding one under a
    /// conventional key
    #[error("no annotation list found")]
    NotAnnotationContainer,

    /// List found but every element lacked a mandatory field
    #[error("all {rejected} candidate items were rejected")]
    NoAcceptedItems {
        /// Number of elements dropped
        rejected: usize,
    },
}

/// Either failure a ladder rung can end in
#[derive(Debug, thiserror::Error)]
pub enum RungError {
    /// Rung output did not parse
    #[error("structural: {0}")]
    Structural(#[from] StructuralError),

    /// Rung output parsed but was not an acceptable annotation list
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),
}
