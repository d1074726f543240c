//! Galley Recovery - structured-output recovery
//!
//! Turns the raw text a language model returned for a proofreading request
//! into a validated, non-empty list of annotations:
//! - Unwraps transport envelopes and double-encoded escapes
//! - Strips reasoning traces, fences and markup
//! - Locates the payload and repairs it through an ordered ladder
//! - Reconstructs items from fragments when repair fails
//! - Falls back to a single synthetic item when nothing else works
//!
//! # Example
//!
//! ```rust
//! use galley_recovery::recover_annotations;
//!
//! let raw = "<think>one typo</think>```json\n\
//!            {\"items\": [{\"kind\": \"error\", \"original\": \"teh\", \
//!            \"suggestion\": \"the\", \"reason\": \"typo\", \"category\": \"spelling\",}]}\n```";
//!
//! let annotations = recover_annotations(raw, "teh cat");
//! assert_eq!(annotations.len(), 1);
//! assert_eq!(annotations.first().suggestion, "the");
//! ```

#![warn(unreachable_pub)]

// Stage modules
pub mod boundary;
pub mod envelope;
pub mod fallback;
pub mod markup;
pub mod reconstruct;
pub mod repair;
pub mod trace;
pub mod validate;

// Infrastructure
pub mod error;
pub mod observer;
pub mod pipeline;
pub mod scan;

// Re-exports for convenience
pub use boundary::{locate, Boundary};
pub use envelope::normalize;
pub use error::{RungError, StructuralError, ValidationError};
pub use markup::strip_markup;
pub use observer::{
    NoopObserver, RecoveryObserver, Stage, StageEvent, StageOutcome, TracingObserver,
};
pub use pipeline::{Recovery, RecoveryPath, RecoveryReport};
pub use repair::Rung;
pub use trace::{strip_reasoning, TraceStrip};
pub use validate::Validator;

use galley_core::AnnotationList;

/// Recover annotations with the default configuration
///
/// Never fails and never returns an empty list. Stage events go to
/// `tracing`.
#[must_use]
pub fn recover_annotations(raw: &str, document: &str) -> AnnotationList {
    Recovery::default().recover(raw, document).annotations
}

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Galley Recovery
    pub use crate::{
        recover_annotations, Recovery, RecoveryObserver, RecoveryPath, RecoveryReport, Rung,
        StageEvent,
    };
    pub use galley_core::prelude::*;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
