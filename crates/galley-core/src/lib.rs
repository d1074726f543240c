//! Galley Core
//!
//! Shared vocabulary for the proofreading recovery pipeline:
//! - Annotation items, kinds and spans
//! - Per-run id allocation
//! - Recovery configuration
//!
//! # Example
//!
//! ```rust
//! use galley_core::{AnnotationItem, AnnotationKind, AnnotationList, IdAllocator, Span};
//!
//! let mut ids = IdAllocator::new();
//! let item = AnnotationItem::new(
//!     ids.claim(Some("e1")),
//!     AnnotationKind::from_label("error"),
//!     "teh",
//!     "the",
//!     "typo",
//!     "spelling",
//! )
//! .with_span(Span::new(10, 13));
//!
//! let list = AnnotationList::single(item);
//! assert_eq!(list.first().id.as_str(), "e1");
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod annotation;
pub mod config;
pub mod error;
pub mod id;

// Re-exports for convenience
pub use annotation::{AnnotationItem, AnnotationKind, AnnotationList, Span, UnknownKind};
pub use config::RecoveryConfig;
pub use error::{ConfigError, ConfigResult};
pub use id::{AnnotationId, IdAllocator};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Galley Core
    pub use crate::{
        AnnotationId, AnnotationItem, AnnotationKind, AnnotationList, IdAllocator,
        RecoveryConfig, Span,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
