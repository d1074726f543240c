//! Guaranteed fallback

use galley_core::{AnnotationItem, AnnotationKind, IdAllocator, RecoveryConfig};

/// Reason carried by the fallback item
pub const FALLBACK_REASON: &str =
    "the proofreading service returned output that could not be interpreted; please retry";

/// Category carried by the fallback item
pub const FALLBACK_CATEGORY: &str = "system";

/// The single synthetic item emitted when every other stage came up empty
#[must_use]
pub fn guaranteed_fallback(config: &RecoveryConfig, ids: &mut IdAllocator) -> AnnotationItem {
    AnnotationItem::new(
        ids.fresh(),
        AnnotationKind::Warning,
        config.placeholder.clone(),
        "",
        FALLBACK_REASON,
        FALLBACK_CATEGORY,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use galley_core::Span;

    #[test]
    fn fallback_has_regular_shape() {
        let config = RecoveryConfig::default();
        let mut ids = IdAllocator::new();
        let item = guaranteed_fallback(&config, &mut ids);

        assert_eq!(item.kind, AnnotationKind::Warning);
        assert_eq!(item.category, FALLBACK_CATEGORY);
        assert_eq!(item.span, Span::default());
        assert_eq!(item.original, config.placeholder);
        assert!(!item.id.as_str().is_empty());
    }
}
