//! Emergency reconstruction
//!
//! Used only when no ladder rung produced an accepted list. Two tactics, in
//! order:
//! 1. Harvest `"field": "value"` fragments per mandatory field and zip them
//!    by position into items.
//! 2. Mine the reasoning trace for sentences that describe a problem.
//!
//! The positional zip assumes fragments appear in item order and that no
//! item skipped a field. That holds for truncated output, which is the
//! common case here; it is not guaranteed in general.

use crate::validate::MANDATORY_FIELDS;
use galley_core::{AnnotationItem, AnnotationKind, IdAllocator, RecoveryConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Reason given to harvested items that lost theirs
pub const HARVEST_REASON: &str = "recovered from a partially formed response";

/// One value regex per mandatory field, in `MANDATORY_FIELDS` order
static FIELD_VALUES: Lazy<Vec<Regex>> = Lazy::new(|| {
    MANDATORY_FIELDS
        .iter()
        .map(|field| {
            let key = if *field == "kind" {
                "(?:kind|type)".to_string()
            } else {
                regex::escape(field)
            };
            Regex::new(&format!(r#""{key}"\s*:\s*"((?:[^"\\]|\\.)*)""#))
                .expect("field value regex is valid")
        })
        .collect()
});

static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?。！？;；\n]+").expect("sentence regex is valid"));

static PROBLEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\bthere(?: is|'s| are)(?: an?)? (?:issue|problem|mistake)s?\b|\b(?:errors?|typos?|misspell\w*|suggest\w*|incorrect|wrong)\b|\bshould be (?:changed|replaced|corrected)\b|有问题|建议|应改为|应该改为|错误|错别字|不正确|不规范",
    )
    .expect("problem pattern regex is valid")
});

static QUOTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""([^"\n]+)"|“([^”\n]+)”|「([^」\n]+)」|‘([^’\n]+)’"#)
        .expect("quoted fragment regex is valid")
});

/// Proofreading topics named in the generic trace item
const SALIENT_KEYWORDS: &[&str] = &[
    "spelling",
    "grammar",
    "punctuation",
    "typo",
    "terminology",
    "citation",
    "reference",
    "formatting",
    "consistency",
    "拼写",
    "语法",
    "标点",
    "术语",
    "引用",
    "格式",
];

/// Rebuild items from `"field": "value"` fragments
///
/// Returns an empty vector when no fragment of any mandatory field occurs.
pub fn harvest_fields(
    text: &str,
    config: &RecoveryConfig,
    ids: &mut IdAllocator,
) -> Vec<AnnotationItem> {
    let columns: Vec<Vec<String>> = FIELD_VALUES
        .iter()
        .map(|re| {
            re.captures_iter(text)
                .filter_map(|caps| caps.get(1))
                .map(|m| unescape(m.as_str()))
                .collect()
        })
        .collect();

    let rows = columns.iter().map(Vec::len).max().unwrap_or(0);
    (0..rows)
        .map(|row| {
            let field = |column: usize| columns.get(column).and_then(|c| c.get(row));
            let original = field(1)
                .filter(|o| !o.trim().is_empty())
                .map_or_else(|| config.placeholder.clone(), Clone::clone);

            AnnotationItem::new(
                ids.fresh(),
                field(0).map_or_else(AnnotationKind::default, |k| AnnotationKind::from_label(k)),
                original,
                field(2).cloned().unwrap_or_default(),
                field(3).cloned().unwrap_or_else(|| HARVEST_REASON.to_string()),
                field(4)
                    .cloned()
                    .unwrap_or_else(|| config.harvest_category.clone()),
            )
        })
        .collect()
}

/// Decode a JSON string body, keeping it raw if it is not valid
fn unescape(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.to_string())
}

/// Synthesize items from problem-describing sentences in the trace
///
/// Never empty: when no sentence qualifies, a single generic item names the
/// proofreading topics the trace touched on.
pub fn synthesize_from_trace(
    trace: &str,
    config: &RecoveryConfig,
    ids: &mut IdAllocator,
) -> Vec<AnnotationItem> {
    let mut seen = HashSet::new();
    let items: Vec<AnnotationItem> = SENTENCE_END
        .split(trace)
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty() && PROBLEM.is_match(sentence))
        .filter(|sentence| seen.insert(*sentence))
        .take(config.max_trace_items)
        .map(|sentence| sentence_item(sentence, config, ids))
        .collect();

    if items.is_empty() {
        vec![generic_item(trace, config, ids)]
    } else {
        items
    }
}

fn sentence_item(sentence: &str, config: &RecoveryConfig, ids: &mut IdAllocator) -> AnnotationItem {
    let mut fragments = QUOTED.captures_iter(sentence).filter_map(|caps| {
        caps.iter()
            .skip(1)
            .flatten()
            .next()
            .map(|m| m.as_str().trim().to_string())
    });
    let original = fragments
        .next()
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| config.placeholder.clone());
    let suggestion = fragments.next().unwrap_or_default();

    AnnotationItem::new(
        ids.fresh(),
        AnnotationKind::Suggestion,
        original,
        suggestion,
        sentence,
        config.trace_category.clone(),
    )
}

fn generic_item(trace: &str, config: &RecoveryConfig, ids: &mut IdAllocator) -> AnnotationItem {
    let lowered = trace.to_lowercase();
    let topics: Vec<&str> = SALIENT_KEYWORDS
        .iter()
        .copied()
        .filter(|keyword| lowered.contains(keyword))
        .collect();

    let reason = if topics.is_empty() {
        "analysis in progress; the model did not finish a finding".to_string()
    } else {
        format!("analysis in progress; the model was examining {}", topics.join(", "))
    };

    AnnotationItem::new(
        ids.fresh(),
        AnnotationKind::Suggestion,
        config.placeholder.clone(),
        "",
        reason,
        config.trace_category.clone(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn harvests_and_zips_fragments() {
        let config = RecoveryConfig::default();
        let mut ids = IdAllocator::new();
        let text = r#"[{"kind": "error", "original": "teh", "suggestion": "the", "reason": "typo", "category": "spelling"}, {"type": "SUGGESTION", "original": "a \"b\""#;

        let items = harvest_fields(text, &config, &mut ids);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, AnnotationKind::Error);
        assert_eq!(items[0].category, "spelling");
        assert_eq!(items[1].kind, AnnotationKind::Suggestion);
        assert_eq!(items[1].original, r#"a "b""#);
        assert_eq!(items[1].suggestion, "");
        assert_eq!(items[1].reason, HARVEST_REASON);
        assert_eq!(items[1].category, config.harvest_category);
        assert_ne!(items[0].id, items[1].id);
    }

    #[test]
    fn harvest_defaults_missing_fields() {
        let config = RecoveryConfig::default();
        let mut ids = IdAllocator::new();

        let items = harvest_fields(r#"{"items":[{"kind":"warning","orig"#, &config, &mut ids);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, AnnotationKind::Warning);
        assert_eq!(items[0].original, config.placeholder);
    }

    #[test]
    fn harvest_finds_nothing_in_prose() {
        let config = RecoveryConfig::default();
        let mut ids = IdAllocator::new();
        assert!(harvest_fields("no fragments here", &config, &mut ids).is_empty());
    }

    #[test]
    fn trace_sentences_become_suggestions() {
        let config = RecoveryConfig::default();
        let mut ids = IdAllocator::new();
        let trace = "Reading the abstract. There is an issue with \"teh\", it should be \"the\". \
                     Formatting looks fine. 第二段有错误。";

        let items = synthesize_from_trace(trace, &config, &mut ids);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.kind == AnnotationKind::Suggestion));
        assert_eq!(items[0].original, "teh");
        assert_eq!(items[0].suggestion, "the");
        assert_eq!(items[1].reason, "第二段有错误");
        assert_eq!(items[1].original, config.placeholder);
    }

    #[test]
    fn trace_items_are_distinct_and_capped() {
        let config = RecoveryConfig::default().with_max_trace_items(2);
        let mut ids = IdAllocator::new();
        let trace = "A typo here. A typo here. Wrong tense. Incorrect comma. Another error.";

        let items = synthesize_from_trace(trace, &config, &mut ids);
        let reasons: Vec<&str> = items.iter().map(|i| i.reason.as_str()).collect();
        assert_eq!(reasons, ["A typo here", "Wrong tense"]);
    }

    #[test]
    fn generic_item_names_topics() {
        let config = RecoveryConfig::default();
        let mut ids = IdAllocator::new();

        let items = synthesize_from_trace("Checking Grammar and punctuation first", &config, &mut ids);
        assert_eq!(items.len(), 1);
        assert!(items[0].reason.starts_with("analysis in progress"));
        assert!(items[0].reason.contains("grammar, punctuation"));

        let items = synthesize_from_trace("", &config, &mut ids);
        assert_eq!(items.len(), 1);
    }
}
