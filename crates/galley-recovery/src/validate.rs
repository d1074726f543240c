//! Structural parsing, validation and field sanitization
//!
//! A candidate is accepted when it parses to a bare array, or to an object
//! holding an array under one of the configured list keys, and at least one
//! element carries every mandatory field. Accepted elements are back-filled
//! with a span and a run-unique id.

use crate::error::{StructuralError, ValidationError};
use galley_core::{AnnotationItem, AnnotationKind, IdAllocator, RecoveryConfig, Span};
use serde_json::{Map, Value};

/// Fields an element must carry to be accepted
pub const MANDATORY_FIELDS: [&str; 5] = ["kind", "original", "suggestion", "reason", "category"];

/// Accepted alias for `kind`
const KIND_ALIAS: &str = "type";

/// Parse text as an object or array
///
/// # Errors
/// Returns error if the text is blank, malformed, or a bare scalar
pub fn structural_parse(text: &str) -> Result<Value, StructuralError> {
    if text.trim().is_empty() {
        return Err(StructuralError::Empty);
    }
    match serde_json::from_str::<Value>(text)? {
        value @ (Value::Object(_) | Value::Array(_)) => Ok(value),
        Value::Null => Err(StructuralError::NotStructured("null")),
        Value::Bool(_) => Err(StructuralError::NotStructured("boolean")),
        Value::Number(_) => Err(StructuralError::NotStructured("number")),
        Value::String(_) => Err(StructuralError::NotStructured("string")),
    }
}

/// The annotation array inside a parsed value, if any
#[must_use]
pub fn annotation_array<'v>(value: &'v Value, list_keys: &[String]) -> Option<&'v [Value]> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => list_keys
            .iter()
            .find_map(|key| map.get(key).and_then(Value::as_array))
            .map(Vec::as_slice),
        _ => None,
    }
}

/// Validates parsed candidates against one document
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    config: &'a RecoveryConfig,
    document: &'a str,
}

impl<'a> Validator<'a> {
    /// Create validator
    #[inline]
    #[must_use]
    pub fn new(config: &'a RecoveryConfig, document: &'a str) -> Self {
        Self { config, document }
    }

    /// Validate and sanitize a parsed value
    ///
    /// Ids are only claimed from `ids` for elements that are accepted.
    ///
    /// # Errors
    /// Returns error if no annotation array is found or no element is accepted
    pub fn validate(
        &self,
        value: &Value,
        ids: &mut IdAllocator,
    ) -> Result<Vec<AnnotationItem>, ValidationError> {
        let elements = annotation_array(value, &self.config.list_keys)
            .ok_or(ValidationError::NotAnnotationContainer)?;

        let items: Vec<AnnotationItem> = elements
            .iter()
            .filter_map(|element| self.sanitize_item(element, ids))
            .collect();

        if items.is_empty() {
            Err(ValidationError::NoAcceptedItems {
                rejected: elements.len(),
            })
        } else {
            Ok(items)
        }
    }

    /// Sanitize one element, `None` if a mandatory field is missing
    pub fn sanitize_item(&self, element: &Value, ids: &mut IdAllocator) -> Option<AnnotationItem> {
        let obj = element.as_object()?;

        let kind = mandatory(obj, "kind").or_else(|| mandatory(obj, KIND_ALIAS))?;
        let original = mandatory(obj, "original")?;
        let suggestion = mandatory(obj, "suggestion")?;
        let reason = mandatory(obj, "reason")?;
        let category = mandatory(obj, "category")?;

        let original = if original.trim().is_empty() {
            self.config.placeholder.clone()
        } else {
            original
        };

        let span = reported_span(obj)
            .or_else(|| self.anchor(&original))
            .unwrap_or_default();

        let id = ids.claim(obj.get("id").and_then(scalar_text).as_deref());

        Some(
            AnnotationItem::new(
                id,
                AnnotationKind::from_label(&kind),
                original,
                suggestion,
                reason,
                category,
            )
            .with_span(span),
        )
    }

    /// Anchored span for `original`, if anchoring is enabled
    #[must_use]
    pub fn anchor(&self, original: &str) -> Option<Span> {
        if !self.config.anchor_spans || original == self.config.placeholder {
            return None;
        }
        anchor_span(self.document, original)
    }
}

/// Char-offset span of the first occurrence of `needle` in `document`
#[must_use]
pub fn anchor_span(document: &str, needle: &str) -> Option<Span> {
    if needle.is_empty() {
        return None;
    }
    let byte_start = document.find(needle)?;
    let start = document[..byte_start].chars().count();
    Some(Span::new(start, start + needle.chars().count()))
}

/// Mandatory field as text; null, object and array values do not count
fn mandatory(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(scalar_text)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Model-reported span from `span`, `position` or top-level offsets
fn reported_span(obj: &Map<String, Value>) -> Option<Span> {
    ["span", "position"]
        .iter()
        .filter_map(|key| obj.get(*key))
        .find_map(|value| match value {
            Value::Object(inner) => offset_pair(inner),
            Value::Array(pair) if pair.len() == 2 => {
                Some(Span::new(offset(&pair[0])?, offset(&pair[1])?))
            }
            _ => None,
        })
        .or_else(|| offset_pair(obj))
}

fn offset_pair(map: &Map<String, Value>) -> Option<Span> {
    let start = offset(map.get("start")?)?;
    let end = offset(map.get("end")?)?;
    Some(Span::new(start, end))
}

/// Non-negative offset from a number or numeric string
fn offset(value: &Value) -> Option<usize> {
    let raw = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))?,
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f as u64)
            })?
        }
        _ => return None,
    };
    usize::try_from(raw).ok()
}
