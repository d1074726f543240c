//! Envelope & encoding normalization
//!
//! Some failure modes hand back the whole transport envelope of the
//! completion service instead of the generated text, sometimes nested, and
//! some models double-encode non-ASCII text as `\uXXXX` sequences. This
//! stage undoes both. It never fails: anything it cannot interpret is
//! returned unchanged.

use serde_json::{Map, Value};
use std::borrow::Cow;

/// Unwrap envelopes (up to `max_depth` levels), then decode escapes
///
/// `list_keys` are the conventional annotation-list keys; an object carrying
/// one of them is a payload, never an envelope.
#[must_use]
pub fn normalize(raw: &str, list_keys: &[String], max_depth: usize) -> String {
    let mut current = Cow::Borrowed(raw);
    for _ in 0..max_depth {
        match unwrap_envelope(&current, list_keys) {
            Some(inner) => current = Cow::Owned(inner),
            None => break,
        }
    }
    decode_unicode_escapes(&current).into_owned()
}

/// One level of envelope unwrapping
///
/// Returns the inner generated text if `text` is a serialized service
/// envelope, or a JSON-encoded string whose content starts with a bracket.
/// Any other top-level string is a plain answer and is kept quoted.
#[must_use]
pub fn unwrap_envelope(text: &str, list_keys: &[String]) -> Option<String> {
    let trimmed = text.trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('"')) {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed).ok()? {
        Value::String(inner) => inner
            .trim_start()
            .starts_with(['{', '['])
            .then_some(inner),
        Value::Object(map) => {
            let is_payload = list_keys
                .iter()
                .any(|key| map.get(key).is_some_and(Value::is_array));
            if is_payload {
                None
            } else {
                envelope_content(&map)
            }
        }
        _ => None,
    }
}

/// Generated text carried by a recognized envelope shape
fn envelope_content(map: &Map<String, Value>) -> Option<String> {
    if let Some(choice) = map
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
    {
        let content = choice
            .pointer("/message/content")
            .or_else(|| choice.get("text"))
            .or_else(|| choice.pointer("/delta/content"))
            .and_then(Value::as_str)?;
        let reasoning = choice
            .pointer("/message/reasoning_content")
            .or_else(|| choice.pointer("/delta/reasoning_content"))
            .and_then(Value::as_str);
        return Some(with_reasoning(reasoning, content));
    }

    // Chat-style and generate-style local runtimes
    let content = map
        .get("message")
        .and_then(|m| m.get("content"))
        .or_else(|| map.get("response"))
        .and_then(Value::as_str)?;
    let reasoning = map
        .get("message")
        .and_then(|m| m.get("thinking"))
        .or_else(|| map.get("thinking"))
        .and_then(Value::as_str);
    Some(with_reasoning(reasoning, content))
}

/// Re-attach a separately delivered reasoning field as an inline trace
fn with_reasoning(reasoning: Option<&str>, content: &str) -> String {
    match reasoning.map(str::trim).filter(|r| !r.is_empty()) {
        Some(reasoning) => format!("<think>{reasoning}</think>{content}"),
        None => content.to_string(),
    }
}

/// Decode `\uXXXX` escape sequences into literal characters
///
/// A sequence behind an even run of backslashes is a double-encoded escape
/// and is decoded too, dropping one extra backslash. Sequences that would
/// decode to `"`, `\` or a C0 control character are left alone because they
/// would break the string literal they sit in, as are lone surrogates.
#[must_use]
pub fn decode_unicode_escapes(text: &str) -> Cow<'_, str> {
    if !text.contains("\\u") && !text.contains("\\U") {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('\\') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let run = tail.bytes().take_while(|&b| b == b'\\').count();
        let after = &tail[run..];

        match decode_escape(after, run) {
            Some((ch, consumed)) => {
                let keep = if run % 2 == 1 { run - 1 } else { run - 2 };
                out.extend(std::iter::repeat('\\').take(keep));
                out.push(ch);
                rest = &after[consumed..];
            }
            None => {
                out.push_str(&tail[..run]);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Decode one `uXXXX` (plus a trailing low surrogate escape when needed)
///
/// `text` starts right after the backslash run. Returns the character and
/// the number of bytes consumed from `text`.
fn decode_escape(text: &str, run: usize) -> Option<(char, usize)> {
    let high = hex_unit(text)?;
    let (code, consumed) = match high {
        0xD800..=0xDBFF => {
            let rest = &text[5..];
            let low_run = rest.bytes().take_while(|&b| b == b'\\').count();
            if low_run != run {
                return None;
            }
            let low = hex_unit(&rest[low_run..])?;
            if !(0xDC00..=0xDFFF).contains(&low) {
                return None;
            }
            let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
            (code, 5 + low_run + 5)
        }
        0xDC00..=0xDFFF => return None,
        _ => (high, 5),
    };

    let ch = char::from_u32(code)?;
    if ch < ' ' || ch == '"' || ch == '\\' {
        return None;
    }
    Some((ch, consumed))
}

/// Parse `uXXXX` at the start of `text`
fn hex_unit(text: &str) -> Option<u32> {
    let bytes = text.as_bytes();
    if bytes.len() < 5 || !matches!(bytes[0], b'u' | b'U') {
        return None;
    }
    let hex = text.get(1..5)?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}
