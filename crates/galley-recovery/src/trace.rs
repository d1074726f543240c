//! Reasoning-trace stripping
//!
//! Reasoning models emit their deliberation between `<think>` markers
//! before (or instead of) the answer. The markers may be closed, left open
//! by a truncated generation, or only the closing half may appear when the
//! chat template injected the opener into the prompt. All three shapes are
//! excised here; the excised text is kept so the emergency reconstructor can
//! mine it later.

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches `<think>`, `</think>` and the `thinking`/`reasoning` aliases,
/// literal or with escaped angle brackets. Group 1 is `/` on closers.
static TRACE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:<|\x5Cu003c)\s*(/?)\s*(?:think(?:ing)?|reasoning)\s*(?:>|\x5Cu003e)",
    )
    .expect("trace marker regex is valid")
});

/// Stripper output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceStrip {
    /// Text with every trace span removed
    pub text: String,
    /// Excised trace text, `None` if no marker was seen
    pub trace: Option<String>,
}

impl TraceStrip {
    /// A reasoning trace was present
    #[inline]
    #[must_use]
    pub fn had_trace(&self) -> bool {
        self.trace.is_some()
    }
}

/// Remove reasoning-trace spans
///
/// Runs to a fixed point so that an excision which splices a new marker
/// together is handled too; the result is therefore idempotent.
#[must_use]
pub fn strip_reasoning(text: &str) -> TraceStrip {
    let mut current = text.to_string();
    let mut trace: Option<String> = None;

    while let Some((next, excised)) = strip_once(&current) {
        let joined = trace.get_or_insert_with(String::new);
        append_trace(joined, &excised);
        current = next;
    }

    TraceStrip {
        text: current,
        trace,
    }
}

/// One left-to-right pass; `None` when no marker is present
fn strip_once(text: &str) -> Option<(String, String)> {
    if !TRACE_MARKER.is_match(text) {
        return None;
    }

    let mut out = String::with_capacity(text.len());
    let mut trace = String::new();
    let mut last = 0;
    let mut open_body: Option<usize> = None;

    for caps in TRACE_MARKER.captures_iter(text) {
        let Some(marker) = caps.get(0) else { continue };
        let closing = caps.get(1).is_some_and(|g| !g.as_str().is_empty());

        match (open_body, closing) {
            (None, false) => {
                out.push_str(&text[last..marker.start()]);
                open_body = Some(marker.end());
            }
            (Some(body), true) => {
                append_trace(&mut trace, &text[body..marker.start()]);
                open_body = None;
                last = marker.end();
            }
            // Nested opener inside an open trace
            (Some(_), false) => {}
            // Orphan closer: everything before it was trace
            (None, true) => {
                out.push_str(&text[last..marker.start()]);
                append_trace(&mut trace, &out);
                out.clear();
                last = marker.end();
            }
        }
    }

    match open_body {
        Some(body) => append_trace(&mut trace, &text[body..]),
        None => out.push_str(&text[last..]),
    }
    Some((out, trace))
}

fn append_trace(trace: &mut String, piece: &str) {
    let piece = piece.trim();
    if piece.is_empty() {
        return;
    }
    if !trace.is_empty() {
        trace.push('\n');
    }
    trace.push_str(piece);
}
