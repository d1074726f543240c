//! String-literal-aware scanning
//!
//! Every structural decision in the pipeline (tag stripping, bracket
//! matching, bracket completion, regex repairs) must ignore characters that
//! sit inside double-quoted string literals, otherwise a `[` or `}` quoted
//! in annotation text would desynchronize the count. This module holds the
//! one state machine all of them share.
//!
//! All positions are byte offsets. Every character the scanner reacts to is
//! ASCII, so offsets it reports are always valid `str` slice boundaries.

/// Quote/escape state of a left-to-right scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StringState {
    in_string: bool,
    escaped: bool,
}

impl StringState {
    /// Feed one byte; returns `true` if the byte is structural
    ///
    /// A byte is structural when it lies outside every string literal and
    /// is not itself a quote. Inside a literal, `\` escapes the next byte
    /// and an unescaped `"` closes the literal.
    #[inline]
    pub fn step(&mut self, byte: u8) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if byte == b'\\' {
                self.escaped = true;
            } else if byte == b'"' {
                self.in_string = false;
            }
            false
        } else if byte == b'"' {
            self.in_string = true;
            self.escaped = false;
            false
        } else {
            true
        }
    }

    /// Inside a string literal
    #[inline]
    #[must_use]
    pub fn in_string(&self) -> bool {
        self.in_string
    }

    /// Last byte was an unconsumed backslash inside a literal
    #[inline]
    #[must_use]
    pub fn escaped(&self) -> bool {
        self.escaped
    }
}

/// Closing bracket for an opening bracket
#[inline]
#[must_use]
pub fn closer_for(open: u8) -> Option<u8> {
    match open {
        b'{' => Some(b'}'),
        b'[' => Some(b']'),
        _ => None,
    }
}

/// Opening bracket for a closing bracket
#[inline]
#[must_use]
pub fn opener_for(close: u8) -> Option<u8> {
    match close {
        b'}' => Some(b'{'),
        b']' => Some(b'['),
        _ => None,
    }
}

/// Contiguous run of text, either inside or outside a string literal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    /// Segment text; literal segments include their quotes
    pub text: &'a str,
    /// True for a string literal (possibly unterminated at end of text)
    pub literal: bool,
}

/// Split text into alternating outside-string and string-literal segments
#[must_use]
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut state = StringState::default();
    let mut seg_start = 0;

    for (i, &byte) in text.as_bytes().iter().enumerate() {
        let was_in = state.in_string();
        state.step(byte);
        if !was_in && state.in_string() {
            if i > seg_start {
                out.push(Segment {
                    text: &text[seg_start..i],
                    literal: false,
                });
            }
            seg_start = i;
        } else if was_in && !state.in_string() {
            out.push(Segment {
                text: &text[seg_start..=i],
                literal: true,
            });
            seg_start = i + 1;
        }
    }

    if seg_start < text.len() {
        out.push(Segment {
            text: &text[seg_start..],
            literal: state.in_string(),
        });
    }
    out
}

/// Apply a transform to outside-string segments only
///
/// String literals are copied through untouched.
pub fn map_outside_strings<F>(text: &str, mut f: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out = String::with_capacity(text.len() + 16);
    for segment in segments(text) {
        if segment.literal {
            out.push_str(segment.text);
        } else {
            out.push_str(&f(segment.text));
        }
    }
    out
}

/// Byte offsets of every `{` and `[` in the text, quoted or not
#[must_use]
pub fn opener_positions(text: &str) -> Vec<usize> {
    text.bytes()
        .enumerate()
        .filter(|(_, b)| matches!(b, b'{' | b'['))
        .map(|(i, _)| i)
        .collect()
}

/// Exclusive end of the region opened at `start`
///
/// Counts only the bracket pair of the opener at `start`, skipping string
/// literals. Returns `None` if `start` is not an opener or the counter never
/// returns to zero.
#[must_use]
pub fn matching_close(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let open = *bytes.get(start)?;
    let close = closer_for(open)?;

    let mut depth = 0usize;
    let mut state = StringState::default();
    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if !state.step(byte) {
            continue;
        }
        if byte == open {
            depth += 1;
        } else if byte == close {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(start + offset + 1);
            }
        }
    }
    None
}

/// Result of an unclosed-bracket scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenScan {
    /// Unclosed openers, outermost first
    pub stack: Vec<u8>,
    /// Text ends inside a string literal
    pub in_string: bool,
    /// Text ends with a dangling backslash inside a literal
    pub escaped: bool,
}

impl OpenScan {
    /// Closers that would balance the text, innermost first
    #[must_use]
    pub fn closers(&self) -> String {
        self.stack
            .iter()
            .rev()
            .filter_map(|&open| closer_for(open))
            .map(char::from)
            .collect()
    }
}

/// Net unclosed `{`/`[` outside string literals
///
/// A closer pops its opener only when it matches the innermost open
/// bracket; mismatched closers are ignored.
#[must_use]
pub fn unclosed_brackets(text: &str) -> OpenScan {
    let mut stack = Vec::new();
    let mut state = StringState::default();

    for &byte in text.as_bytes() {
        if !state.step(byte) {
            continue;
        }
        match byte {
            b'{' | b'[' => stack.push(byte),
            b'}' | b']' => {
                if stack.last().copied() == opener_for(byte) {
                    stack.pop();
                }
            }
            _ => {}
        }
    }

    OpenScan {
        stack,
        in_string: state.in_string(),
        escaped: state.escaped(),
    }
}

/// Check whether any `{` or `[` occurs in the text
#[inline]
#[must_use]
pub fn has_opener(text: &str) -> bool {
    text.bytes().any(|b| matches!(b, b'{' | b'['))
}
