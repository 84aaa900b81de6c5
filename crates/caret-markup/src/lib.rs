//! Markup for completion test fixtures.
//!
//! A markup string is ordinary source text with a few inline annotations:
//!
//! - `$$` marks a caret position. A fixture may carry several carets, each
//!   one is verified as a separate sub-case.
//! - `[|text|]` marks an anonymous span.
//! - `{|Name:text|}` marks a span under the given name.
//!
//! [`parse`] strips the annotations and records their byte offsets in the
//! resulting clean text. [`position_at`] turns such an offset into the
//! line and character shown in failure messages.

mod span;

use indexmap::IndexMap;
use lsp_types::Position;

pub use span::TextSpan;

/// The caret marker token.
pub const CARET: &str = "$$";

const SPAN_OPEN: &str = "[|";
const SPAN_CLOSE: &str = "|]";
const NAMED_SPAN_OPEN: &str = "{|";
const NAMED_SPAN_CLOSE: &str = "|}";

/// Errors produced while parsing markup.
///
/// Offsets refer to the raw markup, not to the clean text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkupError {
    #[error("markup contains no `$$` caret marker")]
    MissingCaret,
    #[error("markup contains {count} `$$` caret markers where exactly one is allowed")]
    MultipleCarets { count: usize },
    #[error("span opened at offset {offset} is never closed")]
    UnclosedSpan { offset: usize },
    #[error("span end at offset {offset} has no matching start")]
    UnmatchedSpanEnd { offset: usize },
    #[error("span end `{found}` at offset {offset} does not match the open `{expected}`")]
    MismatchedSpanEnd {
        offset: usize,
        expected: &'static str,
        found: &'static str,
    },
    #[error("named span at offset {offset} has no `:` after its name")]
    UnterminatedSpanName { offset: usize },
}

/// Parsed markup: clean text plus caret and span annotations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MarkupSource {
    text: String,
    carets: Vec<usize>,
    spans: Vec<TextSpan>,
    named_spans: IndexMap<String, Vec<TextSpan>>,
}

enum OpenSpan {
    Anonymous { start: usize, at: usize },
    Named { name: String, start: usize, at: usize },
}

/// Parse `markup` into clean text and annotations.
pub fn parse(markup: &str) -> Result<MarkupSource, MarkupError> {
    let mut source = MarkupSource {
        text: String::with_capacity(markup.len()),
        ..MarkupSource::default()
    };
    let mut open: Vec<OpenSpan> = Vec::new();
    let mut i = 0;

    while i < markup.len() {
        let rest = &markup[i..];
        if rest.starts_with(CARET) {
            source.carets.push(source.text.len());
            i += CARET.len();
        } else if rest.starts_with(SPAN_OPEN) {
            open.push(OpenSpan::Anonymous {
                start: source.text.len(),
                at: i,
            });
            i += SPAN_OPEN.len();
        } else if rest.starts_with(NAMED_SPAN_OPEN) {
            let name_start = i + NAMED_SPAN_OPEN.len();
            let name_len = markup[name_start..]
                .find(|c: char| matches!(c, ':' | '|' | '}' | '\n'))
                .filter(|&n| markup[name_start + n..].starts_with(':'))
                .ok_or(MarkupError::UnterminatedSpanName { offset: i })?;
            open.push(OpenSpan::Named {
                name: markup[name_start..name_start + name_len].to_string(),
                start: source.text.len(),
                at: i,
            });
            i = name_start + name_len + 1;
        } else if rest.starts_with(SPAN_CLOSE) {
            match open.pop() {
                Some(OpenSpan::Anonymous { start, .. }) => {
                    source.spans.push(TextSpan::new(start, source.text.len()));
                }
                Some(OpenSpan::Named { .. }) => {
                    return Err(MarkupError::MismatchedSpanEnd {
                        offset: i,
                        expected: NAMED_SPAN_CLOSE,
                        found: SPAN_CLOSE,
                    });
                }
                None => return Err(MarkupError::UnmatchedSpanEnd { offset: i }),
            }
            i += SPAN_CLOSE.len();
        } else if rest.starts_with(NAMED_SPAN_CLOSE) {
            match open.pop() {
                Some(OpenSpan::Named { name, start, .. }) => {
                    source
                        .named_spans
                        .entry(name)
                        .or_default()
                        .push(TextSpan::new(start, source.text.len()));
                }
                Some(OpenSpan::Anonymous { .. }) => {
                    return Err(MarkupError::MismatchedSpanEnd {
                        offset: i,
                        expected: SPAN_CLOSE,
                        found: NAMED_SPAN_CLOSE,
                    });
                }
                None => return Err(MarkupError::UnmatchedSpanEnd { offset: i }),
            }
            i += NAMED_SPAN_CLOSE.len();
        } else {
            // `rest` is non-empty and `i` always lands on a char boundary.
            let Some(c) = rest.chars().next() else { break };
            source.text.push(c);
            i += c.len_utf8();
        }
    }

    if let Some(unclosed) = open.pop() {
        let offset = match unclosed {
            OpenSpan::Anonymous { at, .. } | OpenSpan::Named { at, .. } => at,
        };
        return Err(MarkupError::UnclosedSpan { offset });
    }

    source.spans.sort();
    Ok(source)
}

impl MarkupSource {
    /// Clean text without any markers.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Caret offsets in the clean text, in source order.
    pub fn carets(&self) -> &[usize] {
        &self.carets
    }

    pub fn has_caret(&self) -> bool {
        !self.carets.is_empty()
    }

    /// The caret offset when the markup must contain exactly one caret.
    pub fn single_caret(&self) -> Result<usize, MarkupError> {
        match self.carets.as_slice() {
            [] => Err(MarkupError::MissingCaret),
            [offset] => Ok(*offset),
            carets => Err(MarkupError::MultipleCarets {
                count: carets.len(),
            }),
        }
    }

    /// Anonymous `[|...|]` spans ordered by start.
    pub fn spans(&self) -> &[TextSpan] {
        &self.spans
    }

    /// Spans recorded under `name`.
    pub fn named_spans(&self, name: &str) -> &[TextSpan] {
        self.named_spans
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Names of all named spans, in order of first appearance.
    pub fn span_names(&self) -> impl Iterator<Item = &str> {
        self.named_spans.keys().map(String::as_str)
    }
}

/// Convert a byte offset into an LSP position (UTF-16 columns).
///
/// Offsets past the end of `text` clamp to the end.
pub fn position_at(text: &str, offset: usize) -> Position {
    let mut line = 0u32;
    let mut character = 0u32;
    for (byte_pos, c) in text.char_indices() {
        if byte_pos >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            character = 0;
        } else {
            character += c.len_utf16() as u32;
        }
    }
    Position { line, character }
}
