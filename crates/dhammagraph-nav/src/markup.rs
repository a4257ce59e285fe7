//! Inline emphasis in essay text.
//!
//! Transliterated terms are written `*term*`. A renderer turns
//! [`Span::Emphasis`] into italics and everything else into plain text.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum Span<'a> {
    Plain(&'a str),
    Emphasis(&'a str),
}

/// Split on single `*` delimiters. A `*` without a closing partner on the
/// same line stays literal, as does a pair enclosing nothing or text that
/// starts or ends with whitespace (`2 * 3 * 4`).
pub fn emphasis_spans(text: &str) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    let mut plain_start = 0;
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find('*') {
        let open = cursor + offset;
        let after = open + 1;
        let close = text[after..]
            .find(['*', '\n'])
            .map(|i| after + i)
            .filter(|&i| text[i..].starts_with('*') && is_term(&text[after..i]));
        match close {
            Some(close) => {
                if plain_start < open {
                    spans.push(Span::Plain(&text[plain_start..open]));
                }
                spans.push(Span::Emphasis(&text[after..close]));
                cursor = close + 1;
                plain_start = cursor;
            }
            None => cursor = after,
        }
    }
    if plain_start < text.len() {
        spans.push(Span::Plain(&text[plain_start..]));
    }
    spans
}

fn is_term(inner: &str) -> bool {
    !inner.is_empty() && !inner.starts_with(char::is_whitespace) && !inner.ends_with(char::is_whitespace)
}
