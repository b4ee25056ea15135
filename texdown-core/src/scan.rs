//! Delimiter scanning: split content into literal text and math spans
//!
//! Display spans are extracted first; inline spans are only searched for in the
//! literal text that remains, so rendered display math is never rescanned.

use std::ops::Range;

use crate::math::MathMode;

/// A piece of scanned content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Literal text, handed to the Markdown engine untouched
    Text(&'a str),
    /// A math span with its delimiters stripped and its body trimmed
    Math { tex: &'a str, mode: MathMode },
}

/// Word characters block inline delimiters on their outer side
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split content into display math spans and literal text, then split the
/// literal text again at inline math spans.
pub fn split<'a>(text: &'a str, display: &str, inline: &str) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    for segment in split_display(text, display) {
        match segment {
            Segment::Text(literal) => segments.extend(split_inline(literal, inline)),
            math => segments.push(math),
        }
    }
    segments
}

/// Byte ranges of `delim ... delim` spans, delimiters included.
///
/// The body must be at least one character long and the nearest closing
/// delimiter wins, so `$$a$$b$$c$$` yields two spans.
pub fn display_spans(text: &str, delim: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    if delim.is_empty() {
        return spans;
    }

    let mut pos = 0;
    while let Some(found) = text[pos..].find(delim) {
        let open = pos + found;
        let body_start = open + delim.len();
        let Some(first) = text[body_start..].chars().next() else {
            break;
        };
        let search_from = body_start + first.len_utf8();
        // No closer after this opener means none after any later opener either
        let Some(close) = text[search_from..].find(delim) else {
            break;
        };
        let end = search_from + close + delim.len();
        spans.push(open..end);
        pos = end;
    }

    spans
}

/// Split at display math spans
pub fn split_display<'a>(text: &'a str, delim: &str) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for span in display_spans(text, delim) {
        push_text(&mut segments, &text[cursor..span.start]);
        let body = &text[span.start + delim.len()..span.end - delim.len()];
        segments.push(Segment::Math {
            tex: body.trim(),
            mode: MathMode::Display,
        });
        cursor = span.end;
    }

    push_text(&mut segments, &text[cursor..]);
    segments
}

/// Split at inline math spans.
///
/// A span opens at a delimiter not preceded by a word character and closes at
/// the next delimiter, which must not be followed by a word character. The
/// body must be non-empty and must neither start nor end with whitespace.
pub fn split_inline<'a>(text: &'a str, delim: &str) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    if delim.is_empty() {
        push_text(&mut segments, text);
        return segments;
    }

    let mut cursor = 0;
    let mut pos = 0;
    while let Some(found) = text[pos..].find(delim) {
        let open = pos + found;
        match inline_close(text, open, delim) {
            Some(close) => {
                push_text(&mut segments, &text[cursor..open]);
                segments.push(Segment::Math {
                    tex: text[open + delim.len()..close].trim(),
                    mode: MathMode::Inline,
                });
                pos = close + delim.len();
                cursor = pos;
            }
            None => {
                // Retry from the next character; overlapping openers are allowed
                let step = text[open..].chars().next().map_or(1, char::len_utf8);
                pos = open + step;
            }
        }
    }

    push_text(&mut segments, &text[cursor..]);
    segments
}

/// Position of the closing delimiter for an inline span opened at `open`
fn inline_close(text: &str, open: usize, delim: &str) -> Option<usize> {
    if text[..open].chars().next_back().is_some_and(is_word_char) {
        return None;
    }

    let body_start = open + delim.len();
    let close = body_start + text[body_start..].find(delim)?;
    let body = &text[body_start..close];

    let first = body.chars().next()?;
    let last = body.chars().next_back()?;
    if first.is_whitespace() || last.is_whitespace() {
        return None;
    }

    if text[close + delim.len()..]
        .chars()
        .next()
        .is_some_and(is_word_char)
    {
        return None;
    }

    Some(close)
}

fn push_text<'a>(segments: &mut Vec<Segment<'a>>, text: &'a str) {
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
}
