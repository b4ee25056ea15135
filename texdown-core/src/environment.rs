//! Tagging of LaTeX environments as display math
//!
//! `\begin{name}...\end{name}` blocks whose name is configured are wrapped in
//! display delimiters so the scanner picks them up without the author having
//! to add delimiters.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::ops::Range;

use crate::scan::{display_spans, is_word_char};

const BEGIN: &str = "\\begin{";

/// A `\begin{name}...\end{name}` block found in the content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentBlock<'a> {
    pub name: &'a str,
    /// Byte range covering both markers
    pub range: Range<usize>,
}

/// Find environment blocks left to right.
///
/// The body match is non-greedy: a block ends at the first `\end{name}` with
/// the same name. Scanning resumes after each block, so blocks nested inside
/// another block are not reported. A `\begin` without a matching `\end`
/// is skipped.
pub fn find_blocks(content: &str) -> Vec<EnvironmentBlock<'_>> {
    let mut blocks = Vec::new();
    let mut pos = 0;

    while let Some(found) = content[pos..].find(BEGIN) {
        let start = pos + found;
        match parse_block(content, start) {
            Some(block) => {
                pos = block.range.end;
                blocks.push(block);
            }
            // '\' is a single byte
            None => pos = start + 1,
        }
    }

    blocks
}

fn parse_block(content: &str, start: usize) -> Option<EnvironmentBlock<'_>> {
    let name_start = start + BEGIN.len();
    let rest = &content[name_start..];

    let mut name_len = rest
        .char_indices()
        .find(|&(_, c)| !is_word_char(c))
        .map_or(rest.len(), |(i, _)| i);
    if name_len == 0 {
        return None;
    }
    if rest[name_len..].starts_with('*') {
        name_len += 1;
    }
    if !rest[name_len..].starts_with('}') {
        return None;
    }

    let name = &rest[..name_len];
    let body_start = name_start + name_len + 1;
    let end_marker = format!("\\end{{{name}}}");
    let close = body_start + content[body_start..].find(&end_marker)?;

    Some(EnvironmentBlock {
        name,
        range: start..close + end_marker.len(),
    })
}

/// Wrap every configured environment block with the display delimiter.
///
/// Blocks already inside an author-written display span are left as they
/// are, otherwise the extra delimiters would pair up with the author's.
pub fn tag_environments<'a>(
    content: &'a str,
    names: &BTreeSet<String>,
    display_delimiter: &str,
) -> Cow<'a, str> {
    if names.is_empty() || !content.contains(BEGIN) {
        return Cow::Borrowed(content);
    }

    let existing = display_spans(content, display_delimiter);
    let mut output: Option<String> = None;
    let mut cursor = 0;

    for block in find_blocks(content) {
        if !names.contains(block.name) {
            continue;
        }
        if existing
            .iter()
            .any(|span| span.start < block.range.start && block.range.start < span.end)
        {
            log::trace!("environment {} already delimited", block.name);
            continue;
        }

        log::trace!("tagging environment {} as display math", block.name);
        let out = output.get_or_insert_with(|| String::with_capacity(content.len() + 16));
        out.push_str(&content[cursor..block.range.start]);
        out.push_str(display_delimiter);
        out.push_str(&content[block.range.clone()]);
        out.push_str(display_delimiter);
        cursor = block.range.end;
    }

    match output {
        Some(mut out) => {
            out.push_str(&content[cursor..]);
            Cow::Owned(out)
        }
        None => Cow::Borrowed(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_find_single_block() {
        let content = r"a \begin{align}x&=1\end{align} b";
        let blocks = find_blocks(content);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].name, "align");
        assert_eq!(&content[blocks[0].range.clone()], r"\begin{align}x&=1\end{align}");
    }

    #[test]
    fn test_find_starred_block() {
        let blocks = find_blocks(r"\begin{align*}x\end{align*}");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].name, "align*");
    }

    #[test]
    fn test_body_match_is_non_greedy() {
        let content = r"\begin{gather}a\end{gather} mid \begin{gather}b\end{gather}";
        let blocks = find_blocks(content);
        assert_eq!(blocks.len(), 2);
        assert_eq!(&content[blocks[1].range.clone()], r"\begin{gather}b\end{gather}");
    }

    #[test]
    fn test_mismatched_end_is_not_a_block() {
        assert!(find_blocks(r"\begin{align}x\end{gather}").is_empty());
        assert!(find_blocks(r"\begin{align}x").is_empty());
        assert!(find_blocks(r"\begin{}x\end{}").is_empty());
    }

    #[test]
    fn test_tag_recognized_environment() {
        let tagged = tag_environments(
            r"\begin{equation}x=1\end{equation}",
            &names(&["equation"]),
            "$$",
        );
        assert_eq!(tagged, r"$$\begin{equation}x=1\end{equation}$$");
    }

    #[test]
    fn test_unrecognized_environment_untouched() {
        let content = r"\begin{matrix}a\end{matrix}";
        let tagged = tag_environments(content, &names(&["equation"]), "$$");
        assert!(matches!(tagged, Cow::Borrowed(_)));
        assert_eq!(tagged, content);
    }

    #[test]
    fn test_recognized_inside_unrecognized_is_skipped() {
        let content = r"\begin{figure}\begin{align}x\end{align}\end{figure}";
        let tagged = tag_environments(content, &names(&["align"]), "$$");
        assert_eq!(tagged, content);
    }

    #[test]
    fn test_already_delimited_environment_untouched() {
        let content = "$$\n\\begin{align}x\\end{align}\n$$";
        let tagged = tag_environments(content, &names(&["align"]), "$$");
        assert_eq!(tagged, content);
    }

    #[test]
    fn test_closing_delimiter_before_block_does_not_count() {
        let content = r"$$a$$ \begin{align}x\end{align}";
        let tagged = tag_environments(content, &names(&["align"]), "$$");
        assert_eq!(tagged, r"$$a$$ $$\begin{align}x\end{align}$$");
    }

    #[test]
    fn test_multiple_blocks_with_custom_delimiter() {
        let content = "A \\begin{gather}a\\end{gather} B \\begin{multline}b\\end{multline} C";
        let tagged = tag_environments(content, &names(&["gather", "multline"]), "\\[");
        assert_eq!(
            tagged,
            "A \\[\\begin{gather}a\\end{gather}\\[ B \\[\\begin{multline}b\\end{multline}\\[ C"
        );
    }
}
