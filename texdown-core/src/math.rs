//! LaTeX math rendering via KaTeX (HTML output)

use html_escape::{encode_double_quoted_attribute, encode_text};
use katex::{Opts, OutputType};
use std::borrow::Cow;
use std::fmt;

/// How a math span is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathMode {
    /// Rendered as its own block
    Display,
    /// Rendered within the surrounding line
    Inline,
}

impl MathMode {
    fn class(self) -> &'static str {
        match self {
            MathMode::Display => "math-display",
            MathMode::Inline => "math-inline",
        }
    }
}

impl fmt::Display for MathMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MathMode::Display => f.write_str("display"),
            MathMode::Inline => f.write_str("inline"),
        }
    }
}

/// A math expression the engine could not render
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot render {mode} math `{tex}`: {message}")]
pub struct MathError {
    pub tex: String,
    pub mode: MathMode,
    pub message: String,
}

impl MathError {
    /// Only the first line of `message` is kept; engines may append
    /// multi-line source context that does not fit a tooltip.
    pub fn new(tex: impl Into<String>, mode: MathMode, message: impl AsRef<str>) -> Self {
        let message = message.as_ref().lines().next().unwrap_or_default().trim();
        Self {
            tex: tex.into(),
            mode,
            message: message.to_string(),
        }
    }

    /// Error-styled HTML shown in place of the expression
    pub fn fallback_html(&self) -> String {
        format!(
            r#"<span class="math math-error {}" title="{}"><code>{}</code></span>"#,
            self.mode.class(),
            encode_double_quoted_attribute(&self.message),
            encode_text(&self.tex),
        )
    }
}

/// Renders a single LaTeX expression to HTML
pub trait MathEngine {
    fn render(&self, tex: &str, mode: MathMode) -> Result<String, MathError>;

    /// Markup shown in place of an expression that failed to render
    fn fallback(&self, error: &MathError) -> String {
        error.fallback_html()
    }
}

/// KaTeX backed engine producing HTML.
///
/// Trusted mode is on, so commands such as `\href` and `\htmlClass` emit
/// their markup. `render` always runs in throwing mode so failures reach the
/// caller; `fallback` re-renders in no-throw mode to get KaTeX's own error
/// markup.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatexEngine;

impl LatexEngine {
    fn render_with(
        &self,
        tex: &str,
        mode: MathMode,
        throw_on_error: bool,
    ) -> Result<String, MathError> {
        let opts = Opts::builder()
            .display_mode(mode == MathMode::Display)
            .output_type(OutputType::Html)
            .trust(true)
            .throw_on_error(throw_on_error)
            .build()
            .map_err(|e| MathError::new(tex, mode, e.to_string()))?;

        katex::render_with_opts(tex, &opts).map_err(|err| {
            let message = match err {
                katex::Error::JsExecError(message) => message,
                other => other.to_string(),
            };
            MathError::new(tex, mode, message)
        })
    }
}

impl MathEngine for LatexEngine {
    fn render(&self, tex: &str, mode: MathMode) -> Result<String, MathError> {
        self.render_with(tex, mode, true)
    }

    fn fallback(&self, error: &MathError) -> String {
        match self.render_with(&error.tex, error.mode, false) {
            Ok(html) => html,
            Err(err) => {
                log::debug!("no-throw render failed: {err}");
                error.fallback_html()
            }
        }
    }
}

/// Entity-encode characters in HTML text nodes that Markdown would act on.
///
/// Rendered math is spliced into the Markdown source, so a `_` or `*` in the
/// text of a KaTeX `<span>` could otherwise start emphasis. Tag contents are
/// left alone except for newlines, which are folded so a rendered span never
/// introduces a paragraph break.
pub fn protect_for_markdown(html: &str) -> Cow<'_, str> {
    let mut in_tag = false;
    let mut cursor = 0;
    let mut output: Option<String> = None;

    for (index, ch) in html.char_indices() {
        let replacement = match ch {
            '<' => {
                in_tag = true;
                None
            }
            '>' => {
                in_tag = false;
                None
            }
            '\n' | '\r' if in_tag => Some(" "),
            '\n' => Some("&#10;"),
            '\r' => Some(""),
            _ if in_tag => None,
            '_' => Some("&#95;"),
            '*' => Some("&#42;"),
            '\\' => Some("&#92;"),
            '`' => Some("&#96;"),
            '[' => Some("&#91;"),
            ']' => Some("&#93;"),
            '~' => Some("&#126;"),
            '$' => Some("&#36;"),
            _ => None,
        };

        if let Some(replacement) = replacement {
            let out = output.get_or_insert_with(|| String::with_capacity(html.len() + 16));
            out.push_str(&html[cursor..index]);
            out.push_str(replacement);
            cursor = index + ch.len_utf8();
        }
    }

    match output {
        Some(mut out) => {
            out.push_str(&html[cursor..]);
            Cow::Owned(out)
        }
        None => Cow::Borrowed(html),
    }
}
