//! The math-markdown pipeline: tag environments, render math, convert Markdown

use anyhow::Result;
use pulldown_cmark::Options;
use std::collections::BTreeSet;

use crate::config::{Config, MathConfig};
use crate::diagnostics::Diagnostic;
use crate::environment::tag_environments;
use crate::hook::Selector;
use crate::markdown;
use crate::math::{protect_for_markdown, LatexEngine, MathEngine, MathError, MathMode};
use crate::scan::{self, Segment};

/// Errors that abort rendering of a whole element
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Only raised when `math.throw_on_error` is set
    #[error(transparent)]
    Math(#[from] MathError),
}

/// Rendered HTML plus what happened on the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub html: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Converts element text containing Markdown and LaTeX math into HTML.
///
/// Immutable once built; every call is independent of the previous ones.
#[derive(Debug, Clone)]
pub struct Preprocessor<E = LatexEngine> {
    selector: Selector,
    display_delimiter: String,
    inline_delimiter: String,
    environments: BTreeSet<String>,
    math: MathConfig,
    markdown_options: Options,
    engine: E,
}

impl Preprocessor<LatexEngine> {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_engine(config, LatexEngine)
    }
}

impl<E: MathEngine> Preprocessor<E> {
    /// Build a preprocessor around a custom math engine
    pub fn with_engine(config: &Config, engine: E) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            selector: Selector::parse(&config.selector)?,
            display_delimiter: config.display_delimiter.clone(),
            inline_delimiter: config.inline_delimiter.clone(),
            environments: config.environment_set(),
            math: config.math.clone(),
            markdown_options: markdown::options(&config.markdown),
            engine,
        })
    }

    /// Selector of the elements this preprocessor should be attached to
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Render content to HTML
    pub fn process(&self, content: &str) -> Result<String, RenderError> {
        self.render(content).map(|rendered| rendered.html)
    }

    /// Render content to HTML, keeping the diagnostics
    pub fn render(&self, content: &str) -> Result<Rendered, RenderError> {
        let mut diagnostics = Vec::new();

        if !self.math.enabled {
            return Ok(Rendered {
                html: markdown::to_html(content, self.markdown_options),
                diagnostics,
            });
        }

        let tagged = tag_environments(content, &self.environments, &self.display_delimiter);
        let segments = scan::split(&tagged, &self.display_delimiter, &self.inline_delimiter);

        let mut source = String::with_capacity(tagged.len() * 2);
        for segment in segments {
            match segment {
                Segment::Text(text) => source.push_str(text),
                Segment::Math { tex, mode } => {
                    let html = self.render_math(tex, mode, &mut diagnostics)?;
                    source.push_str(&html);
                }
            }
        }

        Ok(Rendered {
            html: markdown::to_html(&source, self.markdown_options),
            diagnostics,
        })
    }

    fn render_math(
        &self,
        tex: &str,
        mode: MathMode,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<String, RenderError> {
        let html = match self.engine.render(tex, mode) {
            Ok(html) => {
                log::debug!("rendered {mode} math: {tex}");
                html
            }
            Err(err) if self.math.throw_on_error => return Err(err.into()),
            Err(err) => {
                log::warn!("{err}");
                diagnostics.push(Diagnostic::warning(err.to_string(), "math"));
                self.engine.fallback(&err)
            }
        };
        Ok(protect_for_markdown(&html).into_owned())
    }
}
