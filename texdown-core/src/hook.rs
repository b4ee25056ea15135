//! Element hooks: run a callback once per element matching a selector
//!
//! The host (a page renderer, the CLI, a test) owns the elements and calls
//! [`HookRegistry::apply`] whenever elements are loaded or swapped in.

use anyhow::{Context, Result};
use html_escape::encode_text;
use std::borrow::Cow;
use std::fmt;

use crate::diagnostics::Diagnostic;
use crate::math::MathEngine;
use crate::preprocess::Preprocessor;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unsupported character {found:?} in selector {selector:?}")]
    Unsupported { selector: String, found: char },
    #[error("missing name after {prefix:?} in selector {selector:?}")]
    MissingName { selector: String, prefix: char },
}

/// One compound selector such as `div.note#intro`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

/// A comma-separated list of simple compound selectors.
///
/// Supports type (`div`, `*`), class (`.marked`) and id (`#main`)
/// selectors; combinators, attributes and pseudo-classes are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Compound>,
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let alternatives = source
            .split(',')
            .map(|part| parse_compound(source, part.trim()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source: source.trim().to_string(),
            alternatives,
        })
    }

    pub fn matches<E: Element + ?Sized>(&self, element: &E) -> bool {
        self.alternatives.iter().any(|compound| {
            compound
                .tag
                .as_deref()
                .map_or(true, |tag| tag.eq_ignore_ascii_case(element.tag_name()))
                && compound
                    .id
                    .as_deref()
                    .map_or(true, |id| element.id() == Some(id))
                && compound.classes.iter().all(|class| element.has_class(class))
        })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn parse_compound(selector: &str, part: &str) -> Result<Compound, SelectorError> {
    if part.is_empty() {
        return Err(SelectorError::Empty);
    }

    let mut compound = Compound::default();
    let mut rest = part;

    if let Some(after) = rest.strip_prefix('*') {
        rest = after;
    } else {
        let end = rest.find(|c| !is_name_char(c)).unwrap_or(rest.len());
        if end > 0 {
            compound.tag = Some(rest[..end].to_ascii_lowercase());
            rest = &rest[end..];
        }
    }

    while let Some(prefix) = rest.chars().next() {
        if prefix != '.' && prefix != '#' {
            return Err(SelectorError::Unsupported {
                selector: selector.to_string(),
                found: prefix,
            });
        }
        let body = &rest[1..];
        let end = body.find(|c| !is_name_char(c)).unwrap_or(body.len());
        if end == 0 {
            return Err(SelectorError::MissingName {
                selector: selector.to_string(),
                prefix,
            });
        }
        let name = body[..end].to_string();
        if prefix == '.' {
            compound.classes.push(name);
        } else {
            compound.id = Some(name);
        }
        rest = &body[end..];
    }

    Ok(compound)
}

/// The parts of a DOM element a hook needs
pub trait Element {
    fn tag_name(&self) -> &str;
    fn id(&self) -> Option<&str>;
    fn has_class(&self, class: &str) -> bool;
    /// Raw text of the element
    fn text_content(&self) -> Cow<'_, str>;
    fn set_inner_html(&mut self, html: String);
}

/// In-memory element holding source text and, once rendered, its HTML
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextElement {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    text: String,
    html: Option<String>,
}

impl TextElement {
    pub fn new(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            classes: Vec::new(),
            text: text.into(),
            html: None,
        }
    }

    /// Build an element that the first alternative of `selector` matches
    pub fn matching(selector: &Selector, text: impl Into<String>) -> Self {
        let compound = selector.alternatives.first().cloned().unwrap_or_default();
        Self {
            tag: compound.tag.unwrap_or_else(|| "div".to_string()),
            id: compound.id,
            classes: compound.classes,
            text: text.into(),
            html: None,
        }
    }

    #[cfg(test)]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Rendered HTML, or the escaped text if no hook has written to it
    pub fn inner_html(&self) -> Cow<'_, str> {
        match &self.html {
            Some(html) => Cow::Borrowed(html.as_str()),
            None => encode_text(&self.text),
        }
    }

    #[cfg(test)]
    pub fn is_rendered(&self) -> bool {
        self.html.is_some()
    }
}

impl Element for TextElement {
    fn tag_name(&self) -> &str {
        &self.tag
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    fn text_content(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.text.as_str())
    }

    fn set_inner_html(&mut self, html: String) {
        self.html = Some(html);
    }
}

type Callback = Box<dyn Fn(&mut dyn Element) -> Result<()>>;

struct Hook {
    selector: Selector,
    callback: Callback,
}

/// Registered selector/callback pairs
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Hook>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for every element matching `selector`
    pub fn register<F>(&mut self, selector: &str, callback: F) -> Result<(), SelectorError>
    where
        F: Fn(&mut dyn Element) -> Result<()> + 'static,
    {
        let selector = Selector::parse(selector)?;
        log::debug!("registered hook for {selector}");
        self.hooks.push(Hook {
            selector,
            callback: Box::new(callback),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Fire every hook once per matching element, in registration order.
    ///
    /// Returns how many callbacks ran. The first callback error stops
    /// processing and is returned to the caller.
    pub fn apply<E: Element>(&self, elements: &mut [E]) -> Result<usize> {
        let mut fired = 0;
        for (index, element) in elements.iter_mut().enumerate() {
            for hook in &self.hooks {
                if !hook.selector.matches(&*element) {
                    continue;
                }
                let outcome = (hook.callback)(element)
                    .with_context(|| format!("Hook {} failed on element {index}", hook.selector));
                if let Err(err) = &outcome {
                    Diagnostic::from_error(err, "hook").log();
                }
                outcome?;
                fired += 1;
            }
        }
        Ok(fired)
    }
}

/// Attach a preprocessor to its selector: each matching element's text is
/// rendered and written back as the element's HTML.
pub fn install<E>(registry: &mut HookRegistry, preprocessor: Preprocessor<E>) -> Result<()>
where
    E: MathEngine + 'static,
{
    let selector = preprocessor.selector().to_string();
    registry.register(&selector, move |element| {
        let rendered = preprocessor.render(&element.text_content())?;
        for diagnostic in &rendered.diagnostics {
            diagnostic.log();
        }
        element.set_inner_html(rendered.html);
        Ok(())
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_parse_class_selector() {
        let selector = Selector::parse(".marked").unwrap();
        assert!(selector.matches(&TextElement::new("div", "").with_class("marked")));
        assert!(selector.matches(&TextElement::new("p", "").with_class("marked")));
        assert!(!selector.matches(&TextElement::new("div", "")));
    }

    #[test]
    fn test_parse_compound_selector() {
        let selector = Selector::parse("DIV.note.math#intro").unwrap();
        let element = TextElement::new("div", "")
            .with_class("note")
            .with_class("math")
            .with_id("intro");
        assert!(selector.matches(&element));
        assert!(!selector.matches(&TextElement::new("div", "").with_class("note")));
        assert!(!selector.matches(
            &TextElement::new("span", "")
                .with_class("note")
                .with_class("math")
                .with_id("intro")
        ));
    }

    #[test]
    fn test_selector_list() {
        let selector = Selector::parse("article, .marked").unwrap();
        assert!(selector.matches(&TextElement::new("article", "")));
        assert!(selector.matches(&TextElement::new("div", "").with_class("marked")));
        assert!(!selector.matches(&TextElement::new("div", "")));
    }

    #[test]
    fn test_universal_selector() {
        let selector = Selector::parse("*").unwrap();
        assert!(selector.matches(&TextElement::new("section", "")));
    }

    #[test]
    fn test_rejects_unsupported_selectors() {
        assert_eq!(Selector::parse(""), Err(SelectorError::Empty));
        assert_eq!(Selector::parse("a,"), Err(SelectorError::Empty));
        assert!(matches!(
            Selector::parse("div p"),
            Err(SelectorError::Unsupported { found: ' ', .. })
        ));
        assert!(matches!(
            Selector::parse("a[href]"),
            Err(SelectorError::Unsupported { found: '[', .. })
        ));
        assert!(matches!(
            Selector::parse("div."),
            Err(SelectorError::MissingName { prefix: '.', .. })
        ));
    }

    #[test]
    fn test_matching_element() {
        let selector = Selector::parse("section.doc#top, p").unwrap();
        let element = TextElement::matching(&selector, "text");
        assert_eq!(element.tag_name(), "section");
        assert_eq!(element.id(), Some("top"));
        assert!(element.has_class("doc"));
        assert!(selector.matches(&element));
    }

    #[test]
    fn test_inner_html_defaults_to_escaped_text() {
        let element = TextElement::new("div", "a < b");
        assert_eq!(element.inner_html(), "a &lt; b");
        assert!(!element.is_rendered());
    }

    #[test]
    fn test_registry_fires_once_per_matching_element() -> Result<()> {
        let count = Rc::new(Cell::new(0));
        let seen = Rc::clone(&count);

        let mut registry = HookRegistry::new();
        registry.register(".marked", move |element| {
            seen.set(seen.get() + 1);
            element.set_inner_html(format!("<b>{}</b>", element.text_content()));
            Ok(())
        })?;
        assert_eq!(registry.len(), 1);

        let mut elements = vec![
            TextElement::new("div", "one").with_class("marked"),
            TextElement::new("div", "two"),
            TextElement::new("p", "three").with_class("marked"),
        ];
        let fired = registry.apply(&mut elements)?;

        assert_eq!(fired, 2);
        assert_eq!(count.get(), 2);
        assert_eq!(elements[0].inner_html(), "<b>one</b>");
        assert!(!elements[1].is_rendered());
        assert_eq!(elements[2].inner_html(), "<b>three</b>");
        Ok(())
    }

    #[test]
    fn test_callback_error_surfaces() {
        let mut registry = HookRegistry::new();
        registry
            .register("div", |_| Err(anyhow::anyhow!("boom")))
            .unwrap();

        let mut elements = vec![TextElement::new("div", "x")];
        let err = registry.apply(&mut elements).unwrap_err();
        assert!(format!("{err:#}").contains("boom"));
        assert!(!elements[0].is_rendered());

        let diagnostic = Diagnostic::from_error(&err, "hook");
        assert_eq!(diagnostic.level, crate::DiagnosticLevel::Error);
        assert_eq!(diagnostic.message, "Hook div failed on element 0: boom");
    }

    #[test]
    fn test_install_renders_matching_elements() -> Result<()> {
        let preprocessor = Preprocessor::new(&Config::default())?;
        let mut registry = HookRegistry::new();
        install(&mut registry, preprocessor)?;

        let mut elements = vec![
            TextElement::new("div", "Price is $5$ dollars").with_class("marked"),
            TextElement::new("div", "Price is $5$ dollars"),
        ];
        registry.apply(&mut elements)?;

        let html = elements[0].inner_html();
        assert!(html.starts_with("<p>Price is "));
        assert!(html.contains("class=\"katex\""));
        assert!(html.contains("dollars</p>"));
        assert!(!elements[1].is_rendered());
        Ok(())
    }
}
