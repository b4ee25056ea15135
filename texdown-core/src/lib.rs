//! texdown core - Markdown with LaTeX math to HTML
//!
//! This crate contains the rendering pipeline, independent of any host:
//! - Environment tagging and delimiter scanning
//! - Math rendering (KaTeX, HTML output) with error fallbacks
//! - Markdown conversion (pulldown-cmark)
//! - Element hooks that attach the pipeline to a selector
//! - Configuration management

pub mod config;
pub mod diagnostics;
pub mod doc;
pub mod environment;
pub mod hook;
pub mod markdown;
pub mod math;
pub mod page;
pub mod preprocess;
pub mod scan;

// Re-export commonly used types
pub use config::Config;
pub use diagnostics::{Diagnostic, DiagnosticLevel};
pub use doc::Document;
pub use hook::{install, Element, HookRegistry, Selector, TextElement};
pub use math::{LatexEngine, MathEngine, MathError, MathMode};
pub use preprocess::{Preprocessor, RenderError, Rendered};
