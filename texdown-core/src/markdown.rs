//! Markdown to HTML conversion

use pulldown_cmark::{html, Options, Parser};

use crate::config::MarkdownConfig;

/// Parser options for the configured flavour
pub fn options(config: &MarkdownConfig) -> Options {
    let mut options = Options::empty();
    if config.gfm {
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
    }
    options
}

/// Convert Markdown source to HTML
pub fn to_html(source: &str, options: Options) -> String {
    let parser = Parser::new_ext(source, options);
    let mut output = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}
