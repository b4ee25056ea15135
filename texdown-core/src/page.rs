//! Standalone HTML page wrapper

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::config::PageConfig;

/// Wrap rendered fragments in a complete HTML document
pub fn standalone(config: &PageConfig, title: Option<&str>, body: &str) -> String {
    let title = title
        .or(config.title.as_deref())
        .unwrap_or("texdown");

    let mut page = String::with_capacity(body.len() + 256);
    page.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    page.push_str("<title>");
    page.push_str(&encode_text(title));
    page.push_str("</title>\n");
    for href in &config.stylesheets {
        page.push_str("<link rel=\"stylesheet\" href=\"");
        page.push_str(&encode_double_quoted_attribute(href));
        page.push_str("\">\n");
    }
    page.push_str("</head>\n<body>\n");
    page.push_str(body);
    if !body.ends_with('\n') {
        page.push('\n');
    }
    page.push_str("</body>\n</html>\n");
    page
}
