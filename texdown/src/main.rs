//! texdown - Render Markdown with LaTeX math to HTML

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use texdown_core::{install, page, Config, Document, HookRegistry, Preprocessor, TextElement};

/// Render Markdown containing LaTeX math to HTML
#[derive(Parser, Debug)]
#[command(name = "texdown")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Markdown files to render (reads stdin when none are given)
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Write HTML here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Emit a complete HTML page instead of a fragment
    #[arg(long)]
    standalone: bool,

    /// Convert Markdown only, leaving math delimiters as text
    #[arg(long)]
    no_math: bool,

    /// Fail on the first malformed math expression
    #[arg(long)]
    strict: bool,

    /// Delimiter for display math
    #[arg(long, value_name = "DELIM")]
    display_delimiter: Option<String>,

    /// Delimiter for inline math
    #[arg(long, value_name = "DELIM")]
    inline_delimiter: Option<String>,

    /// Environment rendered as display math (repeatable, replaces the configured list)
    #[arg(long = "env", value_name = "NAME")]
    environments: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
        None => {
            let (config, diagnostics) =
                Config::load().context("Failed to load configuration")?;
            for diagnostic in &diagnostics {
                diagnostic.log();
            }
            config
        }
    };
    let config = apply_overrides(config, &args);
    config.validate().context("Invalid configuration")?;

    // Load documents
    let documents = load_documents(&args.files)?;

    // Attach the preprocessor to the configured selector
    let preprocessor = Preprocessor::new(&config)?;
    let selector = preprocessor.selector().clone();
    let mut registry = HookRegistry::new();
    install(&mut registry, preprocessor)?;

    let mut elements: Vec<TextElement> = documents
        .iter()
        .map(|doc| TextElement::matching(&selector, doc.source.as_str()))
        .collect();
    let fired = registry.apply(&mut elements)?;
    log::debug!("rendered {fired} element(s)");

    let body: String = elements.iter().map(|el| el.inner_html()).collect();
    let html = if args.standalone {
        let title = documents.first().and_then(Document::name);
        page::standalone(&config.page, title.as_deref(), &body)
    } else {
        body
    };

    write_output(args.output.as_ref(), &html)
}

/// Command-line flags take precedence over the configuration file
fn apply_overrides(mut config: Config, args: &Args) -> Config {
    if args.no_math {
        config.math.enabled = false;
    }
    if args.strict {
        config.math.throw_on_error = true;
    }
    if let Some(delim) = &args.display_delimiter {
        config.display_delimiter = delim.clone();
    }
    if let Some(delim) = &args.inline_delimiter {
        config.inline_delimiter = delim.clone();
    }
    if !args.environments.is_empty() {
        config.environments = args.environments.clone();
    }
    config
}

fn load_documents(files: &[PathBuf]) -> Result<Vec<Document>> {
    if files.is_empty() {
        return Ok(vec![Document::from_reader(io::stdin().lock())?]);
    }

    files
        .iter()
        .map(|path| {
            Document::load(path)
                .with_context(|| format!("Failed to load document: {}", path.display()))
        })
        .collect()
}

fn write_output(path: Option<&PathBuf>, html: &str) -> Result<()> {
    match path {
        Some(path) => fs::write(path, html)
            .with_context(|| format!("Failed to write output: {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(html.as_bytes())
                .and_then(|_| stdout.flush())
                .context("Failed to write to stdout")
        }
    }
}
