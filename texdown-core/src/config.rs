//! Configuration management for texdown

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::diagnostics::Diagnostic;
use crate::hook::Selector;

/// Environments treated as display math when no delimiters surround them.
pub const DEFAULT_ENVIRONMENTS: [&str; 4] = ["equation", "align", "gather", "multline"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Selector of the elements the preprocessor is registered for
    pub selector: String,
    /// Delimiter marking display math on both sides
    pub display_delimiter: String,
    /// Delimiter marking inline math on both sides
    pub inline_delimiter: String,
    /// LaTeX environments rendered as display math without explicit delimiters
    pub environments: Vec<String>,
    pub math: MathConfig,
    pub markdown: MarkdownConfig,
    pub page: PageConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MathConfig {
    /// Extract and render math spans at all
    pub enabled: bool,
    /// Fail the whole render on a malformed expression instead of falling back
    pub throw_on_error: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// GitHub-flavoured extensions (tables, strikethrough, task lists)
    pub gfm: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Title used for standalone pages when the input has no name
    pub title: Option<String>,
    /// Stylesheets linked from standalone pages
    pub stylesheets: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            selector: ".marked".to_string(),
            display_delimiter: "$$".to_string(),
            inline_delimiter: "$".to_string(),
            environments: DEFAULT_ENVIRONMENTS.iter().map(|s| s.to_string()).collect(),
            math: MathConfig::default(),
            markdown: MarkdownConfig::default(),
            page: PageConfig::default(),
        }
    }
}

impl Default for MathConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            throw_on_error: false,
        }
    }
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self { gfm: true }
    }
}

impl Config {
    /// Get the platform-specific config file path
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "texdown")
            .map(|proj_dirs| proj_dirs.config_dir().join("texdown.toml"))
    }

    /// Load configuration from file, falling back to defaults if missing
    /// Returns (Config, Vec<Diagnostic>) describing where the settings came from
    pub fn load() -> Result<(Self, Vec<Diagnostic>)> {
        let mut diagnostics = Vec::new();

        let config = match Self::config_path() {
            Some(path) if path.exists() => {
                let config = Self::load_from(&path)?;
                diagnostics.push(Diagnostic::info(
                    format!("Loaded configuration from {}", path.display()),
                    "config",
                ));
                config
            }
            _ => {
                diagnostics.push(Diagnostic::info(
                    "No configuration file found, using defaults",
                    "config",
                ));
                Self::default()
            }
        };

        diagnostics.extend(config.describe());
        Ok((config, diagnostics))
    }

    /// Load from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        check_permissions(path)?;

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Reject settings the scanner cannot work with
    pub fn validate(&self) -> Result<()> {
        Selector::parse(&self.selector)?;

        if self.display_delimiter.is_empty() {
            anyhow::bail!("display_delimiter must not be empty");
        }
        if self.inline_delimiter.is_empty() {
            anyhow::bail!("inline_delimiter must not be empty");
        }
        if self.display_delimiter == self.inline_delimiter {
            anyhow::bail!(
                "display_delimiter and inline_delimiter must differ (both are {:?})",
                self.display_delimiter
            );
        }
        if self.display_delimiter.chars().any(char::is_whitespace)
            || self.inline_delimiter.chars().any(char::is_whitespace)
        {
            anyhow::bail!("delimiters must not contain whitespace");
        }

        for name in &self.environments {
            let stem = name.strip_suffix('*').unwrap_or(name);
            if stem.is_empty() || !stem.chars().all(crate::scan::is_word_char) {
                anyhow::bail!("invalid environment name: {:?}", name);
            }
        }

        Ok(())
    }

    /// Environment names as a lookup set
    pub fn environment_set(&self) -> BTreeSet<String> {
        self.environments.iter().cloned().collect()
    }

    fn describe(&self) -> Vec<Diagnostic> {
        let mut events = Vec::new();
        if !self.math.enabled {
            events.push(Diagnostic::info(
                "Math rendering disabled, converting Markdown only",
                "config",
            ));
        }
        if self.math.throw_on_error {
            events.push(Diagnostic::info(
                "Strict math mode: malformed expressions abort rendering",
                "config",
            ));
        }
        events
    }
}

#[cfg(unix)]
fn check_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat config file: {}", path.display()))?;
    if metadata.permissions().mode() & 0o002 != 0 {
        anyhow::bail!(
            "Config file {} is world-writable (insecure permissions)",
            path.display()
        );
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.selector, ".marked");
        assert_eq!(config.display_delimiter, "$$");
        assert_eq!(config.inline_delimiter, "$");
        assert_eq!(config.environments, vec!["equation", "align", "gather", "multline"]);
        assert!(config.math.enabled);
        assert!(!config.math.throw_on_error);
        assert!(config.markdown.gfm);
        assert!(config.page.stylesheets.is_empty());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_load_valid_toml() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        let toml_content = "selector = \"div.note\"\n\
display_delimiter = \"\\\\[\"\n\
inline_delimiter = \"%\"\n\
environments = [\"equation\", \"align*\", \"cases\"]\n\
\n\
[math]\n\
enabled = true\n\
throw_on_error = true\n\
\n\
[markdown]\n\
gfm = false\n\
\n\
[page]\n\
title = \"Notes\"\n\
stylesheets = [\"style.css\"]\n";
        file.write_all(toml_content.as_bytes())?;

        let config = Config::load_from(file.path())?;
        assert_eq!(config.selector, "div.note");
        assert_eq!(config.display_delimiter, "\\[");
        assert_eq!(config.inline_delimiter, "%");
        assert!(config.environment_set().contains("align*"));
        assert!(config.environment_set().contains("cases"));
        assert!(config.math.throw_on_error);
        assert!(!config.markdown.gfm);
        assert_eq!(config.page.title.as_deref(), Some("Notes"));
        assert_eq!(config.page.stylesheets, vec!["style.css"]);

        Ok(())
    }

    #[test]
    fn test_load_partial_toml() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"inline_delimiter = \"%\"\n\n[math]\nthrow_on_error = true\n")?;

        let config = Config::load_from(file.path())?;
        assert_eq!(config.inline_delimiter, "%");
        assert_eq!(config.display_delimiter, "$$");
        assert!(config.math.enabled);
        assert!(config.math.throw_on_error);
        assert_eq!(config.environments.len(), 4);

        Ok(())
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"invalid toml [[[syntax").unwrap();

        let result = Config::load_from(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_empty_delimiter() {
        let config = Config {
            inline_delimiter: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_identical_delimiters() {
        let config = Config {
            display_delimiter: "$".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_environment_name() {
        let config = Config {
            environments: vec!["equ ation".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_rejects_invalid_settings() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"display_delimiter = \"\"\n")?;
        assert!(Config::load_from(file.path()).is_err());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn security_rejects_world_writable_config() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let file = NamedTempFile::new()?;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o666))?;

        let result = Config::load_from(file.path());
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn test_config_path_returns_some() {
        let path = Config::config_path();
        assert!(path.is_some());
        if let Some(p) = path {
            assert!(p.to_string_lossy().contains("texdown"));
            assert!(p.to_string_lossy().ends_with("texdown.toml"));
        }
    }

    #[test]
    fn test_config_serialization_roundtrip() -> Result<()> {
        let config = Config {
            selector: "#content".to_string(),
            ..Default::default()
        };

        let toml_str = toml::to_string(&config)?;
        assert!(toml_str.contains("#content"));

        let parsed: Config = toml::from_str(&toml_str)?;
        assert_eq!(parsed, config);

        Ok(())
    }
}
