//! Diagnostic events collected while loading configuration and rendering

use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    /// Informational event
    Info,
    /// Something was rendered in a degraded form
    Warning,
    /// Processing could not continue
    Error,
}

/// A diagnostic produced during operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level of the event
    pub level: DiagnosticLevel,
    /// Human-readable message
    pub message: String,
    /// Source of the event (e.g., "config", "math", "hook")
    pub source: String,
}

impl Diagnostic {
    /// Create a new diagnostic
    pub fn new(
        level: DiagnosticLevel,
        message: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            level,
            message: message.into(),
            source: source.into(),
        }
    }

    /// Create a warning event
    pub fn warning(message: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warning, message, source)
    }

    /// Create an info event
    pub fn info(message: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Info, message, source)
    }

    /// Create an error event
    pub fn error(message: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, message, source)
    }

    /// Create an error event from a failure, with its context chain on one line
    pub fn from_error(err: &anyhow::Error, source: impl Into<String>) -> Self {
        Self::error(format!("{err:#}"), source)
    }

    /// Forward this diagnostic to the `log` facade at the matching level
    pub fn log(&self) {
        match self.level {
            DiagnosticLevel::Info => log::info!("[{}] {}", self.source, self.message),
            DiagnosticLevel::Warning => log::warn!("[{}] {}", self.source, self.message),
            DiagnosticLevel::Error => log::error!("[{}] {}", self.source, self.message),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            DiagnosticLevel::Info => "info",
            DiagnosticLevel::Warning => "warning",
            DiagnosticLevel::Error => "error",
        };
        write!(f, "{level}[{}]: {}", self.source, self.message)
    }
}
