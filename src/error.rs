// src/error.rs

//! Error types for gencontrol
//!
//! Nothing in the library recovers from these locally: every error unwinds to
//! the command that started the run, and the run is aborted before any output
//! file is written.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for gencontrol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading configuration, generating records or writing output
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value failed type coercion
    #[error("Invalid value for {category}.{key} ({value:?}): {reason}")]
    Schema {
        category: String,
        key: String,
        value: String,
        reason: String,
    },

    /// A required axis declaration is missing
    #[error("Missing axis declaration: {0}")]
    MissingAxis(String),

    /// A required configuration key is missing where it is used
    #[error("Missing required key '{key}' in {context}")]
    MissingKey { key: String, context: String },

    /// Malformed package relation text
    #[error("Can't parse dependency {0:?}")]
    RelationParse(String),

    /// Malformed configuration fragment
    #[error("{}:{line}: {message}", path.display())]
    FragmentParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Malformed control template
    #[error("Template {name}: {message}")]
    TemplateParse { name: String, message: String },

    /// Template not present in any template directory
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// `@name@` placeholder without a value
    #[error("No value for @{name}@ in {text:?}")]
    Substitution { name: String, text: String },

    /// A record lacks a field the output format requires
    #[error("Missing mandatory field '{field}' in stanza {stanza}")]
    MissingField { field: String, stanza: String },

    /// A required file is missing from every config directory
    #[error("{0} unavailable")]
    FileUnavailable(String),

    /// External tool exited unsuccessfully
    #[error("{tool} failed with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    /// External tool could not be started
    #[error("Failed to run {tool}: {source}")]
    ToolSpawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// Version string does not follow the expected format
    #[error("Invalid version {version:?}: {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::MissingKey`]
    pub fn missing_key(key: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingKey {
            key: key.into(),
            context: context.into(),
        }
    }
}
