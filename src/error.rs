//! Error types
//!
//! Configuration problems surface once, when a ruleset is loaded or bound.
//! Transformation failures are scoped to the single field being evaluated.

use thiserror::Error;

/// Malformed ruleset, detected before any extraction runs
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read ruleset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Ruleset is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid rule at '{path}': {reason}")]
    InvalidRule { path: String, reason: String },

    #[error("Invalid selector '{selector}' at '{path}': {reason}")]
    InvalidSelector {
        path: String,
        selector: String,
        reason: String,
    },

    #[error("Invalid regex '{pattern}' at '{path}': {reason}")]
    InvalidRegex {
        path: String,
        pattern: String,
        reason: String,
    },

    #[error("Unknown transformation '{name}' at '{path}'")]
    UnknownTransformation { path: String, name: String },

    #[error("Invalid parameters for transformation '{name}' at '{path}': {source}")]
    InvalidParameters {
        path: String,
        name: String,
        #[source]
        source: TransformError,
    },
}

/// Failure of a single transformation step
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("Expected {expected}, got {actual}")]
    UnexpectedInput {
        expected: &'static str,
        actual: String,
    },

    #[error("Cannot parse '{input}' as {target}")]
    Unparseable { input: String, target: &'static str },

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("{0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
