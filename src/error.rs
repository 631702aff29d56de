//! # Error Handling
//!
//! This module defines the centralized error type for `fragment-link`. It uses
//! the `thiserror` library to build an `Error` enum covering every failure the
//! library can report, each with enough context to locate the problem.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Struct-like variants carry a `message` plus
//!   contextual fields (`path`, `expression`, `project_id`, `cycle`, ...).
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! ## Fatal vs. local errors
//!
//! Most errors raised while resolving a single link never reach the caller:
//! they are turned into a link status written onto the link element. The
//! guards that bound a whole resolution tree (cycle detection, depth limit,
//! target limit, deadline) are different. `Error::is_fatal` reports them, and
//! they propagate through stage isolation and out of the resolver call.

use thiserror::Error;

/// Main error type for fragment-link operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error occurred while parsing the YAML configuration file.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A document could not be parsed, serialized or mutated.
    #[error("XML error{}: {message}", path.as_ref().map(|p| format!(" in {}", p)).unwrap_or_default())]
    Xml {
        message: String,
        /// The file the document came from, when known
        path: Option<String>,
    },

    /// A selector could not be turned into a query.
    #[error("Query error in '{expression}': {message}")]
    Query { expression: String, message: String },

    /// A reference named a project the path resolver does not know.
    #[error("Unknown project: {project_id}")]
    UnknownProject { project_id: String },

    /// A synchronization stage failed for one target document.
    #[error("Synchronization stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    /// A target was requested while it was still being resolved higher up
    /// the same resolution tree.
    #[error("Cycle detected in fragment references: {cycle}")]
    CycleDetected { cycle: String },

    /// Nested resolution went deeper than the configured limit.
    #[error("Resolution depth {depth} exceeds the limit of {limit} (path: {path})")]
    DepthExceeded {
        depth: usize,
        limit: usize,
        path: String,
    },

    /// A single resolution loaded more distinct targets than allowed.
    #[error("Resolution loaded more than {limit} target documents")]
    TargetLimitExceeded { limit: usize },

    /// A resolution ran past its deadline.
    #[error("Resolution exceeded its deadline of {limit_ms}ms")]
    DeadlineExceeded { limit_ms: u64 },

    /// An error occurred with a host filesystem operation.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON parsing error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

impl Error {
    /// Returns true for errors that abort the whole resolution tree.
    ///
    /// These cross the per-stage isolation of the loader instead of being
    /// logged and skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::CycleDetected { .. }
                | Error::DepthExceeded { .. }
                | Error::TargetLimitExceeded { .. }
                | Error::DeadlineExceeded { .. }
        )
    }

    /// Wrap an `xot` error (or any displayable error) as an XML error.
    pub fn xml(err: impl std::fmt::Display) -> Self {
        Error::Xml {
            message: err.to_string(),
            path: None,
        }
    }

    /// Wrap an `xot` error as an XML error for a specific file.
    pub fn xml_in(err: impl std::fmt::Display, path: impl Into<String>) -> Self {
        Error::Xml {
            message: err.to_string(),
            path: Some(path.into()),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
