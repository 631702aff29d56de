//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `fragment-link` command-line tool, one file per command.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and the global
//!   configuration path and performs the command's logic.
//!
//! Helpers shared by several commands (configuration loading, content root
//! lookup, reading a source document) live here.

pub mod batch;
pub mod cleanup;
pub mod inspect;
pub mod resolve;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use fragment_link::config::{self, Config};
use fragment_link::ProjectContext;

/// Configuration file looked up in the working directory when `--config` is
/// not given
pub const DEFAULT_CONFIG_FILE: &str = "fragment-link.yaml";

/// Load the configuration named on the command line, the default file when it
/// exists, or the built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            config::from_file(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))
        }
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                log::debug!("Using {}", DEFAULT_CONFIG_FILE);
                Ok(config::from_file(default)?)
            } else {
                Ok(Config::default())
            }
        }
    }
}

/// Content root of `project_id`: the explicit flag, then the configuration,
/// then the folder holding `file`.
pub fn content_root(
    explicit: Option<&Path>,
    config: &Config,
    project_id: &str,
    file: &Path,
) -> PathBuf {
    if let Some(root) = explicit {
        return root.to_path_buf();
    }
    if let Some(entry) = config.projects.get(project_id) {
        return entry.content_root.clone();
    }
    file.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Project context for `file`, registering its data reference when the file
/// lies below the content root.
pub fn source_context(project_id: &str, lang: &str, content_root: &Path, file: &Path) -> ProjectContext {
    let context = ProjectContext::new(project_id, lang);
    let relative = absolute(file)
        .strip_prefix(absolute(content_root))
        .ok()
        .map(|relative| relative.to_string_lossy().replace('\\', "/"));
    match relative {
        Some(reference) if !reference.is_empty() => context.with_source(reference),
        _ => context,
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Read a file with a readable error
pub fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
