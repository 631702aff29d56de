//! Cleanup command implementation
//!
//! Runs the cleanup pass on a fragment so it can be stored again. Without
//! `--output` or `--in-place` the cleaned document is printed.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use fragment_link::cleanup::{cleanup_links, save_document};
use fragment_link::document::{parse_document, serialize};
use xot::Xot;

use super::{load_config, read_source};

/// Arguments for the cleanup command
#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Fragment file to clean
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Language of the content to clean
    #[arg(short, long, value_name = "LANG")]
    pub lang: String,

    /// Write the cleaned document here
    #[arg(short, long, value_name = "FILE", conflicts_with = "in_place")]
    pub output: Option<PathBuf>,

    /// Overwrite FILE with the cleaned document
    #[arg(long)]
    pub in_place: bool,
}

/// Execute the cleanup command
pub fn execute(args: CleanupArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let source = read_source(&args.file)?;
    let label = args.file.display().to_string();

    let mut xot = Xot::new();
    let document = parse_document(&mut xot, &source, Some(&label))?;

    let destination = if args.in_place {
        Some(args.file.clone())
    } else {
        args.output.clone()
    };

    match destination {
        Some(path) => {
            save_document(&mut xot, document, &config.markup, &args.lang, &path)
                .with_context(|| format!("Failed to save {}", path.display()))?;
            log::info!("Saved cleaned {} to {}", label, path.display());
        }
        None => {
            let cleaned = cleanup_links(&mut xot, document, &config.markup, &args.lang)?;
            log::info!("Cleaned {} link elements in {}", cleaned, label);
            println!("{}", serialize(&xot, document)?);
        }
    }
    Ok(())
}
