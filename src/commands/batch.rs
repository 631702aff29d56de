//! Batch command implementation
//!
//! Resolves every fragment matching a glob pattern. Files are processed in
//! parallel with `rayon`; each file gets its own `Xot` arena and its own
//! resolution session, so nothing is shared between files except the
//! read-only resolver.

use anyhow::Result;
use clap::Args;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use fragment_link::document::{parse_document, serialize};
use fragment_link::store::glob_fragments;
use fragment_link::Resolver;
use xot::Xot;

use super::resolve::log_summary;
use super::{content_root, load_config, read_source, source_context};

/// Arguments for the batch command
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Glob pattern selecting the fragments to resolve (e.g. "content/**/*.xml")
    #[arg(value_name = "PATTERN")]
    pub pattern: String,

    /// Project the fragments belong to
    #[arg(short, long, value_name = "ID")]
    pub project: String,

    /// Language of the content to resolve
    #[arg(short, long, value_name = "LANG")]
    pub lang: String,

    /// Content root of the project
    #[arg(long, value_name = "DIR")]
    pub content_root: Option<PathBuf>,

    /// Directory receiving the resolved documents
    #[arg(long, value_name = "DIR")]
    pub out_dir: PathBuf,
}

/// Execute the batch command
pub fn execute(args: BatchArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let resolver = Resolver::from_config(&config)?;

    let files = glob_fragments(&args.pattern)?;
    if files.is_empty() {
        anyhow::bail!("No files match {}", args.pattern);
    }

    let failures: Vec<(PathBuf, anyhow::Error)> = files
        .par_iter()
        .filter_map(|file| {
            let root = content_root(args.content_root.as_deref(), &config, &args.project, file);
            resolve_one(&resolver, &args, &root, file)
                .err()
                .map(|err| (file.clone(), err))
        })
        .collect();

    println!(
        "Resolved {} of {} fragments into {}",
        files.len() - failures.len(),
        files.len(),
        args.out_dir.display()
    );
    for (file, err) in &failures {
        eprintln!("  {}: {:#}", file.display(), err);
    }
    if !failures.is_empty() {
        anyhow::bail!("{} fragments failed to resolve", failures.len());
    }
    Ok(())
}

fn resolve_one(resolver: &Resolver, args: &BatchArgs, root: &Path, file: &Path) -> Result<()> {
    let context = source_context(&args.project, &args.lang, root, file);
    let source = read_source(file)?;
    let label = file.display().to_string();

    let mut xot = Xot::new();
    let document = parse_document(&mut xot, &source, Some(&label))?;
    let report = resolver.resolve_report(&mut xot, document, &context, root)?;
    log_summary(&label, &report);

    let destination = args.out_dir.join(output_name(root, file));
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&destination, serialize(&xot, document)?)?;
    Ok(())
}

/// Path of `file` below the content root, or its file name when it lies
/// elsewhere
fn output_name(root: &Path, file: &Path) -> PathBuf {
    match file.strip_prefix(root) {
        Ok(relative) => relative.to_path_buf(),
        Err(_) => file
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("fragment.xml")),
    }
}
