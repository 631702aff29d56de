//! Resolve command implementation
//!
//! Reads one fragment, resolves its links and prints the resolved document (or
//! writes it with `--output`). The resolved document is a rendering artifact:
//! writing it over its own source file is refused, since stored fragments
//! must only ever be saved through the cleanup pass.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use fragment_link::document::{parse_document, serialize};
use fragment_link::{ResolutionReport, Resolver};
use xot::Xot;

use super::{content_root, load_config, read_source, source_context};

/// Arguments for the resolve command
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Fragment file to resolve
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Project the fragment belongs to
    #[arg(short, long, value_name = "ID")]
    pub project: String,

    /// Language of the content to resolve
    #[arg(short, long, value_name = "LANG")]
    pub lang: String,

    /// Content root of the project (defaults to the configured root, then the
    /// file's folder)
    #[arg(long, value_name = "DIR")]
    pub content_root: Option<PathBuf>,

    /// Write the resolved document here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print the per-link report as JSON instead of the document
    #[arg(long)]
    pub report: bool,
}

/// Execute the resolve command
pub fn execute(args: ResolveArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let resolver = Resolver::from_config(&config)?;
    let root = content_root(args.content_root.as_deref(), &config, &args.project, &args.file);
    let context = source_context(&args.project, &args.lang, &root, &args.file);

    if let Some(output) = &args.output {
        if same_file(output, &args.file) {
            anyhow::bail!(
                "Refusing to overwrite {} with resolved content; use `cleanup` to save fragments",
                args.file.display()
            );
        }
    }

    let source = read_source(&args.file)?;
    let mut xot = Xot::new();
    let label = args.file.display().to_string();
    let document = parse_document(&mut xot, &source, Some(&label))?;

    let report = resolver
        .resolve_report(&mut xot, document, &context, &root)
        .with_context(|| format!("Failed to resolve {}", args.file.display()))?;
    log_summary(&label, &report);

    if args.report {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let xml = serialize(&xot, document)?;
    match &args.output {
        Some(output) => {
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(output, xml)
                .with_context(|| format!("Failed to write {}", output.display()))?;
        }
        None => println!("{}", xml),
    }
    Ok(())
}

pub(crate) fn log_summary(label: &str, report: &ResolutionReport) {
    let broken = report
        .links
        .iter()
        .filter(|link| link.status.is_some_and(|status| !status.is_ok()))
        .count();
    log::info!(
        "{}: {} links, {} broken, {} targets loaded",
        label,
        report.links.len(),
        broken,
        report.targets_loaded
    );
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
