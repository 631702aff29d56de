//! # Fragment Link CLI
//!
//! This is the binary entry point for the `fragment-link` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Reporting top-level errors through `anyhow`.
//!
//! Resolution itself lives in the `fragment_link` library crate; the binary
//! only loads configuration, reads and writes files, and prints results.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
