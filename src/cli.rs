//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands;

/// Fragment Link - Resolve cross-document references between XML fragments
#[derive(Parser, Debug)]
#[command(name = "fragment-link")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file
    #[arg(
        short,
        long,
        global = true,
        value_name = "PATH",
        env = "FRAGMENT_LINK_CONFIG"
    )]
    config: Option<PathBuf>,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve the links of one fragment and print or write the result
    Resolve(commands::resolve::ResolveArgs),

    /// Resolve every fragment matching a glob pattern in parallel
    Batch(commands::batch::BatchArgs),

    /// Strip resolution artifacts from a fragment before it is stored
    Cleanup(commands::cleanup::CleanupArgs),

    /// Show how a reference string is parsed
    Inspect(commands::inspect::InspectArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        let config = self.config.as_deref();
        match self.command {
            Commands::Resolve(args) => commands::resolve::execute(args, config),
            Commands::Batch(args) => commands::batch::execute(args, config),
            Commands::Cleanup(args) => commands::cleanup::execute(args, config),
            Commands::Inspect(args) => commands::inspect::execute(args, config),
        }
    }
}

/// `RUST_LOG` takes precedence over `--log-level`
fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A logger may already be installed when running under a test harness
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}
