use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;

use xbmlog::batch::{batch_combine, BatchOptions};

/// Combine raw XBM logger directories into processed CSV files.
#[derive(Parser, Debug)]
#[command(author, version, about = "Batch combine raw XBM data-logger CSV files", long_about = None)]
struct Cli {
    /// Top-level directory to search for logger directories
    top_dir: PathBuf,

    /// Filename pattern for raw log files (`*` and `?` wildcards)
    #[arg(long, default_value = "*.CSV")]
    pattern: String,

    /// Report what would be combined without writing anything
    #[arg(long, action = ArgAction::SetTrue)]
    dry_run: bool,

    /// Treat all logs in a directory as one session instead of binning on
    /// shutdown markers
    #[arg(long, action = ArgAction::SetTrue)]
    no_bin_sessions: bool,

    /// File-stem substrings to exclude from combination
    #[arg(long = "skip", value_name = "SUBSTR")]
    skip_strs: Vec<String>,

    /// Emit verbose diagnostics
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut opts = BatchOptions {
        pattern: cli.pattern,
        dry_run: cli.dry_run,
        bin_sessions: !cli.no_bin_sessions,
        ..Default::default()
    };
    if !cli.skip_strs.is_empty() {
        opts.skip_strs = cli.skip_strs;
    }

    batch_combine(&cli.top_dir, &opts)?;

    Ok(())
}
