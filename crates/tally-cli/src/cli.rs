//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::entries::EntriesArgs;
use crate::commands::report::ReportArgs;

/// Planned-vs-measured time reports.
///
/// Compares the `{pH:MM}` plans written into task names with the time
/// actually tracked, per project, sub-project, tag and spontaneity.
#[derive(Debug, Parser)]
#[command(name = "tally", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Summarize planned vs. measured time for a period.
    Report(ReportArgs),

    /// List normalized entries with their plans.
    Entries(EntriesArgs),
}
