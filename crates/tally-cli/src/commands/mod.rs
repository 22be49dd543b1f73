//! CLI subcommand implementations.

pub mod entries;
pub mod input;
pub mod report;
pub mod util;
