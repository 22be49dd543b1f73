//! Planned-vs-measured time report CLI library.
//!
//! Reads exported time entries, runs the deviation engine from
//! `tally-core`, and renders plain-text or JSON reports.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
