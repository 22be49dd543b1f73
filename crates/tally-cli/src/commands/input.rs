//! Reading exported time entries from a file or stdin.
//!
//! Accepts either JSON lines (one entry per line) or a single JSON array.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use tally_core::RawEntry;

/// Reads entries from `path`, or from stdin when `path` is `None` or `-`.
pub fn read_entries(path: Option<&Path>) -> Result<Vec<RawEntry>> {
    match path {
        Some(path) if path != Path::new("-") => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            parse_entries(BufReader::new(file))
                .with_context(|| format!("failed to read entries from {}", path.display()))
        }
        _ => parse_entries(io::stdin().lock()).context("failed to read entries from stdin"),
    }
}

/// Parses a JSON array or JSON lines of raw entries.
pub fn parse_entries<R: BufRead>(mut reader: R) -> Result<Vec<RawEntry>> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .context("failed to read input")?;

    if content.trim_start().starts_with('[') {
        return serde_json::from_str(&content).context("invalid JSON array");
    }

    let mut entries = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let entry: RawEntry = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid JSON on line {}", idx + 1))?;
        entries.push(entry);
    }
    tracing::debug!(count = entries.len(), "parsed entries");
    Ok(entries)
}
