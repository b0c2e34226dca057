//! Link list collection from arguments, a file or stdin.

use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal};
use std::path::Path;

use anyhow::{Context, Result};

/// Reads one link per line, trimming whitespace and skipping blank lines.
pub(crate) fn read_links<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut links = Vec::new();
    for line in reader.lines() {
        let line = line.context("failed to read link list")?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            links.push(trimmed.to_string());
        }
    }
    Ok(links)
}

/// Collects the run's links.
///
/// Positional links come first, followed by the `--input` file. Stdin is only
/// read when neither is given and it is not a terminal.
pub(crate) fn collect_links(positional: &[String], input: Option<&Path>) -> Result<Vec<String>> {
    let mut links: Vec<String> = positional.to_vec();

    if let Some(path) = input {
        let file =
            File::open(path).with_context(|| format!("cannot open input file {}", path.display()))?;
        links.extend(read_links(BufReader::new(file))?);
    }

    if positional.is_empty() && input.is_none() && !io::stdin().is_terminal() {
        links.extend(read_links(io::stdin().lock())?);
    }

    Ok(links)
}
