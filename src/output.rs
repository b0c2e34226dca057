//! Record output (JSON Lines) and the end-of-run summary.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use vidmeta_core::{FailureKind, RunSummary, VideoRecord};

/// Opens the record destination: `path` when given, stdout otherwise.
pub(crate) fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create output file {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

/// Writes one JSON object per record, one per line, in the given order.
pub(crate) fn write_records<W: Write + ?Sized>(writer: &mut W, records: &[VideoRecord]) -> Result<()> {
    for record in records {
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Human-readable summary lines for stderr.
pub(crate) fn render_summary_lines(summary: &RunSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "Resolved {}/{} links ({} failed, {} retries)",
        summary.succeeded, summary.total, summary.failed, summary.retried
    )];
    if summary.cancelled {
        lines.push("Run was cancelled; unfinished links are marked cancelled.".to_string());
    }
    if !summary.by_failure_kind.is_empty() {
        lines.push("Failures by kind:".to_string());
        for (kind, count) in &summary.by_failure_kind {
            lines.push(format!("- {}: {count}", failure_label(*kind)));
        }
    }
    lines
}

pub(crate) fn print_summary(summary: &RunSummary) {
    for line in render_summary_lines(summary) {
        eprintln!("{line}");
    }
}

fn failure_label(kind: FailureKind) -> String {
    match kind {
        FailureKind::InvalidLink => "invalid link".to_string(),
        FailureKind::Timeout => "timeout".to_string(),
        FailureKind::ConnectionError => "connection error".to_string(),
        FailureKind::HttpStatus(code) => format!("HTTP {code}"),
        FailureKind::ParseFailure => "parse failure".to_string(),
        FailureKind::Cancelled => "cancelled".to_string(),
        FailureKind::Internal => "internal error".to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use vidmeta_core::InputItem;

    use super::*;

    #[test]
    fn test_write_records_one_object_per_line() {
        let items = InputItem::from_links(vec!["not-a-link".into(), "also-bad".into()]);
        let records: Vec<VideoRecord> = items.iter().map(VideoRecord::cancelled).collect();

        let mut buffer = Vec::new();
        write_records(&mut buffer, &records).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["source_link"], "not-a-link");
        assert_eq!(first["status"], "failed");
    }

    #[test]
    fn test_write_records_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let items = InputItem::from_links(vec!["x".into()]);
        let records = vec![VideoRecord::cancelled(&items[0])];

        {
            let mut writer = open_output(Some(&path)).unwrap();
            write_records(writer.as_mut(), &records).unwrap();
        }

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 1);
    }

    #[test]
    fn test_summary_lines() {
        let summary = RunSummary {
            total: 3,
            succeeded: 1,
            failed: 2,
            retried: 4,
            by_failure_kind: BTreeMap::from([
                (FailureKind::InvalidLink, 1),
                (FailureKind::HttpStatus(404), 1),
            ]),
            cancelled: false,
        };
        let lines = render_summary_lines(&summary);
        assert_eq!(lines[0], "Resolved 1/3 links (2 failed, 4 retries)");
        assert!(lines.contains(&"- invalid link: 1".to_string()));
        assert!(lines.contains(&"- HTTP 404: 1".to_string()));
    }

    #[test]
    fn test_summary_mentions_cancellation() {
        let summary = RunSummary {
            total: 1,
            failed: 1,
            cancelled: true,
            by_failure_kind: BTreeMap::from([(FailureKind::Cancelled, 1)]),
            ..RunSummary::default()
        };
        let lines = render_summary_lines(&summary);
        assert!(lines.iter().any(|l| l.contains("cancelled")));
    }
}
