//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use vidmeta_core::{DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS};

/// Batch resolve short-video links into metadata records.
///
/// Links may be passed as arguments, read from a file (one per line) or
/// piped on stdin. Share text containing a link is accepted as-is.
/// Records are written as JSON Lines in input order.
#[derive(Parser, Debug)]
#[command(name = "vidmeta")]
#[command(author, version, about)]
pub struct Args {
    /// Links or share texts to resolve
    #[arg(value_name = "LINK")]
    pub links: Vec<String>,

    /// Read links from a file, one per line (blank lines are skipped)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Write JSON Lines records to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Maximum concurrent requests (1-30)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=30))]
    pub concurrency: u8,

    /// Maximum attempts per request, the first one included (1-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_ATTEMPTS as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_retries: u8,

    /// Per-attempt request timeout in seconds (1-300)
    #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(u64).range(1..=300))]
    pub timeout: u64,

    /// Delay before the first retry in milliseconds (max 60000)
    #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub backoff_ms: u64,

    /// Extra request header, e.g. -H 'Cookie: did=web_123' (repeatable)
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
    pub headers: Vec<String>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Override the metadata page base URL
    #[arg(long, hide = true, value_name = "URL")]
    pub metadata_base: Option<String>,

    /// Send short-link requests to this base URL instead of the link's host
    #[arg(long, hide = true, value_name = "URL")]
    pub redirect_base: Option<String>,
}

impl Args {
    /// Log level used when `RUST_LOG` is not set.
    #[must_use]
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["vidmeta"]).unwrap();
        assert!(args.links.is_empty());
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert_eq!(args.concurrency, 10);
        assert_eq!(args.max_retries, 3);
        assert_eq!(args.timeout, 15);
        assert_eq!(args.backoff_ms, 500);
        assert!(args.headers.is_empty());
    }

    #[test]
    fn test_cli_positional_links() {
        let args = Args::try_parse_from([
            "vidmeta",
            "https://v.kuaishou.com/abc123",
            "https://www.kuaishou.com/short-video/xyz789",
        ])
        .unwrap();
        assert_eq!(args.links.len(), 2);
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["vidmeta", "-v"]).unwrap();
        assert_eq!(args.default_log_level(), "debug");

        let args = Args::try_parse_from(["vidmeta", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.default_log_level(), "trace");
    }

    #[test]
    fn test_cli_quiet_wins_over_verbose() {
        let args = Args::try_parse_from(["vidmeta", "-q", "-v"]).unwrap();
        assert_eq!(args.default_log_level(), "error");
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["vidmeta", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_concurrency_bounds() {
        let args = Args::try_parse_from(["vidmeta", "-c", "30"]).unwrap();
        assert_eq!(args.concurrency, 30);

        for value in ["0", "31"] {
            let err = Args::try_parse_from(["vidmeta", "-c", value]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn test_cli_max_retries_bounds() {
        let args = Args::try_parse_from(["vidmeta", "--max-retries", "10"]).unwrap();
        assert_eq!(args.max_retries, 10);

        for value in ["0", "11"] {
            let err = Args::try_parse_from(["vidmeta", "-r", value]).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn test_cli_timeout_over_max_rejected() {
        let err = Args::try_parse_from(["vidmeta", "--timeout", "301"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_repeatable_headers() {
        let args = Args::try_parse_from([
            "vidmeta",
            "-H",
            "Cookie: did=web_1",
            "--header",
            "X-Test: 1",
        ])
        .unwrap();
        assert_eq!(args.headers, vec!["Cookie: did=web_1", "X-Test: 1"]);
    }

    #[test]
    fn test_cli_input_and_output_files() {
        let args =
            Args::try_parse_from(["vidmeta", "-i", "links.txt", "-o", "out.jsonl"]).unwrap();
        assert_eq!(args.input, Some(PathBuf::from("links.txt")));
        assert_eq!(args.output, Some(PathBuf::from("out.jsonl")));
    }
}
