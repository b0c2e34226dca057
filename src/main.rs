//! CLI entry point for vidmeta.

use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use vidmeta_core::fetch::{DEFAULT_MAX_DELAY, Endpoints, parse_header_line};
use vidmeta_core::{EventSink, FetchScheduler, HttpClient, RunConfig, RunContext, TracingSink};

mod cli;
mod input;
mod output;
mod progress;

use cli::Args;
use progress::ProgressBarSink;

/// Process exit outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Every record succeeded (or there was nothing to do).
    Success,
    /// Some records succeeded, some failed.
    Partial,
    /// No record succeeded.
    Failure,
    /// The run was interrupted.
    Interrupted,
}

impl ProcessExit {
    fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Partial => 1,
            Self::Failure => 2,
            Self::Interrupted => 130,
        }
    }
}

/// Determines the process exit outcome from the run's counts.
pub(crate) fn determine_exit_outcome(succeeded: usize, failed: usize, cancelled: bool) -> ProcessExit {
    if cancelled {
        ProcessExit::Interrupted
    } else if failed == 0 {
        ProcessExit::Success
    } else if succeeded > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

fn run_config(args: &Args) -> RunConfig {
    let backoff_base = Duration::from_millis(args.backoff_ms);
    RunConfig {
        concurrency_limit: usize::from(args.concurrency),
        max_retry_attempts: u32::from(args.max_retries),
        request_timeout: Duration::from_secs(args.timeout),
        backoff_base,
        backoff_max: DEFAULT_MAX_DELAY.max(backoff_base),
        ..RunConfig::default()
    }
}

fn endpoints(args: &Args) -> Result<Endpoints> {
    let mut endpoints = match &args.metadata_base {
        Some(base) => Endpoints::new(base)?,
        None => Endpoints::default(),
    };
    if let Some(base) = &args.redirect_base {
        endpoints = endpoints.with_redirect_base(base)?;
    }
    Ok(endpoints)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    init_tracing(args.default_log_level());
    debug!(?args, "CLI arguments parsed");

    match run(args).await {
        Ok(outcome) => ExitCode::from(outcome.code()),
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(ProcessExit::Failure.code())
        }
    }
}

async fn run(args: Args) -> Result<ProcessExit> {
    let links = input::collect_links(&args.links, args.input.as_deref())?;
    if links.is_empty() {
        info!("No input provided. Pass links as arguments, use --input, or pipe them via stdin.");
        return Ok(ProcessExit::Success);
    }

    let headers = args
        .headers
        .iter()
        .map(|line| parse_header_line(line))
        .collect::<Result<Vec<_>, _>>()?;
    let client = HttpClient::new(endpoints(&args)?, &headers)?;
    let ctx = RunContext::new(run_config(&args))?;

    let cancel = ctx.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling outstanding links");
            cancel.cancel();
        }
    });

    let use_progress = progress::should_use_progress_bar(
        io::stderr().is_terminal(),
        args.quiet,
        args.no_progress,
        progress::is_dumb_terminal(),
    );
    let sink: Box<dyn EventSink> = if use_progress {
        Box::new(ProgressBarSink::new(links.len()))
    } else {
        Box::new(TracingSink)
    };

    let scheduler = FetchScheduler::new(Arc::new(client));
    let result = scheduler.run(links, &ctx, sink.as_ref()).await?;

    let mut writer = output::open_output(args.output.as_deref())?;
    output::write_records(writer.as_mut(), &result.records).context("failed to write records")?;
    drop(writer);

    if !args.quiet {
        output::print_summary(&result.summary);
    }

    Ok(determine_exit_outcome(
        result.summary.succeeded,
        result.summary.failed,
        result.summary.cancelled,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_outcome_success_when_no_failures() {
        assert_eq!(determine_exit_outcome(3, 0, false), ProcessExit::Success);
        assert_eq!(determine_exit_outcome(0, 0, false), ProcessExit::Success);
    }

    #[test]
    fn test_exit_outcome_partial_when_mixed() {
        assert_eq!(determine_exit_outcome(2, 1, false), ProcessExit::Partial);
    }

    #[test]
    fn test_exit_outcome_failure_when_all_failed() {
        assert_eq!(determine_exit_outcome(0, 2, false), ProcessExit::Failure);
    }

    #[test]
    fn test_exit_outcome_interrupted_wins() {
        assert_eq!(determine_exit_outcome(1, 1, true), ProcessExit::Interrupted);
        assert_eq!(ProcessExit::Interrupted.code(), 130);
    }

    #[test]
    fn test_run_config_from_args() {
        let args = Args::try_parse_from(["vidmeta", "-c", "4", "-r", "2", "--timeout", "5"]).unwrap();
        let config = run_config(&args);
        assert_eq!(config.concurrency_limit, 4);
        assert_eq!(config.max_retry_attempts, 2);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_run_config_large_backoff_raises_cap() {
        let args = Args::try_parse_from(["vidmeta", "--backoff-ms", "20000"]).unwrap();
        let config = run_config(&args);
        assert_eq!(config.backoff_max, Duration::from_secs(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoints_rejects_bad_base() {
        let args = Args::try_parse_from(["vidmeta", "--metadata-base", "ftp://x"]).unwrap();
        assert!(endpoints(&args).is_err());
    }
}
