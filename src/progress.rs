//! Progress bar for runs, driven by scheduler events.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use vidmeta_core::{EventSink, ProgressEvent, RecordStatus, RunResult, TracingSink, VideoRecord};

/// Decides whether a progress bar is drawn.
pub(crate) fn should_use_progress_bar(
    stderr_is_terminal: bool,
    quiet: bool,
    no_progress: bool,
    dumb_terminal: bool,
) -> bool {
    stderr_is_terminal && !quiet && !no_progress && !dumb_terminal
}

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

/// Renders scheduler progress on stderr and forwards item logs to tracing.
pub(crate) struct ProgressBarSink {
    bar: ProgressBar,
    failed: AtomicUsize,
    logs: TracingSink,
}

impl ProgressBarSink {
    pub(crate) fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self {
            bar,
            failed: AtomicUsize::new(0),
            logs: TracingSink,
        }
    }
}

impl EventSink for ProgressBarSink {
    fn on_item(&self, record: &VideoRecord) {
        self.bar.suspend(|| self.logs.on_item(record));
    }

    fn on_progress(&self, event: &ProgressEvent) {
        if event.last_status == RecordStatus::Failed {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.bar.set_position(event.completed as u64);
        let failed = self.failed.load(Ordering::Relaxed);
        if failed > 0 {
            self.bar.set_message(format!("{failed} failed"));
        }
    }

    fn on_finished(&self, result: &RunResult) {
        self.bar.finish_and_clear();
        self.logs.on_finished(result);
    }
}
