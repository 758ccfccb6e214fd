//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY mode: an indicatif bar tracking the sequential crawl.
//! Non-TTY mode: log-based output only (scheduler-friendly).

use std::io::IsTerminal;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Central progress context for the single pipeline run.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Create new context, detecting TTY automatically.
    pub fn new() -> Self {
        let is_tty = std::io::stderr().is_terminal();
        Self {
            multi: MultiProgress::new(),
            is_tty,
        }
    }

    /// Bar for the sequential repository crawl.
    ///
    /// TTY: visible bar with position/length. Non-TTY: hidden (no-op);
    /// the extractor logs skips and flushes instead.
    pub fn crawl_bar(&self, total: u64) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(total));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:<12.dim} {bar:30.green/dim} {pos:>6}/{len:6} {wide_msg:.dim}")
                .expect("invalid template")
                .progress_chars("--"),
        );
        pb.set_prefix("crawl");
        pb
    }

    /// Whether running in TTY mode.
    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Get reference to `MultiProgress` for the log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}
