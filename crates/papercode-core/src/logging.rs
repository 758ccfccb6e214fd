//! Logging setup for interactive and scheduler-driven runs.
//!
//! Interactive (TTY) runs route records through the indicatif
//! `MultiProgress` so log lines never tear the crawl bar; scheduler runs get
//! plain, color-free lines that log aggregators can parse.

use indicatif::MultiProgress;

const LEVEL_LABELS: [(&str, &str); 5] = [
    ("ERROR", "\x1b[31m"),
    ("WARN ", "\x1b[33m"),
    ("INFO ", "\x1b[32m"),
    ("DEBUG", "\x1b[36m"),
    ("TRACE", "\x1b[35m"),
];

fn label(level: log::Level) -> &'static str {
    LEVEL_LABELS[level as usize - 1].0
}

fn colored_label(level: log::Level) -> String {
    let (text, ansi) = LEVEL_LABELS[level as usize - 1];
    format!("{ansi}{text}\x1b[0m")
}

/// env_logger wrapper that emits through a MultiProgress suspend, keeping
/// bars and log lines from interleaving mid-row.
pub struct IndicatifLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
}

impl IndicatifLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { inner, multi }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if self.inner.enabled(record.metadata()) {
            let line = format!("[{}] {}", colored_label(record.level()), record.args());
            self.multi.suspend(|| eprintln!("{line}"));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Initialize logging. Pass the MultiProgress when progress bars are active
/// (TTY); pass `None` for scheduler runs.
pub fn init_logging(debug: bool, multi: Option<&MultiProgress>) {
    use std::io::Write;

    let env = env_logger::Env::default().default_filter_or(if debug { "debug" } else { "info" });

    match multi {
        Some(multi) => {
            let logger = env_logger::Builder::from_env(env).build();
            let max_level = logger.filter();
            log::set_boxed_logger(Box::new(IndicatifLogger::new(logger, multi.clone())))
                .expect("failed to init logger");
            log::set_max_level(max_level);
        }
        None => {
            env_logger::Builder::from_env(env)
                .format(|buf, record| {
                    writeln!(buf, "[{}] {}", label(record.level()), record.args())
                })
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_fixed_width() {
        for level in [
            log::Level::Error,
            log::Level::Warn,
            log::Level::Info,
            log::Level::Debug,
            log::Level::Trace,
        ] {
            assert_eq!(label(level).len(), 5);
        }
    }

    #[test]
    fn colored_label_wraps_reset() {
        let label = colored_label(log::Level::Error);
        assert!(label.starts_with("\x1b[31m"));
        assert!(label.ends_with("\x1b[0m"));
    }
}
