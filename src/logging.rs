//! Centralized logging.
//!
//! A single stderr logger registered once at startup. The CLI's `-q` and
//! `-v[N]` flags map directly onto `log::LevelFilter`; there is no ring
//! buffer or background drain thread because the pipeline is synchronous
//! and single-threaded, so nothing ever contends for the log sink.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};
use once_cell::sync::OnceCell;

struct StderrLogger {
    start: Instant,
    progress_period_secs: u64,
    last_progress: AtomicU64,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let elapsed = self.start.elapsed().as_secs_f64();
        eprintln!("[{elapsed:8.3}] {:<5} {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

impl StderrLogger {
    /// Returns true once every `progress_period_secs`, for callers that
    /// want periodic progress lines without logging every sample.
    fn due_for_progress(&self) -> bool {
        if self.progress_period_secs == 0 {
            return false;
        }
        let now = self.start.elapsed().as_secs();
        let last = self.last_progress.load(Ordering::Relaxed);
        if now.saturating_sub(last) >= self.progress_period_secs {
            self.last_progress.store(now, Ordering::Relaxed);
            true
        } else {
            false
        }
    }
}

static LOGGER: OnceCell<StderrLogger> = OnceCell::new();

/// Verbosity as selected by the CLI: quiet suppresses everything but
/// errors, verbose levels add info/debug, with an optional progress
/// period in seconds for periodic status lines.
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose { progress_period_secs: u64 },
}

pub fn init(verbosity: Verbosity) {
    let (filter, progress_period_secs) = match verbosity {
        Verbosity::Quiet => (LevelFilter::Error, 0),
        Verbosity::Normal => (LevelFilter::Warn, 0),
        Verbosity::Verbose {
            progress_period_secs,
        } => (LevelFilter::Debug, progress_period_secs),
    };

    let logger = LOGGER.get_or_init(|| StderrLogger {
        start: Instant::now(),
        progress_period_secs,
        last_progress: AtomicU64::new(0),
    });

    log::set_max_level(filter);
    let _ = log::set_logger(logger);
}

/// True when enough time has passed to emit another progress line, per
/// the `-v[N]` period. Always false if the logger hasn't been
/// initialized with a verbose period.
pub fn progress_due() -> bool {
    LOGGER.get().map(|l| l.due_for_progress()).unwrap_or(false)
}
