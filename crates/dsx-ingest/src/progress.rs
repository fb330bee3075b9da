//! Completion tracking for an ingestion run.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// Receives progress percentages (0..=100).
///
/// Called from upload workers while the tracker's lock is held, so calls are
/// serialized and values never decrease. Implementations must not block.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, percent: u8);
}

impl<F> ProgressObserver for F
where
    F: Fn(u8) + Send + Sync,
{
    fn on_progress(&self, percent: u8) {
        self(percent)
    }
}

impl ProgressObserver for watch::Sender<u8> {
    fn on_progress(&self, percent: u8) {
        self.send_replace(percent);
    }
}

/// Logs each change of percentage at debug level.
#[derive(Debug, Default)]
pub struct LogProgress {
    label: String,
    last: Mutex<Option<u8>>,
}

impl LogProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            last: Mutex::new(None),
        }
    }
}

impl ProgressObserver for LogProgress {
    fn on_progress(&self, percent: u8) {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if *last != Some(percent) {
            *last = Some(percent);
            tracing::debug!(run = %self.label, percent = percent, "Ingestion progress");
        }
    }
}

/// Counts finished entries and reports `round(100 * completed / total)`.
pub struct ProgressTracker {
    total: usize,
    completed: Mutex<usize>,
    observer: Arc<dyn ProgressObserver>,
}

impl ProgressTracker {
    pub fn new(total: usize, observer: Arc<dyn ProgressObserver>) -> Self {
        Self {
            total,
            completed: Mutex::new(0),
            observer,
        }
    }

    /// Record one finished entry, successful or not, and notify the observer.
    ///
    /// Calls beyond `total` are ignored.
    pub fn on_entry_done(&self) {
        let mut completed = self.completed.lock().unwrap_or_else(PoisonError::into_inner);
        if *completed >= self.total {
            return;
        }
        *completed += 1;
        self.observer.on_progress(percent_of(*completed, self.total));
    }

    /// Report 100 for a run with nothing to process.
    pub fn report_empty(&self) {
        if self.total == 0 {
            self.observer.on_progress(100);
        }
    }

    pub fn completed(&self) -> usize {
        *self.completed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

/// Percentage rounded half up.
fn percent_of(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let completed = completed.min(total);
    ((200 * completed + total) / (2 * total)) as u8
}
