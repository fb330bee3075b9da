//! Bounded-concurrency upload pool.
//!
//! A fixed set of workers pull entries from one shared queue until it is empty.
//! Each entry is taken by exactly one worker, and every entry ends up either in
//! `uploaded` or in `failed`. Completion order is not preserved.

use dsx_core::models::{ArchiveEntry, FailedUpload, UploadOutcome};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::progress::ProgressTracker;
use crate::upload::{Destination, UploadWorker, CANCELLED_REASON};
use crate::IngestError;

/// What the pool did with its entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// Storage paths of successful uploads, in completion order.
    pub uploaded: Vec<String>,
    pub failed: Vec<FailedUpload>,
}

impl PoolReport {
    fn record(&mut self, outcome: UploadOutcome) {
        match outcome {
            UploadOutcome::Uploaded { storage_path } => self.uploaded.push(storage_path),
            UploadOutcome::Failed { name, reason } => self.failed.push(FailedUpload { name, reason }),
        }
    }

    pub fn completed(&self) -> usize {
        self.uploaded.len() + self.failed.len()
    }
}

type SharedQueue = Arc<Mutex<VecDeque<ArchiveEntry>>>;

fn next_entry(queue: &SharedQueue) -> Option<ArchiveEntry> {
    queue
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .pop_front()
}

/// Upload `entries` with `concurrency` workers (zero is treated as one).
///
/// Progress is ticked once per entry. After `cancel` fires, workers stop taking
/// new entries; whatever is still queued is reported as failed with reason
/// [`CANCELLED_REASON`].
#[tracing::instrument(skip_all, fields(entries = entries.len(), concurrency = concurrency))]
pub async fn run_pool(
    entries: Vec<ArchiveEntry>,
    worker: Arc<UploadWorker>,
    destination: Arc<Destination>,
    concurrency: usize,
    progress: Arc<ProgressTracker>,
    cancel: CancellationToken,
) -> Result<PoolReport, IngestError> {
    let total = entries.len();
    let queue: SharedQueue = Arc::new(Mutex::new(VecDeque::from(entries)));
    let (tx, mut rx) = mpsc::unbounded_channel::<UploadOutcome>();

    let mut workers = JoinSet::new();
    for worker_id in 0..concurrency.max(1) {
        let queue = queue.clone();
        let worker = worker.clone();
        let destination = destination.clone();
        let progress = progress.clone();
        let cancel = cancel.clone();
        let tx = tx.clone();

        workers.spawn(async move {
            let mut processed = 0usize;
            while !cancel.is_cancelled() {
                let Some(entry) = next_entry(&queue) else {
                    break;
                };
                let outcome = worker.upload(entry, &destination, &cancel).await;
                progress.on_entry_done();
                processed += 1;
                if tx.send(outcome).is_err() {
                    break;
                }
            }
            tracing::debug!(worker_id = worker_id, processed = processed, "Upload worker finished");
        });
    }
    drop(tx);

    let mut panicked = None;
    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Upload worker panicked");
            panicked.get_or_insert_with(|| e.to_string());
        }
    }
    if let Some(message) = panicked {
        return Err(IngestError::Worker(message));
    }

    let mut report = PoolReport::default();
    while let Some(outcome) = rx.recv().await {
        report.record(outcome);
    }

    let abandoned: Vec<ArchiveEntry> = queue
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .drain(..)
        .collect();
    if !abandoned.is_empty() {
        tracing::warn!(abandoned = abandoned.len(), "Upload pool cancelled with entries queued");
    }
    for entry in abandoned {
        progress.on_entry_done();
        report.failed.push(FailedUpload {
            name: entry.name,
            reason: CANCELLED_REASON.to_string(),
        });
    }

    debug_assert_eq!(report.completed(), total);
    tracing::info!(
        uploaded = report.uploaded.len(),
        failed = report.failed.len(),
        "Upload pool finished"
    );

    Ok(report)
}
