//! Dataset Explorer ingestion pipeline
//!
//! Turns one uploaded ZIP archive into stored objects and `images` rows:
//!
//! 1. [`archive`] unpacks the archive and keeps supported image entries.
//! 2. [`pool`] drives a fixed number of [`upload`] workers over a shared queue;
//!    each worker retries failed store writes with exponential backoff and ticks
//!    the [`progress`] tracker once per entry, whether it succeeded or not.
//! 3. [`commit`] records the uploaded paths in bounded-size insert batches.
//!
//! [`pipeline::IngestPipeline`] wires the stages together. Per-entry upload
//! failures are reported in the result; archive and persistence failures abort
//! the run with an [`IngestError`].

pub mod archive;
pub mod commit;
pub mod error;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod upload;

pub use archive::{content_type_for, extract_images, is_supported_image, ExtractionLimits};
pub use commit::{BulkCommitter, DEFAULT_BATCH_SIZE};
pub use error::IngestError;
pub use pipeline::{IngestPipeline, IngestRequest};
pub use pool::{run_pool, PoolReport};
pub use progress::{LogProgress, ProgressObserver, ProgressTracker};
pub use upload::{backoff_delay, Destination, UploadWorker, CANCELLED_REASON};
