//! Error taxonomy for job execution and result ingestion.
//!
//! Per-item failures (a proxy export that returns no pixels, a malformed
//! entry in the output manifest) are soft: they are logged and skipped and
//! never surface here. These types cover the failures that end a job.

use thiserror::Error;

/// Failure while loading the worker's output manifest.
///
/// Only produced after the worker exited with status 0; any of these
/// abandons result application entirely.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read output manifest: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse output manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("output manifest schema mismatch: {0}")]
    Schema(String),
}

/// Job-level failure. Never crosses the asynchronous boundary as a panic;
/// every variant resolves the active notification as a failure and leaves
/// the orchestrator idle.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("no items selected; add items before starting a job")]
    EmptySelection,

    #[error("failed to write input manifest: {0:#}")]
    ManifestWrite(anyhow::Error),

    #[error("failed to launch worker: {0}")]
    Launch(String),

    #[error("worker exited with nonzero code {0}")]
    WorkerFailed(i32),

    #[error("failed to ingest worker results: {0}")]
    Ingest(#[from] IngestError),
}
