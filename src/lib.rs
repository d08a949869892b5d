//! Batch AI-tagging orchestration for authoring tools.
//!
//! Callers collect item references into a cache, then start one of two job
//! kinds (categorical tagging or free-text captioning). The orchestrator
//! exports a proxy image per item, writes a JSON input manifest, supervises a
//! single external worker process, and writes the worker's results back onto
//! each item's metadata through the [`external::MetadataStore`] collaborator.
//!
//! At most one job is in flight at any time; starting a new job terminates
//! the previous worker before the new one launches.

pub mod bootstrap;
pub mod cache;
pub mod common;
pub mod config;
pub mod external;
pub mod ingest;
pub mod manifest;
pub mod orchestrator;
pub mod supervisor;

pub use cache::{ItemCache, ItemRef};
pub use common::errors::{IngestError, JobError};
pub use config::WorkerConfig;
pub use external::{
    ImageEncoder, MetadataStore, NotificationId, NotificationService, PngEncoder, RawImage,
    ThumbnailRenderer,
};
pub use ingest::{FieldUpdate, JobKind};
pub use orchestrator::{Orchestrator, OrchestratorHandle};
