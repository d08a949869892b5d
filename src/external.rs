//! Collaborator interfaces consumed by the orchestration core.
//!
//! The host authoring tool provides implementations of these traits; the
//! core never renders, persists metadata, or drives UI itself. All traits
//! are object-safe and `Send + Sync` so they can cross the manifest-build
//! worker thread.

use crate::cache::ItemRef;
use anyhow::{Context, Result, anyhow};
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

/// Uncompressed RGBA pixels produced by a [`ThumbnailRenderer`].
///
/// An empty pixel buffer signals a soft per-item failure.
#[derive(Debug, Clone, Default)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl RawImage {
    pub fn is_empty(&self) -> bool {
        self.rgba.is_empty()
    }
}

/// Renders a visual proxy for one item at the requested square size.
///
/// May block on upstream asset preparation (compilation, streaming); the
/// orchestrator keeps this call off its owner context.
pub trait ThumbnailRenderer: Send + Sync {
    fn export(&self, item: &ItemRef, size: u32) -> RawImage;
}

/// Compresses raw pixels into an on-disk image payload.
pub trait ImageEncoder: Send + Sync {
    fn encode(&self, raw: &RawImage) -> Result<Vec<u8>>;
}

/// Lossless PNG encoder backed by the `image` crate.
pub struct PngEncoder;

impl ImageEncoder for PngEncoder {
    fn encode(&self, raw: &RawImage) -> Result<Vec<u8>> {
        let buffer = RgbaImage::from_raw(raw.width, raw.height, raw.rgba.clone()).ok_or_else(
            || {
                anyhow!(
                    "pixel buffer does not match {}x{} RGBA dimensions",
                    raw.width,
                    raw.height
                )
            },
        )?;

        let mut bytes = Vec::new();
        buffer
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .context("failed to encode proxy image as PNG")?;
        Ok(bytes)
    }
}

/// Persists a string-valued metadata field on an item.
///
/// Assumed idempotent and last-write-wins. The orchestrator only calls this
/// from its owner context, never concurrently with other item mutation.
pub trait MetadataStore: Send + Sync {
    fn set_field(&self, item: &ItemRef, field: &str, value: &str);
}

/// Opaque handle to a transient user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationId(pub u64);

/// Transient progress/status display.
pub trait NotificationService: Send + Sync {
    fn push(&self, message: &str) -> NotificationId;
    fn resolve(&self, id: NotificationId, success: bool);
}
