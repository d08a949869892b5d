//! Input-manifest construction.
//!
//! For every selected item: render a proxy, compress it to PNG, persist it
//! under its deterministic file name, and record the pair in `input.json`.
//! A failing item is skipped and logged; only a serialization or write
//! failure of the manifest itself is fatal to the job.

use super::{InputEntry, InputManifest, proxy_filename};
use crate::{
    cache::ItemRef,
    common::{INPUT_MANIFEST_NAME, THUMBNAIL_SIZE, errors::JobError},
    external::{ImageEncoder, ThumbnailRenderer},
};
use anyhow::Error;
use log::{error, info};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// One item excluded from the manifest, with the reason it was skipped.
#[derive(Debug)]
pub struct SkippedItem {
    pub item: ItemRef,
    pub reason: String,
}

#[derive(Debug)]
pub struct BuiltManifest {
    /// Full path of the written `input.json`.
    pub path: PathBuf,
    pub entries: Vec<InputEntry>,
    pub skipped: Vec<SkippedItem>,
}

/// Exports proxies for `items` into `work_dir` and writes the input
/// manifest there. Per-item export failures never abort the batch.
pub fn build_input_manifest(
    items: &[ItemRef],
    work_dir: &Path,
    renderer: &dyn ThumbnailRenderer,
    encoder: &dyn ImageEncoder,
) -> Result<BuiltManifest, JobError> {
    let mut entries = Vec::with_capacity(items.len());
    let mut skipped = Vec::new();

    for item in items {
        match export_proxy(item, work_dir, renderer, encoder) {
            Ok(image_path) => entries.push(InputEntry {
                asset_path: item.as_str().to_string(),
                asset_name: item.name().to_string(),
                image_path: image_path.to_string_lossy().into_owned(),
            }),
            Err(reason) => {
                error!("Failed to export proxy for {}: {}", item, reason);
                skipped.push(SkippedItem {
                    item: item.clone(),
                    reason,
                });
            }
        }
    }

    let manifest = InputManifest { entries };
    let path = work_dir.join(INPUT_MANIFEST_NAME);

    let json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| JobError::ManifestWrite(Error::new(e).context("serialization failed")))?;
    fs::write(&path, json).map_err(|e| {
        JobError::ManifestWrite(Error::new(e).context(format!("writing {:?} failed", path)))
    })?;

    info!(
        "Wrote input manifest to {:?} ({} entries, {} skipped)",
        path,
        manifest.entries.len(),
        skipped.len()
    );

    Ok(BuiltManifest {
        path,
        entries: manifest.entries,
        skipped,
    })
}

fn export_proxy(
    item: &ItemRef,
    work_dir: &Path,
    renderer: &dyn ThumbnailRenderer,
    encoder: &dyn ImageEncoder,
) -> Result<PathBuf, String> {
    let raw = renderer.export(item, THUMBNAIL_SIZE);
    if raw.is_empty() {
        return Err("renderer returned no image data".to_string());
    }

    let png = encoder
        .encode(&raw)
        .map_err(|e| format!("PNG encoding failed: {e:#}"))?;

    let path = work_dir.join(proxy_filename(item));
    fs::write(&path, &png).map_err(|e| format!("writing proxy image {:?} failed: {e}", path))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{PngEncoder, RawImage};
    use std::time::{SystemTime, UNIX_EPOCH};

    /// Renders a tiny solid image, failing for identifiers listed as broken.
    struct FakeRenderer {
        broken: Vec<&'static str>,
    }

    impl ThumbnailRenderer for FakeRenderer {
        fn export(&self, item: &ItemRef, size: u32) -> RawImage {
            if self.broken.contains(&item.as_str()) {
                return RawImage::default();
            }
            RawImage {
                width: size,
                height: size,
                rgba: vec![200; (size * size * 4) as usize],
            }
        }
    }

    fn scratch_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("autotag-builder-{tag}-{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn failed_exports_are_skipped_not_fatal() {
        let dir = scratch_dir("skip");
        let items = [
            ItemRef::new("/Game/A"),
            ItemRef::new("/Game/B"),
            ItemRef::new("/Game/C"),
        ];
        let renderer = FakeRenderer {
            broken: vec!["/Game/B"],
        };

        let built = build_input_manifest(&items, &dir, &renderer, &PngEncoder).unwrap();

        assert_eq!(built.entries.len(), 2);
        assert_eq!(built.skipped.len(), 1);
        assert_eq!(built.skipped[0].item, ItemRef::new("/Game/B"));

        // The surviving entries keep their proxies on disk next to input.json.
        for entry in &built.entries {
            assert!(Path::new(&entry.image_path).is_file());
        }
        let written: InputManifest =
            serde_json::from_slice(&fs::read(&built.path).unwrap()).unwrap();
        assert_eq!(written.entries, built.entries);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unwritable_work_dir_is_a_manifest_write_error() {
        let dir = PathBuf::from("/definitely/not/a/real/dir");
        let items = [ItemRef::new("/Game/A")];
        let renderer = FakeRenderer { broken: vec![] };

        // The proxy write also fails, but that is soft; the fatal error is
        // the manifest write itself.
        let result = build_input_manifest(&items, &dir, &renderer, &PngEncoder);
        assert!(matches!(result, Err(JobError::ManifestWrite(_))));
    }
}
