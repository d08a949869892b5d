//! Result ingestion - turns the worker's output manifest into metadata
//! updates.
//!
//! Only invoked after the worker exited with status 0; the worker's stdout
//! is a log stream and is never parsed for results. Individual malformed
//! entries are skipped, mirroring the soft-skip policy of manifest building.

use crate::cache::ItemRef;
use crate::common::{
    CAPTION_FIELD, CAPTION_SCRIPT_NAME, TAG_SEPARATOR, TAGGING_SCRIPT_NAME, TAGS_FIELD,
    errors::IngestError,
};
use log::warn;
use serde_json::Value;
use std::{fmt, fs, path::Path};

/// The two job kinds exposed by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    CategoricalTagging,
    Captioning,
}

impl JobKind {
    pub fn script_name(&self) -> &'static str {
        match self {
            JobKind::CategoricalTagging => TAGGING_SCRIPT_NAME,
            JobKind::Captioning => CAPTION_SCRIPT_NAME,
        }
    }

    pub fn progress_message(&self) -> &'static str {
        match self {
            JobKind::CategoricalTagging => "Calculating CLIP tags...",
            JobKind::Captioning => "Calculating image2text...",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::CategoricalTagging => f.write_str("categorical tagging"),
            JobKind::Captioning => f.write_str("captioning"),
        }
    }
}

/// One pending metadata write: `item.field = value`, last-write-wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    pub item: ItemRef,
    pub field: &'static str,
    pub value: String,
}

/// Loads and validates the output manifest at `path`, producing the updates
/// to apply.
pub fn ingest(path: &Path, kind: JobKind) -> Result<Vec<FieldUpdate>, IngestError> {
    let bytes = fs::read(path)?;
    let root: Value = serde_json::from_slice(&bytes)?;

    let entries = root
        .get("Entries")
        .and_then(Value::as_array)
        .ok_or_else(|| IngestError::Schema("missing top-level `Entries` array".to_string()))?;

    let mut updates = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(object) = entry.as_object() else {
            warn!("Skipping non-object entry in output manifest");
            continue;
        };
        let Some(asset_path) = object.get("AssetPath").and_then(Value::as_str) else {
            warn!("Skipping output entry without a string `AssetPath`");
            continue;
        };
        let item = ItemRef::new(asset_path);

        match kind {
            JobKind::CategoricalTagging => {
                let Some(tags) = object.get("CLIPTags").and_then(Value::as_array) else {
                    warn!("Skipping output entry for {} without `CLIPTags`", item);
                    continue;
                };
                let joined = tags
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(TAG_SEPARATOR);
                updates.push(FieldUpdate {
                    item,
                    field: TAGS_FIELD,
                    value: joined,
                });
            }
            JobKind::Captioning => {
                let Some(text) = object.get("Image2Text").and_then(Value::as_str) else {
                    warn!("Skipping output entry for {} without `Image2Text`", item);
                    continue;
                };
                updates.push(FieldUpdate {
                    item,
                    field: CAPTION_FIELD,
                    value: text.to_string(),
                });
            }
        }
    }

    Ok(updates)
}
