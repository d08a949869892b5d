//! Manifest types exchanged with the external worker.
//!
//! The input manifest is a self-contained JSON document written once per
//! job; its path is the sole argument identifying the job's inputs. Field
//! names are part of the wire contract with the worker scripts.

pub mod builder;

use crate::cache::ItemRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputManifest {
    #[serde(rename = "Entries")]
    pub entries: Vec<InputEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEntry {
    #[serde(rename = "AssetPath")]
    pub asset_path: String,
    #[serde(rename = "AssetName")]
    pub asset_name: String,
    #[serde(rename = "ImagePath")]
    pub image_path: String,
}

/// Deterministic proxy file name: lowercase 8-hex-digit CRC32 of the item
/// identifier, so repeated runs on the same item overwrite the same file.
pub fn proxy_filename(item: &ItemRef) -> String {
    format!("{:08x}.png", crc32fast::hash(item.as_str().as_bytes()))
}
