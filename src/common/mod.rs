pub mod errors;

/// Canonical edge length (pixels) for exported proxy images.
pub const THUMBNAIL_SIZE: u32 = 224;

pub const INPUT_MANIFEST_NAME: &str = "input.json";

pub const OUTPUT_MANIFEST_NAME: &str = "output.json";

pub const TAGGING_SCRIPT_NAME: &str = "run_clip_category.py";

pub const CAPTION_SCRIPT_NAME: &str = "run_clip_img2text.py";

/// Metadata field written by categorical tagging jobs.
pub const TAGS_FIELD: &str = "AssetTags";

/// Metadata field written by captioning jobs.
pub const CAPTION_FIELD: &str = "Image2Text";

pub const TAG_SEPARATOR: &str = ", ";
