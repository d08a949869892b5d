//! Worker layout configuration.
//!
//! The external worker lives in a fixed relative layout below a single root:
//! a pip-installed python interpreter, the inference scripts, and a scratch
//! directory for the per-job manifests and proxy images. Every path can be
//! overridden individually through `AUTOTAG_*` environment variables.

use crate::ingest::JobKind;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Root of the worker installation layout.
    pub root: PathBuf,

    /// Explicit python interpreter path; overrides the layout default.
    #[serde(default)]
    pub python: Option<PathBuf>,

    /// Explicit script directory; overrides the layout default.
    #[serde(default)]
    pub scripts: Option<PathBuf>,

    /// Explicit scratch directory; overrides the layout default.
    #[serde(default)]
    pub work: Option<PathBuf>,
}

impl WorkerConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            python: None,
            scripts: None,
            work: None,
        }
    }

    /// Reads `AUTOTAG_ROOT`, `AUTOTAG_PYTHON`, `AUTOTAG_SCRIPTS` and
    /// `AUTOTAG_WORK` from the environment (a `.env` file is honored).
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        envy::prefixed("AUTOTAG_")
            .from_env()
            .context("failed to read AUTOTAG_* environment configuration")
    }

    /// The pip-installed interpreter that runs the worker scripts.
    pub fn python_path(&self) -> PathBuf {
        if let Some(python) = &self.python {
            return python.clone();
        }
        if cfg!(windows) {
            self.root.join("pipinstall").join("Scripts").join("python.exe")
        } else {
            self.root.join("pipinstall").join("bin").join("python3")
        }
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.scripts
            .clone()
            .unwrap_or_else(|| self.root.join("python").join("tagging"))
    }

    pub fn script_path(&self, kind: JobKind) -> PathBuf {
        self.scripts_dir().join(kind.script_name())
    }

    /// Per-job scratch directory, fully purged at each job start.
    pub fn work_dir(&self) -> PathBuf {
        self.work
            .clone()
            .unwrap_or_else(|| self.root.join("intermediate").join("autotag"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_defaults_hang_off_the_root() {
        let config = WorkerConfig::new("/opt/tagger");

        assert!(config.python_path().starts_with("/opt/tagger/pipinstall"));
        assert_eq!(
            config.script_path(JobKind::CategoricalTagging),
            PathBuf::from("/opt/tagger/python/tagging/run_clip_category.py")
        );
        assert_eq!(
            config.script_path(JobKind::Captioning),
            PathBuf::from("/opt/tagger/python/tagging/run_clip_img2text.py")
        );
        assert_eq!(
            config.work_dir(),
            PathBuf::from("/opt/tagger/intermediate/autotag")
        );
    }

    #[test]
    fn explicit_paths_override_the_layout() {
        let mut config = WorkerConfig::new("/opt/tagger");
        config.python = Some(PathBuf::from("/usr/bin/python3"));
        config.work = Some(PathBuf::from("/tmp/scratch"));

        assert_eq!(config.python_path(), PathBuf::from("/usr/bin/python3"));
        assert_eq!(config.work_dir(), PathBuf::from("/tmp/scratch"));
    }
}
