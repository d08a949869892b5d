//! Startup tasks.
//!
//! Includes:
//! - Logger initialization
//! - Worker interpreter availability check
//! - Scratch folder creation

use crate::config::WorkerConfig;
use anyhow::{Context, Result};
use log::{error, info};
use std::{fs, process::Command};

/// One-shot initialization of everything the orchestrator owns. No state is
/// externally visible before this runs.
pub fn initialize(config: &WorkerConfig) -> Result<()> {
    initialize_logger();
    check_worker_interpreter(config);
    initialize_folder(config)?;
    Ok(())
}

/// Initialize env_logger with an `info` default; repeated calls (tests) are
/// harmless.
pub fn initialize_logger() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .try_init();
}

/// Check that the pip-installed python interpreter is present and responds.
pub fn check_worker_interpreter(config: &WorkerConfig) {
    let python = config.python_path();
    match Command::new(&python).arg("--version").output() {
        Ok(output) if output.status.success() => {
            let text = if output.stdout.is_empty() {
                String::from_utf8_lossy(&output.stderr).into_owned()
            } else {
                String::from_utf8_lossy(&output.stdout).into_owned()
            };
            info!("Worker interpreter: {}", text.trim());
        }
        Ok(_) => {
            error!(
                "{:?} was found, but it returned an error. Please ensure the worker environment is correctly installed.",
                python
            );
        }
        Err(_) => {
            error!(
                "{:?} is not installed or not available. Install the worker environment before starting a job.",
                python
            );
        }
    }
}

/// Create the scratch folder the per-job manifests live under.
pub fn initialize_folder(config: &WorkerConfig) -> Result<()> {
    let work_dir = config.work_dir();
    fs::create_dir_all(&work_dir)
        .context(format!("failed to create scratch directory {:?}", work_dir))?;
    Ok(())
}
