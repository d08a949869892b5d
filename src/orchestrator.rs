//! Top-level orchestration actor.
//!
//! One task owns the item cache, the current job, and all metadata writes
//! (the "owner context"). Callers talk to it through a cloneable handle
//! whose operations never block: commands and worker events travel over
//! unbounded channels and are consumed sequentially by the actor loop, so
//! result application can never race further caller mutation.

use crate::{
    cache::{ItemCache, ItemRef},
    common::{OUTPUT_MANIFEST_NAME, errors::JobError},
    config::WorkerConfig,
    external::{ImageEncoder, MetadataStore, NotificationId, NotificationService, ThumbnailRenderer},
    ingest::{self, JobKind},
    manifest::builder::build_input_manifest,
    supervisor::{Generation, ProcessSupervisor, WorkerEvent},
};
use anyhow::{Context, Result};
use log::{error, info, warn};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

enum Command {
    Clear,
    Add(ItemRef),
    AddMany(Vec<ItemRef>),
    StartTagging {
        use_per_category: bool,
        use_threshold: bool,
        threshold: f32,
    },
    StartCaptioning,
    Shutdown,
}

/// Cloneable, non-blocking front door to the orchestrator actor.
#[derive(Clone)]
pub struct OrchestratorHandle {
    commands: UnboundedSender<Command>,
}

impl OrchestratorHandle {
    pub fn clear(&self) {
        let _ = self.commands.send(Command::Clear);
    }

    pub fn add(&self, item: ItemRef) {
        let _ = self.commands.send(Command::Add(item));
    }

    pub fn add_many(&self, items: Vec<ItemRef>) {
        let _ = self.commands.send(Command::AddMany(items));
    }

    /// Starts a categorical tagging job over the cached items. When
    /// `use_threshold` is false the worker receives a threshold of 0.
    pub fn start_categorical_tagging(
        &self,
        use_per_category: bool,
        use_threshold: bool,
        threshold: f32,
    ) {
        let _ = self.commands.send(Command::StartTagging {
            use_per_category,
            use_threshold,
            threshold,
        });
    }

    pub fn start_captioning(&self) {
        let _ = self.commands.send(Command::StartCaptioning);
    }

    /// Stops the actor, terminating any in-flight worker.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

/// Context of the job currently owning the scratch directory.
struct ActiveJob {
    generation: Generation,
    kind: JobKind,
    work_dir: PathBuf,
    notification: NotificationId,
}

pub struct Orchestrator {
    config: WorkerConfig,
    renderer: Arc<dyn ThumbnailRenderer>,
    encoder: Arc<dyn ImageEncoder>,
    store: Arc<dyn MetadataStore>,
    notifier: Arc<dyn NotificationService>,
    cache: ItemCache,
    supervisor: ProcessSupervisor,
    commands_rx: UnboundedReceiver<Command>,
    events_rx: UnboundedReceiver<WorkerEvent>,
    active: Option<ActiveJob>,
}

impl Orchestrator {
    /// Spawns the actor onto the current tokio runtime and returns its
    /// handle. The actor exists until `shutdown` is sent or every handle is
    /// dropped.
    pub fn spawn(
        config: WorkerConfig,
        renderer: Arc<dyn ThumbnailRenderer>,
        encoder: Arc<dyn ImageEncoder>,
        store: Arc<dyn MetadataStore>,
        notifier: Arc<dyn NotificationService>,
    ) -> OrchestratorHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let orchestrator = Orchestrator {
            config,
            renderer,
            encoder,
            store,
            notifier,
            cache: ItemCache::new(),
            supervisor: ProcessSupervisor::new(events_tx),
            commands_rx,
            events_rx,
            active: None,
        };
        tokio::spawn(orchestrator.run());

        OrchestratorHandle {
            commands: commands_tx,
        }
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands_rx.recv() => match command {
                    Some(Command::Clear) => self.cache.clear(),
                    Some(Command::Add(item)) => self.cache.add(item),
                    Some(Command::AddMany(items)) => self.cache.add_many(items),
                    Some(Command::StartTagging { use_per_category, use_threshold, threshold }) => {
                        let threshold = if use_threshold { threshold } else { 0.0 };
                        let extra = vec![
                            format!("{}", use_per_category as u8),
                            format!("{:.2}", threshold),
                        ];
                        info!(
                            "Start categorical tagging: use_per_category={} threshold={:.2}",
                            use_per_category, threshold
                        );
                        self.start_job(JobKind::CategoricalTagging, extra).await;
                    }
                    Some(Command::StartCaptioning) => {
                        info!("Start captioning");
                        self.start_job(JobKind::Captioning, Vec::new()).await;
                    }
                    Some(Command::Shutdown) | None => break,
                },
                Some(event) = self.events_rx.recv() => self.handle_worker_event(event),
            }
        }
        self.supervisor.stop_current();
    }

    async fn start_job(&mut self, kind: JobKind, extra_args: Vec<String>) {
        if self.cache.is_empty() {
            error!("{}: {}", kind, JobError::EmptySelection);
            return;
        }

        // Single-flight: the scratch directory belongs to exactly one job,
        // so the previous worker must be gone before we purge it.
        if let Some(previous) = self.active.take() {
            warn!("Replacing in-flight {} job", previous.kind);
            self.supervisor.stop_current();
            self.notifier.resolve(previous.notification, false);
        }

        let work_dir = self.config.work_dir();
        if let Err(e) = purge_work_dir(&work_dir) {
            error!("Failed to prepare scratch directory: {:#}", e);
            return;
        }

        let notification = self.notifier.push(kind.progress_message());

        // Proxy export may wait on upstream asset preparation; keep it off
        // the owner context so callers stay responsive.
        let items = self.cache.snapshot();
        let renderer = Arc::clone(&self.renderer);
        let encoder = Arc::clone(&self.encoder);
        let build_dir = work_dir.clone();
        let built = tokio::task::spawn_blocking(move || {
            build_input_manifest(&items, &build_dir, renderer.as_ref(), encoder.as_ref())
        })
        .await;

        let built = match built {
            Ok(Ok(built)) => built,
            Ok(Err(e)) => {
                error!("{}", e);
                self.notifier.resolve(notification, false);
                return;
            }
            Err(e) => {
                error!("Manifest build task failed: {}", e);
                self.notifier.resolve(notification, false);
                return;
            }
        };
        if !built.skipped.is_empty() {
            warn!(
                "Proxy export skipped {} of {} items",
                built.skipped.len(),
                built.skipped.len() + built.entries.len()
            );
        }

        let script = self.config.script_path(kind);
        if !script.is_file() {
            error!("{}", JobError::Launch(format!("cannot find {:?}", script)));
            self.notifier.resolve(notification, false);
            return;
        }

        let mut args = vec![
            script.to_string_lossy().into_owned(),
            built.path.to_string_lossy().into_owned(),
        ];
        args.extend(extra_args);

        match self.supervisor.start(&self.config.python_path(), &args) {
            Ok(generation) => {
                self.active = Some(ActiveJob {
                    generation,
                    kind,
                    work_dir,
                    notification,
                });
            }
            Err(e) => {
                error!("{}", e);
                self.notifier.resolve(notification, false);
            }
        }
    }

    fn handle_worker_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Line { generation, line } => {
                // Log stream only; results come from the output manifest.
                if self.is_active(generation) {
                    info!("Worker: {}", line);
                }
            }
            WorkerEvent::Exited { generation, code } => {
                let Some(job) = self.active.take_if(|job| job.generation == generation) else {
                    return;
                };
                self.supervisor.finish(generation);
                self.complete_job(job, code);
            }
        }
    }

    fn is_active(&self, generation: Generation) -> bool {
        self.active
            .as_ref()
            .is_some_and(|job| job.generation == generation)
    }

    /// Terminal handling; runs exactly once per job, on the owner context.
    fn complete_job(&mut self, job: ActiveJob, code: i32) {
        info!("Worker exited with code {} ({})", code, job.kind);

        if code != 0 {
            error!("{}", JobError::WorkerFailed(code));
            self.notifier.resolve(job.notification, false);
            return;
        }

        let output_path = job.work_dir.join(OUTPUT_MANIFEST_NAME);
        let updates = match ingest::ingest(&output_path, job.kind) {
            Ok(updates) => updates,
            Err(e) => {
                error!("Failed to ingest {:?}: {}", output_path, e);
                self.notifier.resolve(job.notification, false);
                return;
            }
        };

        for update in &updates {
            info!("Entry: {} -> {}", update.item, update.value);
            self.store.set_field(&update.item, update.field, &update.value);
        }

        info!("Applied {} metadata updates", updates.len());
        self.notifier.resolve(job.notification, true);
    }
}

/// Deletes and recreates the scratch directory so a stale `output.json`
/// from a cancelled run can never be misread as a fresh result.
fn purge_work_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)
            .context(format!("failed to clear scratch directory {:?}", dir))?;
    }
    fs::create_dir_all(dir).context(format!("failed to create scratch directory {:?}", dir))?;
    Ok(())
}
