//! Worker process supervision.
//!
//! Owns the lifecycle of the single in-flight worker process:
//! - spawns it hidden with piped stdout/stderr
//! - forwards every output line verbatim as an event (never parsed here;
//!   the authoritative result is the output manifest file)
//! - reports exactly one terminal exit event per job
//! - terminates the previous process before a replacement launches
//!
//! Events are tagged with a monotonically increasing generation so that a
//! consumer can discard anything from a replaced job.

use crate::common::errors::JobError;
use log::{info, warn};
use std::{path::Path, process::Stdio};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
    sync::{mpsc::UnboundedSender, oneshot},
};

pub type Generation = u64;

#[derive(Debug)]
pub enum WorkerEvent {
    /// One line of worker stdout or stderr, in write order.
    Line { generation: Generation, line: String },
    /// Terminal outcome; fired at most once per generation and never for a
    /// job that was stopped by its replacement.
    Exited { generation: Generation, code: i32 },
}

struct ActiveJob {
    generation: Generation,
    kill: oneshot::Sender<()>,
}

pub struct ProcessSupervisor {
    events: UnboundedSender<WorkerEvent>,
    current: Option<ActiveJob>,
    next_generation: Generation,
}

impl ProcessSupervisor {
    pub fn new(events: UnboundedSender<WorkerEvent>) -> Self {
        Self {
            events,
            current: None,
            next_generation: 0,
        }
    }

    /// Launches `program args...`, first terminating any job still in
    /// flight. Returns the generation of the new job, or `JobError::Launch`
    /// if the process could not be spawned.
    pub fn start(&mut self, program: &Path, args: &[String]) -> Result<Generation, JobError> {
        self.stop_current();

        let generation = self.next_generation;
        self.next_generation += 1;

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        command.creation_flags(0x0800_0000); // CREATE_NO_WINDOW

        let mut child = command
            .spawn()
            .map_err(|e| JobError::Launch(format!("failed to spawn {:?}: {}", program, e)))?;

        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, generation, self.events.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, generation, self.events.clone());
        }

        let (kill_tx, kill_rx) = oneshot::channel();
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    let code = status.ok().and_then(|s| s.code()).unwrap_or(-1);
                    let _ = events.send(WorkerEvent::Exited { generation, code });
                }
                _ = kill_rx => {
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill replaced worker process: {}", e);
                    }
                    // A stopped job's exit is discarded, not reported.
                }
            }
        });

        info!("Launched worker {:?} (generation {})", program, generation);
        self.current = Some(ActiveJob {
            generation,
            kill: kill_tx,
        });
        Ok(generation)
    }

    /// Terminates the in-flight worker, if any, discarding its eventual
    /// exit callback.
    pub fn stop_current(&mut self) {
        if let Some(job) = self.current.take() {
            info!("Stopping in-flight worker (generation {})", job.generation);
            let _ = job.kill.send(());
        }
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.current
            .as_ref()
            .is_some_and(|job| job.generation == generation)
    }

    /// Frees the job slot after its terminal event has been consumed.
    pub fn finish(&mut self, generation: Generation) {
        if self.is_current(generation) {
            self.current = None;
        }
    }
}

fn forward_lines<R>(reader: R, generation: Generation, events: UnboundedSender<WorkerEvent>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if events.send(WorkerEvent::Line { generation, line }).is_err() {
                break;
            }
        }
    });
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn shell() -> PathBuf {
        PathBuf::from("/bin/sh")
    }

    fn args(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn streams_lines_then_reports_exit_code() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut supervisor = ProcessSupervisor::new(tx);

        let generation = supervisor
            .start(&shell(), &args("echo hello; echo world >&2; exit 3"))
            .unwrap();

        let mut lines = Vec::new();
        loop {
            let event = timeout(Duration::from_secs(10), rx.recv())
                .await
                .expect("worker did not finish")
                .expect("event channel closed");
            match event {
                WorkerEvent::Line { generation: g, line } => {
                    assert_eq!(g, generation);
                    lines.push(line);
                }
                WorkerEvent::Exited { generation: g, code } => {
                    assert_eq!(g, generation);
                    assert_eq!(code, 3);
                    break;
                }
            }
        }

        lines.sort();
        assert_eq!(lines, vec!["hello".to_string(), "world".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn replacing_a_job_discards_its_exit() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut supervisor = ProcessSupervisor::new(tx);

        let first = supervisor.start(&shell(), &args("sleep 30")).unwrap();
        let second = supervisor.start(&shell(), &args("exit 0")).unwrap();
        assert_ne!(first, second);
        assert!(supervisor.is_current(second));

        // Only the second job may report a terminal event.
        loop {
            let event = timeout(Duration::from_secs(10), rx.recv())
                .await
                .expect("replacement worker did not finish")
                .expect("event channel closed");
            if let WorkerEvent::Exited { generation, code } = event {
                assert_eq!(generation, second);
                assert_eq!(code, 0);
                break;
            }
        }

        // The killed job must not surface a late exit.
        assert!(
            timeout(Duration::from_millis(500), rx.recv()).await.is_err(),
            "stale event from replaced job"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_binary_is_a_launch_error() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut supervisor = ProcessSupervisor::new(tx);

        let result = supervisor.start(&PathBuf::from("/no/such/binary"), &[]);
        assert!(matches!(result, Err(JobError::Launch(_))));
        assert!(!supervisor.is_current(0));
    }
}
