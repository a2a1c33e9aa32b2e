//! Sequential transfer of version directories through an external
//! mirroring tool
//!
//! A [`TransferBatch`] is executed one job at a time: exactly one external
//! process is in flight. Its output is parsed for percentage and speed, and
//! overall progress is reported as
//! `(completed_jobs + current_fraction) / total_jobs`. The batch stops at the
//! first job that cannot start or exits with a failure code (>= 8).
//!
//! Pause and resume freeze and thaw the running process at the OS level.
//! Abort kills it and prevents any further job from starting. Files already
//! transferred are left in place.
//!
//! # Examples
//!
//! ```no_run
//! use renderpub::core::events::WorkerEvent;
//! use renderpub::core::transfer::{
//!     MirrorCommand, Throttle, TransferBatch, TransferJob, TransferMode, TransferOrchestrator,
//! };
//! use renderpub::platform::process::SystemLauncher;
//! use std::sync::Arc;
//!
//! let batch = TransferBatch::new(
//!     vec![TransferJob::new("/wip/v001".into(), "/pub/v001".into(), TransferMode::Copy)],
//!     Throttle::Fast,
//! )?;
//! let orchestrator =
//!     TransferOrchestrator::new(batch, MirrorCommand::new("robocopy"), Arc::new(SystemLauncher));
//! let handle = orchestrator.spawn();
//! for event in handle.events.iter() {
//!     println!("{:?}", event);
//!     if let WorkerEvent::Finished { .. } = event {
//!         break;
//!     }
//! }
//! let outcome = handle.join();
//! println!("success: {}", outcome.success);
//! # Ok::<(), renderpub::RenderPubError>(())
//! ```

mod command;
mod output;
pub mod scripted;

pub use command::MirrorCommand;
pub use output::{parse_percent, parse_speed, LineSplitter};

use crate::core::events::{EventSink, WorkerEvent};
use crate::error::{RenderPubError, Result};
use crate::platform::process::{ProcessControl, ProcessLauncher};
use parking_lot::Mutex;
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Exit codes at or above this value mean at least one real failure
pub const FAILURE_EXIT_CODE: i32 = 8;

const READ_BUFFER_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Copy,
    Move,
}

impl TransferMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferMode::Copy => "Copy",
            TransferMode::Move => "Move",
        }
    }

    fn verb(self) -> &'static str {
        match self {
            TransferMode::Copy => "Copying",
            TransferMode::Move => "Moving",
        }
    }
}

/// Transfer speed policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Throttle {
    /// Multi-threaded, unthrottled
    Fast,
    /// Serialized with an inter-packet gap
    Slow { inter_packet_gap_ms: u64 },
}

impl Throttle {
    pub fn name(self) -> &'static str {
        match self {
            Throttle::Fast => "Fast",
            Throttle::Slow { .. } => "Slow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub mode: TransferMode,
}

impl TransferJob {
    pub fn new(source: PathBuf, destination: PathBuf, mode: TransferMode) -> Self {
        Self {
            source,
            destination,
            mode,
        }
    }

    fn display_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

/// Ordered, non-empty list of jobs sharing one throttle setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferBatch {
    jobs: Vec<TransferJob>,
    throttle: Throttle,
}

impl TransferBatch {
    pub fn new(jobs: Vec<TransferJob>, throttle: Throttle) -> Result<Self> {
        if jobs.is_empty() {
            return Err(RenderPubError::other("a transfer batch needs at least one job"));
        }
        Ok(Self { jobs, throttle })
    }

    pub fn jobs(&self) -> &[TransferJob] {
        &self.jobs
    }

    pub fn throttle(&self) -> Throttle {
        self.throttle
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Result of a batch run
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub success: bool,
    /// Every log line emitted during the run, in order
    pub log: Vec<String>,
    /// Jobs for which a process launch was attempted
    pub attempted: Vec<TransferJob>,
    pub completed: usize,
    pub last_speed: Option<String>,
}

/// State shared between the worker thread and control handles
struct Shared {
    aborted: AtomicBool,
    current: Mutex<Option<Arc<dyn ProcessControl>>>,
    log: Mutex<Vec<String>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            aborted: AtomicBool::new(false),
            current: Mutex::new(None),
            log: Mutex::new(Vec::new()),
        }
    }

    fn emit_log(&self, sink: &EventSink, line: impl Into<String>) {
        let line = line.into();
        self.log.lock().push(line.clone());
        sink.log(line);
    }

    fn current(&self) -> Option<Arc<dyn ProcessControl>> {
        self.current.lock().clone()
    }
}

/// Pause/resume/abort signals for a running batch. Cheap to clone.
#[derive(Clone)]
pub struct TransferControl {
    shared: Arc<Shared>,
    sink: EventSink,
}

impl TransferControl {
    /// Freeze the running process. No-op unless a process is running and
    /// not already suspended.
    pub fn pause(&self) {
        let Some(process) = self.shared.current() else {
            return;
        };
        if !process.is_running() || process.is_suspended() {
            return;
        }
        match process.suspend() {
            Ok(()) => self.shared.emit_log(&self.sink, "--- PROCESS PAUSED ---"),
            Err(err) => self.report_signal_error(err),
        }
    }

    /// Thaw a suspended process. No-op unless it is currently suspended.
    pub fn resume(&self) {
        let Some(process) = self.shared.current() else {
            return;
        };
        if !process.is_suspended() {
            return;
        }
        match process.resume() {
            Ok(()) => self.shared.emit_log(&self.sink, "--- PROCESS RESUMED ---"),
            Err(err) => self.report_signal_error(err),
        }
    }

    pub fn set_paused(&self, paused: bool) {
        if paused {
            self.pause()
        } else {
            self.resume()
        }
    }

    pub fn is_paused(&self) -> bool {
        self.shared
            .current()
            .map(|p| p.is_suspended())
            .unwrap_or(false)
    }

    /// Stop the batch: kill the running process and start no further jobs
    pub fn abort(&self) {
        if self.shared.aborted.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.emit_log(&self.sink, "--- ABORTING ---");
        if let Some(process) = self.shared.current() {
            if process.is_running() {
                if let Err(err) = process.kill() {
                    log::warn!("failed to kill pid {}: {}", process.pid(), err);
                }
            }
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.shared.aborted.load(Ordering::SeqCst)
    }

    fn report_signal_error(&self, err: std::io::Error) {
        log::warn!("pause/resume failed: {}", err);
        self.shared
            .emit_log(&self.sink, format!("Pause/Resume Error: {}", err));
    }
}

/// Drives a [`TransferBatch`] job by job
pub struct TransferOrchestrator {
    batch: TransferBatch,
    command: MirrorCommand,
    launcher: Arc<dyn ProcessLauncher>,
    shared: Arc<Shared>,
}

/// Progress bookkeeping for one batch
struct ProgressTracker {
    total_jobs: usize,
    reported: u8,
}

impl ProgressTracker {
    /// Report `(job_index + fraction) / total_jobs` without ever going
    /// backwards. Values below 100 only: 100 is reserved for full success.
    fn update(&mut self, job_index: usize, fraction: f64, sink: &EventSink) {
        let overall = (job_index as f64 + fraction.clamp(0.0, 1.0)) / self.total_jobs as f64;
        let value = ((overall * 100.0) as u8).min(99);
        if value > self.reported {
            self.reported = value;
            sink.progress(value);
        }
    }

    fn complete(&mut self, sink: &EventSink) {
        self.reported = 100;
        sink.progress(100);
    }
}

impl TransferOrchestrator {
    pub fn new(
        batch: TransferBatch,
        command: MirrorCommand,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        Self {
            batch,
            command,
            launcher,
            shared: Arc::new(Shared::new()),
        }
    }

    pub fn batch(&self) -> &TransferBatch {
        &self.batch
    }

    /// The command line each job would run, in order. Touches neither the
    /// filesystem nor the launcher.
    pub fn preview(&self) -> Vec<String> {
        let throttle = self.batch.throttle();
        self.batch
            .jobs()
            .iter()
            .map(|job| self.command.display(job, throttle))
            .collect()
    }

    /// Control handle bound to `sink` for its log lines
    pub fn control(&self, sink: EventSink) -> TransferControl {
        TransferControl {
            shared: self.shared.clone(),
            sink,
        }
    }

    /// Run the batch on a dedicated worker thread
    pub fn spawn(self) -> TransferHandle {
        let (tx, rx) = mpsc::channel();
        let sink = EventSink::new(tx);
        let control = self.control(sink.clone());
        let thread = thread::spawn(move || self.run(&sink));

        TransferHandle {
            events: rx,
            control,
            thread,
        }
    }

    /// Run the batch on the current thread. Ends with exactly one
    /// `Finished` event.
    pub fn run(&self, sink: &EventSink) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let mut tracker = ProgressTracker {
            total_jobs: self.batch.len(),
            reported: 0,
        };
        let throttle = self.batch.throttle();
        let mut success = true;

        for (index, job) in self.batch.jobs().iter().enumerate() {
            if self.is_aborted() {
                success = false;
                break;
            }

            self.log(sink, format!("{} '{}'...", job.mode.verb(), job.display_name()));
            self.log(sink, format!("  Source: {}", job.source.display()));
            self.log(sink, format!("  Destination: {}", job.destination.display()));

            if let Some(parent) = job.destination.parent() {
                if let Err(err) = fs::create_dir_all(parent) {
                    self.log(
                        sink,
                        format!("ERROR: Could not create {}: {}", parent.display(), err),
                    );
                    success = false;
                    break;
                }
            }

            outcome.attempted.push(job.clone());
            let args = self.command.args(job, throttle);
            let launched = match self.launcher.launch(self.command.program(), &args) {
                Ok(launched) => launched,
                Err(err) => {
                    self.log(
                        sink,
                        format!(
                            "ERROR: Could not start {} for {}: {}",
                            self.command.program(),
                            job.source.display(),
                            err
                        ),
                    );
                    success = false;
                    break;
                }
            };

            let process = launched.control;
            *self.shared.current.lock() = Some(process.clone());

            // An abort that raced with the launch must still stop this process.
            if self.is_aborted() {
                if let Err(err) = process.kill() {
                    log::warn!("failed to stop {} after abort: {}", self.command.program(), err);
                }
            }

            self.pump_output(launched.output, index, &mut tracker, &mut outcome, sink);

            let exit = process.wait();
            *self.shared.current.lock() = None;

            if self.is_aborted() {
                success = false;
                break;
            }

            match exit {
                Ok(code) if (0..FAILURE_EXIT_CODE).contains(&code) => {
                    log::debug!("job {} finished with exit code {}", index + 1, code);
                    outcome.completed += 1;
                    tracker.update(index + 1, 0.0, sink);
                }
                Ok(code) => {
                    self.log(
                        sink,
                        format!(
                            "ERROR: {} failed with exit code {}",
                            self.command.program(),
                            code
                        ),
                    );
                    success = false;
                    break;
                }
                Err(err) => {
                    self.log(
                        sink,
                        format!("ERROR: Lost track of {}: {}", self.command.program(), err),
                    );
                    success = false;
                    break;
                }
            }
        }

        if success && outcome.completed == self.batch.len() {
            tracker.complete(sink);
        } else {
            success = false;
        }

        outcome.success = success;
        outcome.log = self.shared.log.lock().clone();
        sink.finished(success);

        log::info!(
            "transfer batch finished: success={} completed={}/{}",
            success,
            outcome.completed,
            self.batch.len()
        );
        outcome
    }

    fn pump_output(
        &self,
        mut output: Box<dyn Read + Send>,
        job_index: usize,
        tracker: &mut ProgressTracker,
        outcome: &mut BatchOutcome,
        sink: &EventSink,
    ) {
        let mut splitter = LineSplitter::new();
        let mut buf = [0u8; READ_BUFFER_SIZE];

        loop {
            let lines = match output.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => splitter.push(&buf[..n]),
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    log::warn!("stopped reading transfer output: {}", err);
                    break;
                }
            };
            for line in lines {
                self.handle_line(line, job_index, tracker, outcome, sink);
            }
        }

        for line in splitter.finish() {
            self.handle_line(line, job_index, tracker, outcome, sink);
        }
    }

    fn handle_line(
        &self,
        line: String,
        job_index: usize,
        tracker: &mut ProgressTracker,
        outcome: &mut BatchOutcome,
        sink: &EventSink,
    ) {
        if let Some(pct) = parse_percent(&line) {
            tracker.update(job_index, pct / 100.0, sink);
        }
        if let Some(speed) = parse_speed(&line) {
            sink.send(WorkerEvent::Speed(speed.clone()));
            outcome.last_speed = Some(speed);
        }
        self.log(sink, line);
    }

    fn log(&self, sink: &EventSink, line: impl Into<String>) {
        self.shared.emit_log(sink, line);
    }

    fn is_aborted(&self) -> bool {
        self.shared.aborted.load(Ordering::SeqCst)
    }
}

/// Handle of a batch running on a worker thread.
///
/// The handle's control keeps the event channel open, so readers stop at
/// `Finished` rather than waiting for disconnection.
pub struct TransferHandle {
    pub events: Receiver<WorkerEvent>,
    control: TransferControl,
    thread: JoinHandle<BatchOutcome>,
}

impl TransferHandle {
    pub fn control(&self) -> TransferControl {
        self.control.clone()
    }

    pub fn pause(&self) {
        self.control.pause()
    }

    pub fn resume(&self) {
        self.control.resume()
    }

    pub fn abort(&self) {
        self.control.abort()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the worker and return its outcome
    pub fn join(self) -> BatchOutcome {
        self.thread.join().unwrap_or_else(|_| BatchOutcome {
            success: false,
            ..Default::default()
        })
    }
}
