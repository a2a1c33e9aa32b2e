//! Deletion of version directories selected by retention analysis
//!
//! Every file below each selected version is removed, then now-empty
//! subdirectories are pruned. The version directory itself is kept (empty)
//! so the version still shows up as archived. A file that cannot be removed
//! is logged and counted; it never stops the run.
//!
//! # Examples
//!
//! ```no_run
//! use renderpub::core::deletion::VersionCleaner;
//! use renderpub::core::events::EventSink;
//! use renderpub::core::retention::DeletionPlan;
//!
//! let cleaner = VersionCleaner::new();
//! let stats = cleaner.clean(&DeletionPlan::default(), &EventSink::discard());
//! assert!(stats.nothing_to_do());
//! ```

use crate::core::events::{percent, EventSink, WorkerEvent};
use crate::core::metrics::walk_files;
use crate::core::retention::{DeletionCandidate, DeletionPlan};
use std::fs;
use std::io;
use std::path::{Component, Path};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub const NOTHING_TO_DO_MESSAGE: &str =
    "All versions are within the specified filters. Nothing to archive.";

type RemoveFn = dyn Fn(&Path) -> io::Result<()> + Send + Sync;

/// Removes the contents of selected version directories
pub struct VersionCleaner {
    pub cancel_flag: Arc<AtomicBool>,
    remover: Box<RemoveFn>,
}

/// Statistics from a cleanup run
#[derive(Debug, Default, Clone)]
pub struct CleanupStats {
    pub total_candidates: usize,
    pub deleted_files: usize,
    pub deleted_size: u64,
    pub failed_files: usize,
    pub was_cancelled: bool,
    /// Versions whose deletion was attempted, in order
    pub attempted: Vec<DeletionCandidate>,
}

impl CleanupStats {
    pub fn nothing_to_do(&self) -> bool {
        self.total_candidates == 0
    }

    pub fn success(&self) -> bool {
        !self.was_cancelled
    }

    pub fn attempted_labels(&self) -> Vec<String> {
        self.attempted.iter().map(|c| c.label.clone()).collect()
    }
}

impl Default for VersionCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionCleaner {
    pub fn new() -> Self {
        Self {
            cancel_flag: Arc::new(AtomicBool::new(false)),
            remover: Box::new(|path| fs::remove_file(path)),
        }
    }

    /// Replace the function used to delete individual files
    pub fn with_remover<F>(mut self, remover: F) -> Self
    where
        F: Fn(&Path) -> io::Result<()> + Send + Sync + 'static,
    {
        self.remover = Box::new(remover);
        self
    }

    /// Request cancellation; checked before each version directory
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    /// Delete every candidate in `plan`, reporting through `events`.
    ///
    /// Always ends with exactly one `Finished` event.
    pub fn clean(&self, plan: &DeletionPlan, events: &EventSink) -> CleanupStats {
        let mut stats = CleanupStats {
            total_candidates: plan.len(),
            ..Default::default()
        };

        if plan.is_empty() {
            events.log(NOTHING_TO_DO_MESSAGE);
            events.finished(true);
            return stats;
        }

        for (i, candidate) in plan.candidates.iter().enumerate() {
            if self.is_cancelled() {
                events.log("--- ABORTING ---");
                stats.was_cancelled = true;
                break;
            }

            events.log(format!("Cleaning: {}", short_display(&candidate.path, 5)));
            stats.attempted.push(candidate.clone());
            self.clean_version(&candidate.path, events, &mut stats);

            events.progress(percent(i + 1, plan.len()));
        }

        if stats.was_cancelled {
            events.finished(false);
        } else {
            events.log(format!(
                "Archive operation complete. {} files removed, {} failed.",
                stats.deleted_files, stats.failed_files
            ));
            events.finished(true);
        }

        log::info!(
            "cleanup finished: {} versions attempted, {} files deleted, {} failed",
            stats.attempted.len(),
            stats.deleted_files,
            stats.failed_files
        );
        stats
    }

    fn clean_version(&self, version_dir: &Path, events: &EventSink, stats: &mut CleanupStats) {
        let files: Vec<_> = walk_files(version_dir).collect();

        for file in files {
            match (self.remover)(&file.path) {
                Ok(()) => {
                    stats.deleted_files += 1;
                    stats.deleted_size += file.len;
                }
                // Already gone: nothing left to do for this file.
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    stats.failed_files += 1;
                    let name = file
                        .path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default();
                    events.log(format!("  ERROR deleting file {}: {}", name, err));
                    log::warn!("failed to delete {}: {}", file.path.display(), err);
                }
            }
        }

        prune_empty_dirs(version_dir);
    }

    /// Run [`clean`](Self::clean) on a background thread
    pub fn spawn(self, plan: DeletionPlan) -> CleanupHandle {
        let (tx, rx) = mpsc::channel();
        let cancel_flag = self.cancel_flag.clone();
        let thread = thread::spawn(move || self.clean(&plan, &EventSink::new(tx)));

        CleanupHandle {
            events: rx,
            cancel_flag,
            thread,
        }
    }
}

/// Control handle of a background cleanup
pub struct CleanupHandle {
    pub events: Receiver<WorkerEvent>,
    cancel_flag: Arc<AtomicBool>,
    thread: JoinHandle<CleanupStats>,
}

impl CleanupHandle {
    pub fn abort(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel_flag.clone()
    }

    pub fn join(self) -> CleanupStats {
        self.thread.join().unwrap_or_else(|_| CleanupStats {
            was_cancelled: true,
            ..Default::default()
        })
    }
}

/// Remove empty directories below `dir`, keeping `dir` itself
fn prune_empty_dirs(dir: &Path) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }
        let path = entry.path();
        prune_empty_dirs(&path);
        if let Err(err) = fs::remove_dir(&path) {
            log::debug!("keeping directory {}: {}", path.display(), err);
        }
    }
}

/// `.../a/b/c` using the last `keep` components of `path`
fn short_display(path: &Path, keep: usize) -> String {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();
    let start = parts.len().saturating_sub(keep);
    format!(".../{}", parts[start..].join("/"))
}
