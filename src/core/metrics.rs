//! Directory metrics: recursive size, age in days and directory listings.
//!
//! Every function here treats a missing path (or one that disappears while
//! being read) as empty instead of failing. Archive runs delete while other
//! scans read, so a vanished entry is a normal condition.
//!
//! # Examples
//!
//! ```no_run
//! use renderpub::core::metrics::{age_days, dir_size};
//! use std::path::Path;
//!
//! let path = Path::new("/proj/SHOW/Production/Shots/sq01/sh010");
//! println!("{} bytes, {:.1} days old", dir_size(path), age_days(path));
//! ```

use ignore::{Walk, WalkBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const SECONDS_PER_DAY: f64 = 24.0 * 3600.0;

/// A regular file found by [`walk_files`]
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub len: u64,
}

/// Lazy iterator over the regular files below a directory.
///
/// Symbolic links are neither followed nor yielded. Entries that cannot be
/// read are skipped.
pub struct FileWalk {
    inner: Option<Walk>,
}

impl Iterator for FileWalk {
    type Item = FileEntry;

    fn next(&mut self) -> Option<FileEntry> {
        let walk = self.inner.as_mut()?;
        for result in walk.by_ref() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    log::debug!("skipping unreadable entry: {}", err);
                    continue;
                }
            };

            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file || entry.path_is_symlink() {
                continue;
            }

            // The file may have been deleted between listing and stat.
            let Ok(metadata) = entry.metadata() else {
                continue;
            };

            return Some(FileEntry {
                path: entry.into_path(),
                len: metadata.len(),
            });
        }
        None
    }
}

/// Walk all regular files under `root`. A missing root yields nothing.
pub fn walk_files(root: &Path) -> FileWalk {
    if !root.exists() {
        return FileWalk { inner: None };
    }

    let walk = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(false)
        .follow_links(false)
        .build();

    FileWalk { inner: Some(walk) }
}

/// Recursive sum of file sizes under `path`, 0 if it does not exist
pub fn dir_size(path: &Path) -> u64 {
    walk_files(path).map(|f| f.len).sum()
}

/// Modification time of `path`, if it can be read
pub fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Age of `path` in days measured from `now`
pub fn age_days_at(path: &Path, now: SystemTime) -> f64 {
    match modified_time(path) {
        Some(mtime) => age_between(mtime, now),
        None => 0.0,
    }
}

/// Age of `path` in days, 0 if it does not exist
pub fn age_days(path: &Path) -> f64 {
    age_days_at(path, SystemTime::now())
}

/// Days elapsed from `earlier` to `now`; a timestamp in the future counts as 0
pub fn age_between(earlier: SystemTime, now: SystemTime) -> f64 {
    now.duration_since(earlier)
        .map(|d| d.as_secs_f64() / SECONDS_PER_DAY)
        .unwrap_or(0.0)
}

/// Immediate subdirectories of `dir` in listing order, paired with their
/// modification time. Missing or unreadable directories give an empty list.
pub fn list_subdirectories(dir: &Path) -> Vec<(String, SystemTime)> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut result = Vec::new();
    for entry in entries.flatten() {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_dir() {
            continue;
        }
        let mtime = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        result.push((entry.file_name().to_string_lossy().to_string(), mtime));
    }
    result
}
