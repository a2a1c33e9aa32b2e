// Shared production-tree fixtures for integration tests

use renderpub::core::config::Config;
use renderpub::core::layout::{ProductionLayout, ShotContext};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

pub const SHOW: &str = "demo";
pub const SEQUENCE: &str = "sq010";
pub const DEPARTMENT: &str = "lighting";

pub struct Project {
    pub dir: TempDir,
    pub config: Config,
}

impl Project {
    /// Working areas under `<shot>/work/<owner>/renders/preview`, publishes
    /// under `<shot>/publish/lighting`
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = Config::new(dir.path(), DEPARTMENT).with_department(
            DEPARTMENT,
            Some("work"),
            Some("publish/lighting"),
        );
        Self { dir, config }
    }

    pub fn layout(&self) -> ProductionLayout<'_> {
        ProductionLayout::new(&self.config)
    }

    pub fn ctx(&self, shot: &str) -> ShotContext {
        ShotContext::new(SHOW, SEQUENCE, shot)
    }

    pub fn shot_root(&self, shot: &str) -> PathBuf {
        self.layout().shot_root(&self.ctx(shot))
    }

    /// Create a working version holding `files` (name, byte count) whose
    /// directory is `age_days` old
    pub fn working_version(
        &self,
        shot: &str,
        owner: &str,
        render: &str,
        version: &str,
        age_days: f64,
        files: &[(&str, usize)],
    ) -> PathBuf {
        let path = self
            .shot_root(shot)
            .join("work")
            .join(owner)
            .join("renders")
            .join("preview")
            .join(render)
            .join(version);
        write_version(&path, age_days, files);
        path
    }

    /// Create a published copy of `render/version`
    pub fn published_version(
        &self,
        shot: &str,
        render: &str,
        version: &str,
        age_days: f64,
        files: &[(&str, usize)],
    ) -> PathBuf {
        let path = self
            .shot_root(shot)
            .join("publish")
            .join("lighting")
            .join(render)
            .join(version);
        write_version(&path, age_days, files);
        path
    }
}

pub fn write_version(path: &Path, age_days: f64, files: &[(&str, usize)]) {
    fs::create_dir_all(path).unwrap();
    for (name, len) in files {
        let file = path.join(name);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&file, vec![b'x'; *len]).unwrap();
    }
    set_age(path, age_days);
}

/// Backdate a directory's modification time
pub fn set_age(path: &Path, age_days: f64) {
    let mtime = SystemTime::now() - Duration::from_secs_f64(age_days * 86_400.0);
    fs::File::open(path).unwrap().set_modified(mtime).unwrap();
}

pub fn file_count(path: &Path) -> usize {
    walk(path).len()
}

fn walk(path: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            let p = entry.path();
            if p.is_dir() {
                files.extend(walk(&p));
            } else {
                files.push(p);
            }
        }
    }
    files
}
