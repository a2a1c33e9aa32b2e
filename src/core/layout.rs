// Production tree layout: <root>/<show>/Production/Shots/<sequence>/<shot>

use crate::core::config::Config;
use crate::core::metrics::list_subdirectories;
use std::path::{Path, PathBuf};

const SHOTS_SUBPATH: [&str; 2] = ["Production", "Shots"];

/// Show/sequence/shot coordinates of a single shot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotContext {
    pub show: String,
    pub sequence: String,
    pub shot: String,
}

impl ShotContext {
    pub fn new(show: impl Into<String>, sequence: impl Into<String>, shot: impl Into<String>) -> Self {
        Self {
            show: show.into(),
            sequence: sequence.into(),
            shot: shot.into(),
        }
    }
}

/// Resolves production-tree locations from the configured project root
pub struct ProductionLayout<'a> {
    config: &'a Config,
}

fn join_subpath(base: &Path, subpath: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    for seg in subpath.split('/').filter(|s| !s.is_empty()) {
        path.push(seg);
    }
    path
}

impl<'a> ProductionLayout<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn show_root(&self, show: &str) -> PathBuf {
        self.config.project_root.join(show)
    }

    pub fn sequences_root(&self, show: &str) -> PathBuf {
        let mut path = self.show_root(show);
        for seg in SHOTS_SUBPATH {
            path.push(seg);
        }
        path
    }

    pub fn sequence_root(&self, show: &str, sequence: &str) -> PathBuf {
        self.sequences_root(show).join(sequence)
    }

    pub fn shot_root(&self, ctx: &ShotContext) -> PathBuf {
        self.sequence_root(&ctx.show, &ctx.sequence).join(&ctx.shot)
    }

    /// Audit log for publishes of one shot
    pub fn publish_log_path(&self, ctx: &ShotContext) -> PathBuf {
        join_subpath(&self.shot_root(ctx), &self.config.metadata_subpath)
            .join(&self.config.publish_log_name)
    }

    /// Audit log for archive runs of one sequence. Lives in the sibling
    /// `<sequence><suffix>` directory.
    pub fn archive_log_path(&self, show: &str, sequence: &str) -> PathBuf {
        let dir_name = format!("{}{}", sequence, self.config.sequence_metadata_suffix);
        join_subpath(
            &self.sequences_root(show).join(dir_name),
            &self.config.metadata_subpath,
        )
        .join(&self.config.archive_log_name)
    }

    pub fn list_shows(&self) -> Vec<String> {
        sorted_names(&self.config.project_root)
    }

    pub fn list_sequences(&self, show: &str) -> Vec<String> {
        sorted_names(&self.sequences_root(show))
    }

    pub fn list_shots(&self, show: &str, sequence: &str) -> Vec<String> {
        sorted_names(&self.sequence_root(show, sequence))
    }
}

fn sorted_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = list_subdirectories(dir)
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    names.sort();
    names
}
