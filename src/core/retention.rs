//! Retention analysis for render versions
//!
//! Versions are discovered under each shot root, grouped by render name
//! (across owners in working-area mode) and ordered oldest first by
//! modification time. A policy then marks the versions to delete:
//!
//! - everything except the `count_threshold` most recent versions of a group;
//! - additionally, when max-age is enabled, every version older than
//!   `max_age_days`, even when the count rule would keep it.
//!
//! Analysis has no side effects; deletion happens in
//! [`crate::core::deletion`].

use crate::core::metrics::{age_between, list_subdirectories};
use crate::core::template::PathTemplate;
use crate::error::{RenderPubError, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Owner recorded for versions found in a publish location
pub const PUBLISHED_OWNER: &str = "published";

/// Where versions are enumerated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Per-owner working areas, groups merged across owners
    WorkingArea,
    /// The department's canonical publish location
    Published,
}

/// One render output instance found on disk
#[derive(Debug, Clone, PartialEq)]
pub struct ShotVersion {
    pub shot: String,
    pub render_name: String,
    pub version_label: String,
    pub owner: String,
    pub path: PathBuf,
    pub modified_at: SystemTime,
}

impl ShotVersion {
    /// `<shot>/<render>/<version> (<owner>)`
    pub fn label(&self) -> String {
        format!(
            "{}/{}/{} ({})",
            self.shot, self.render_name, self.version_label, self.owner
        )
    }
}

/// Versions sharing one render name, sorted oldest first
#[derive(Debug, Clone)]
pub struct RenderGroup {
    pub render_name: String,
    pub versions: Vec<ShotVersion>,
}

impl RenderGroup {
    fn new(render_name: String, mut versions: Vec<ShotVersion>) -> Self {
        // Stable sort: equal mtimes keep listing order.
        versions.sort_by_key(|v| v.modified_at);
        Self {
            render_name,
            versions,
        }
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Versions newest first
    pub fn newest_first(&self) -> impl Iterator<Item = &ShotVersion> {
        self.versions.iter().rev()
    }
}

/// Parameters of one archive run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetentionPolicy {
    pub count_threshold: usize,
    pub max_age_enabled: bool,
    pub max_age_days: f64,
}

impl RetentionPolicy {
    /// Keep the `count_threshold` most recent versions of each group
    pub fn keep_latest(count_threshold: usize) -> Self {
        Self {
            count_threshold,
            max_age_enabled: false,
            max_age_days: f64::INFINITY,
        }
    }

    /// Also delete anything older than `days`
    pub fn with_max_age(mut self, days: f64) -> Self {
        self.max_age_enabled = true;
        self.max_age_days = days;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_age_enabled && (self.max_age_days.is_nan() || self.max_age_days <= 0.0) {
            return Err(RenderPubError::config(format!(
                "max age must be a positive number of days, got {}",
                self.max_age_days
            )));
        }
        Ok(())
    }

    /// Versions of `group` to delete, oldest first
    pub fn select<'g>(&self, group: &'g RenderGroup, now: SystemTime) -> Vec<&'g ShotVersion> {
        let versions = &group.versions;
        let by_count = versions.len().saturating_sub(self.count_threshold);

        versions
            .iter()
            .enumerate()
            .filter(|(idx, version)| {
                *idx < by_count
                    || (self.max_age_enabled
                        && age_between(version.modified_at, now) > self.max_age_days)
            })
            .map(|(_, version)| version)
            .collect()
    }
}

/// A version selected for deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionCandidate {
    pub path: PathBuf,
    pub label: String,
}

/// Ordered, de-duplicated deletion set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionPlan {
    pub candidates: Vec<DeletionCandidate>,
}

impl DeletionPlan {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.candidates.iter().map(|c| c.path.clone()).collect()
    }

    pub fn labels(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.label.clone()).collect()
    }
}

fn shot_name(shot_root: &Path) -> String {
    shot_root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| shot_root.display().to_string())
}

fn collect_versions(
    shot: &str,
    render_root: &Path,
    owner: &str,
    groups: &mut BTreeMap<String, Vec<ShotVersion>>,
) {
    for (render_name, _) in list_subdirectories(render_root) {
        let render_path = render_root.join(&render_name);
        let versions = groups.entry(render_name.clone()).or_default();
        for (version_label, modified_at) in list_subdirectories(&render_path) {
            versions.push(ShotVersion {
                shot: shot.to_string(),
                render_name: render_name.clone(),
                path: render_path.join(&version_label),
                version_label,
                owner: owner.to_string(),
                modified_at,
            });
        }
    }
}

/// Enumerate the render groups of one shot, sorted by render name.
///
/// A missing base directory gives no groups; groups without versions are
/// dropped.
pub fn scan_render_groups(
    shot_root: &Path,
    template: &PathTemplate,
    mode: ScanMode,
) -> Vec<RenderGroup> {
    let shot = shot_name(shot_root);
    let mut groups: BTreeMap<String, Vec<ShotVersion>> = BTreeMap::new();

    match mode {
        ScanMode::WorkingArea => {
            let owner_base = template.owner_base(shot_root);
            if !owner_base.is_dir() {
                log::debug!("no working area at {}", owner_base.display());
                return Vec::new();
            }
            for (owner, _) in list_subdirectories(&owner_base) {
                let render_root = template.owner_render_root(shot_root, &owner);
                collect_versions(&shot, &render_root, &owner, &mut groups);
            }
        }
        ScanMode::Published => {
            let publish_root = template.resolve(shot_root);
            if !publish_root.is_dir() {
                log::debug!("no publish area at {}", publish_root.display());
                return Vec::new();
            }
            collect_versions(&shot, &publish_root, PUBLISHED_OWNER, &mut groups);
        }
    }

    groups
        .into_iter()
        .filter(|(_, versions)| !versions.is_empty())
        .map(|(name, versions)| RenderGroup::new(name, versions))
        .collect()
}

/// Computes deletion sets for a list of shots
pub struct RetentionAnalyzer<'a> {
    template: &'a PathTemplate,
    mode: ScanMode,
    policy: RetentionPolicy,
}

impl<'a> RetentionAnalyzer<'a> {
    pub fn new(template: &'a PathTemplate, mode: ScanMode, policy: RetentionPolicy) -> Self {
        Self {
            template,
            mode,
            policy,
        }
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    pub fn analyze(&self, shot_roots: &[PathBuf]) -> DeletionPlan {
        self.analyze_at(shot_roots, SystemTime::now())
    }

    /// Same as [`analyze`](Self::analyze) with ages measured from `now`
    pub fn analyze_at(&self, shot_roots: &[PathBuf], now: SystemTime) -> DeletionPlan {
        let mut plan = DeletionPlan::default();
        let mut seen: HashSet<PathBuf> = HashSet::new();

        for shot_root in shot_roots {
            if !shot_root.is_dir() {
                log::debug!("skipping missing shot {}", shot_root.display());
                continue;
            }

            for group in scan_render_groups(shot_root, self.template, self.mode) {
                let selected = self.policy.select(&group, now);
                log::debug!(
                    "{}: {} of {} versions selected",
                    group.render_name,
                    selected.len(),
                    group.len()
                );

                for version in selected {
                    if seen.insert(version.path.clone()) {
                        plan.candidates.push(DeletionCandidate {
                            path: version.path.clone(),
                            label: version.label(),
                        });
                    }
                }
            }
        }

        log::info!("retention analysis selected {} versions", plan.len());
        plan
    }
}
