//! Publishing working versions into the department's publish location
//!
//! A working version `<owner area>/<render>/<version>` is published to
//! `<shot>/<publish_path>/<render>/<version>`. Whether that has already
//! happened is judged from directory sizes alone.

use crate::core::audit::{append_entry, PublishLogEntry, PublishRecord, Stamp};
use crate::core::config::Config;
use crate::core::layout::{ProductionLayout, ShotContext};
use crate::core::metrics::dir_size;
use crate::core::retention::{scan_render_groups, ScanMode, ShotVersion};
use crate::core::template::PathTemplate;
use crate::core::transfer::{BatchOutcome, Throttle, TransferBatch, TransferJob, TransferMode};
use crate::error::{RenderPubError, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStatus {
    /// Working version holds no data
    Empty,
    /// Nothing at the publish destination
    Unpublished,
    /// Published copy is smaller than the working version
    Stale,
    Published,
}

impl PublishStatus {
    pub fn from_sizes(source_size: u64, published_size: Option<u64>) -> Self {
        if source_size == 0 {
            return PublishStatus::Empty;
        }
        match published_size {
            None => PublishStatus::Unpublished,
            Some(size) if size < source_size => PublishStatus::Stale,
            Some(_) => PublishStatus::Published,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PublishStatus::Empty => "empty",
            PublishStatus::Unpublished => "unpublished",
            PublishStatus::Stale => "stale",
            PublishStatus::Published => "published",
        }
    }
}

/// A working version together with its publish state
#[derive(Debug, Clone)]
pub struct VersionStatus {
    pub version: ShotVersion,
    pub size: u64,
    pub destination: PathBuf,
    pub status: PublishStatus,
}

/// Working versions of one render name, newest first
#[derive(Debug, Clone)]
pub struct RenderListing {
    pub render_name: String,
    pub versions: Vec<VersionStatus>,
}

/// Publish destination of a working version
pub fn destination_for(shot_root: &Path, publish: &PathTemplate, version: &ShotVersion) -> PathBuf {
    publish
        .resolve(shot_root)
        .join(&version.render_name)
        .join(&version.version_label)
}

fn status_of(version: &ShotVersion, destination: &Path) -> (u64, PublishStatus) {
    let size = dir_size(&version.path);
    let published = if destination.is_dir() {
        Some(dir_size(destination))
    } else {
        None
    };
    (size, PublishStatus::from_sizes(size, published))
}

/// List every working version of a shot with its publish status.
///
/// Without a publish location configured every non-empty version is
/// reported as unpublished.
pub fn list_working_versions(config: &Config, ctx: &ShotContext) -> Result<Vec<RenderListing>> {
    let source = config.source_template()?;
    let publish = config.publish_template().ok();
    let shot_root = ProductionLayout::new(config).shot_root(ctx);

    let listings = scan_render_groups(&shot_root, &source, ScanMode::WorkingArea)
        .into_iter()
        .map(|group| {
            let versions = group
                .newest_first()
                .map(|version| {
                    let (size, status, destination) = match &publish {
                        Some(publish) => {
                            let destination = destination_for(&shot_root, publish, version);
                            let (size, status) = status_of(version, &destination);
                            (size, status, destination)
                        }
                        None => {
                            let size = dir_size(&version.path);
                            (size, PublishStatus::from_sizes(size, None), PathBuf::new())
                        }
                    };
                    VersionStatus {
                        version: version.clone(),
                        size,
                        destination,
                        status,
                    }
                })
                .collect();
            RenderListing {
                render_name: group.render_name.clone(),
                versions,
            }
        })
        .collect();

    Ok(listings)
}

/// Find the working version named by `selector`.
///
/// Selectors read `<render>/<version>` or `<render>/<version>@<owner>`.
/// The owner is required only when several owners hold that version.
pub fn resolve_selector(listings: &[RenderListing], selector: &str) -> Result<PathBuf> {
    let (name, owner) = match selector.split_once('@') {
        Some((name, owner)) => (name, Some(owner)),
        None => (selector, None),
    };
    let Some((render, version)) = name.split_once('/') else {
        return Err(RenderPubError::invalid_path(format!(
            "'{}' is not of the form <render>/<version>[@owner]",
            selector
        )));
    };

    let matches: Vec<&ShotVersion> = listings
        .iter()
        .filter(|l| l.render_name == render)
        .flat_map(|l| l.versions.iter().map(|v| &v.version))
        .filter(|v| v.version_label == version)
        .filter(|v| owner.map_or(true, |o| v.owner == o))
        .collect();

    match matches.as_slice() {
        [] => Err(RenderPubError::invalid_path(format!(
            "no working version matches '{}'",
            selector
        ))),
        [single] => Ok(single.path.clone()),
        several => {
            let owners: Vec<&str> = several.iter().map(|v| v.owner.as_str()).collect();
            Err(RenderPubError::invalid_path(format!(
                "'{}' exists for several owners ({}); add @<owner>",
                selector,
                owners.join(", ")
            )))
        }
    }
}

/// A ready-to-run publish
#[derive(Debug, Clone)]
pub struct PublishPlan {
    pub batch: TransferBatch,
    pub records: Vec<PublishRecord>,
}

/// Turn selected working version directories into a transfer batch.
///
/// Each path must be a version directory `<render>/<version>` inside the
/// shot. The publish location must be configured.
pub fn plan_publish(
    config: &Config,
    ctx: &ShotContext,
    selected: &[PathBuf],
    mode: TransferMode,
    throttle: Throttle,
) -> Result<PublishPlan> {
    let publish = config.publish_template()?;
    let shot_root = ProductionLayout::new(config).shot_root(ctx);
    let publish_root = publish.resolve(&shot_root);

    if selected.is_empty() {
        return Err(RenderPubError::other("no versions selected for publishing"));
    }

    let mut jobs = Vec::with_capacity(selected.len());
    let mut records = Vec::with_capacity(selected.len());

    for source in selected {
        if !source.is_dir() {
            return Err(RenderPubError::invalid_path(format!(
                "{} is not a directory",
                source.display()
            )));
        }
        if !source.starts_with(&shot_root) {
            return Err(RenderPubError::invalid_path(format!(
                "{} is outside shot {}",
                source.display(),
                shot_root.display()
            )));
        }

        let version = source.file_name();
        let render = source.parent().and_then(Path::file_name);
        let (Some(render), Some(version)) = (render, version) else {
            return Err(RenderPubError::invalid_path(format!(
                "{} is not a render version directory",
                source.display()
            )));
        };

        let destination = publish_root.join(render).join(version);
        records.push(PublishRecord {
            source: source.to_string_lossy().to_string(),
            destination: destination.to_string_lossy().to_string(),
        });
        jobs.push(TransferJob::new(source.clone(), destination, mode));
    }

    Ok(PublishPlan {
        batch: TransferBatch::new(jobs, throttle)?,
        records,
    })
}

/// Append the publish to the shot's log if the batch succeeded.
///
/// Returns the log path when an entry was written. A failed or aborted
/// batch is never recorded.
pub fn record_publish(
    config: &Config,
    ctx: &ShotContext,
    plan: &PublishPlan,
    outcome: &BatchOutcome,
    stamp: Stamp,
    comment: &str,
) -> Result<Option<PathBuf>> {
    if !outcome.success {
        log::info!("publish of {} failed, no audit entry written", ctx.shot);
        return Ok(None);
    }

    let mode = plan
        .batch
        .jobs()
        .first()
        .map(|job| job.mode)
        .unwrap_or(TransferMode::Copy);
    let entry = PublishLogEntry::new(stamp, mode.as_str(), comment, plan.records.clone());
    let path = ProductionLayout::new(config).publish_log_path(ctx);
    append_entry(&path, &entry)?;
    Ok(Some(path))
}

/// Which area of a shot to measure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeArea {
    /// Working area (all owners)
    Wip,
    /// Publish location
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotSize {
    pub shot: String,
    pub size: u64,
}

/// Recursive size of one area for every shot of a sequence
pub fn shot_sizes(
    config: &Config,
    show: &str,
    sequence: &str,
    area: SizeArea,
) -> Result<Vec<ShotSize>> {
    let template = match area {
        SizeArea::Wip => config.source_template()?,
        SizeArea::Final => config.publish_template()?,
    };
    let layout = ProductionLayout::new(config);

    Ok(layout
        .list_shots(show, sequence)
        .into_iter()
        .map(|shot| {
            let shot_root = layout.shot_root(&ShotContext::new(show, sequence, shot.as_str()));
            let root = match area {
                SizeArea::Wip => template.owner_base(&shot_root),
                SizeArea::Final => template.resolve(&shot_root),
            };
            ShotSize {
                size: dir_size(&root),
                shot,
            }
        })
        .collect())
}
