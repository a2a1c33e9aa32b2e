// Integration tests for publish status, planning and recording

use super::fixtures::*;
use renderpub::core::audit::{read_entries, Stamp};
use renderpub::core::config::Config;
use renderpub::core::events::EventSink;
use renderpub::core::publish::{
    list_working_versions, plan_publish, record_publish, resolve_selector, shot_sizes,
    PublishStatus, SizeArea,
};
use renderpub::core::transfer::scripted::{Script, ScriptedLauncher};
use renderpub::core::transfer::{MirrorCommand, Throttle, TransferMode, TransferOrchestrator};
use renderpub::RenderPubError;
use std::sync::Arc;

fn stamp() -> Stamp {
    Stamp {
        user: "amy_lee".to_string(),
        host: "ws01".to_string(),
        date_time: "16 Oct 2026 10:00:00".to_string(),
    }
}

#[test]
fn test_version_listing_reports_publish_status() {
    let project = Project::new();
    project.working_version("sh010", "amy", "beauty", "v001", 4.0, &[("a.exr", 10)]);
    project.working_version("sh010", "amy", "beauty", "v002", 3.0, &[("a.exr", 10)]);
    project.working_version("sh010", "bob", "beauty", "v003", 2.0, &[("a.exr", 10)]);
    project.working_version("sh010", "bob", "beauty", "v004", 1.0, &[]);
    project.published_version("sh010", "beauty", "v001", 4.0, &[("a.exr", 10)]);
    project.published_version("sh010", "beauty", "v002", 3.0, &[("a.exr", 4)]);

    let listings = list_working_versions(&project.config, &project.ctx("sh010")).unwrap();
    assert_eq!(listings.len(), 1);

    let statuses: Vec<(String, PublishStatus)> = listings[0]
        .versions
        .iter()
        .map(|v| (v.version.version_label.clone(), v.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("v004".to_string(), PublishStatus::Empty),
            ("v003".to_string(), PublishStatus::Unpublished),
            ("v002".to_string(), PublishStatus::Stale),
            ("v001".to_string(), PublishStatus::Published),
        ]
    );
}

#[test]
fn test_selector_resolution() {
    let project = Project::new();
    let amy = project.working_version("sh010", "amy", "beauty", "v001", 2.0, &[("a.exr", 1)]);
    project.working_version("sh010", "bob", "beauty", "v001", 1.0, &[("a.exr", 1)]);
    let key = project.working_version("sh010", "bob", "key", "v007", 1.0, &[("a.exr", 1)]);

    let listings = list_working_versions(&project.config, &project.ctx("sh010")).unwrap();

    assert_eq!(resolve_selector(&listings, "key/v007").unwrap(), key);
    assert_eq!(resolve_selector(&listings, "beauty/v001@amy").unwrap(), amy);
    assert!(resolve_selector(&listings, "beauty/v001").is_err());
    assert!(resolve_selector(&listings, "beauty/v009").is_err());
    assert!(resolve_selector(&listings, "beauty").is_err());
}

#[test]
fn test_plan_maps_versions_to_publish_location() {
    let project = Project::new();
    let v3 = project.working_version("sh010", "amy", "beauty", "v003", 1.0, &[("a.exr", 1)]);

    let plan = plan_publish(
        &project.config,
        &project.ctx("sh010"),
        &[v3.clone()],
        TransferMode::Move,
        Throttle::Fast,
    )
    .unwrap();

    let job = &plan.batch.jobs()[0];
    assert_eq!(job.source, v3);
    assert_eq!(
        job.destination,
        project
            .shot_root("sh010")
            .join("publish")
            .join("lighting")
            .join("beauty")
            .join("v003")
    );
    assert_eq!(job.mode, TransferMode::Move);
    assert_eq!(plan.records[0].source, v3.to_string_lossy());
}

#[test]
fn test_plan_without_publish_path_is_rejected() {
    let project = Project::new();
    let v1 = project.working_version("sh010", "amy", "beauty", "v001", 1.0, &[("a.exr", 1)]);
    let config = Config::new(project.dir.path(), DEPARTMENT).with_department(
        DEPARTMENT,
        Some("work"),
        None,
    );

    let err = plan_publish(
        &config,
        &project.ctx("sh010"),
        &[v1],
        TransferMode::Copy,
        Throttle::Fast,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        RenderPubError::MissingTemplate {
            key: "publish_path",
            ..
        }
    ));
}

#[test]
fn test_plan_rejects_paths_outside_the_shot() {
    let project = Project::new();
    let other = project.working_version("sh020", "amy", "beauty", "v001", 1.0, &[("a.exr", 1)]);

    assert!(plan_publish(
        &project.config,
        &project.ctx("sh010"),
        &[other],
        TransferMode::Copy,
        Throttle::Fast,
    )
    .is_err());
}

#[test]
fn test_failed_batch_is_not_recorded() {
    let project = Project::new();
    let v1 = project.working_version("sh010", "amy", "beauty", "v001", 2.0, &[("a.exr", 1)]);
    let v2 = project.working_version("sh010", "amy", "beauty", "v002", 1.0, &[("a.exr", 1)]);
    let ctx = project.ctx("sh010");

    let plan = plan_publish(&project.config, &ctx, &[v1, v2], TransferMode::Copy, Throttle::Fast)
        .unwrap();
    let launcher = Arc::new(ScriptedLauncher::new([Script::exit(0), Script::exit(9)]));
    let outcome = TransferOrchestrator::new(plan.batch.clone(), MirrorCommand::new("robocopy"), launcher)
        .run(&EventSink::discard());
    assert!(!outcome.success);

    let recorded = record_publish(&project.config, &ctx, &plan, &outcome, stamp(), "wip").unwrap();
    assert!(recorded.is_none());
    assert!(!project.layout().publish_log_path(&ctx).exists());
}

#[test]
fn test_successful_batch_is_recorded_once() {
    let project = Project::new();
    let v1 = project.working_version("sh010", "amy", "beauty", "v001", 1.0, &[("a.exr", 1)]);
    let ctx = project.ctx("sh010");

    let plan =
        plan_publish(&project.config, &ctx, &[v1], TransferMode::Copy, Throttle::Fast).unwrap();
    let launcher = Arc::new(ScriptedLauncher::new([Script::exit(1)]));
    let outcome = TransferOrchestrator::new(plan.batch.clone(), MirrorCommand::new("robocopy"), launcher)
        .run(&EventSink::discard());

    let path = record_publish(&project.config, &ctx, &plan, &outcome, stamp(), "approved")
        .unwrap()
        .unwrap();
    let entries = read_entries(&path);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["Comment"], "approved");
    assert_eq!(entries[0]["Mode"], "Copy");
    assert_eq!(entries[0]["Publishes"].as_array().unwrap().len(), 1);
}

#[test]
fn test_shot_sizes_per_area() {
    let project = Project::new();
    project.working_version("sh010", "amy", "beauty", "v001", 1.0, &[("a.exr", 100)]);
    project.working_version("sh010", "bob", "beauty", "v002", 1.0, &[("a.exr", 50)]);
    project.published_version("sh010", "beauty", "v001", 1.0, &[("a.exr", 100)]);
    project.working_version("sh020", "amy", "key", "v001", 1.0, &[("a.exr", 7)]);

    let wip = shot_sizes(&project.config, SHOW, SEQUENCE, SizeArea::Wip).unwrap();
    let sizes: Vec<(String, u64)> = wip.into_iter().map(|s| (s.shot, s.size)).collect();
    assert_eq!(
        sizes,
        vec![("sh010".to_string(), 150), ("sh020".to_string(), 7)]
    );

    let finals = shot_sizes(&project.config, SHOW, SEQUENCE, SizeArea::Final).unwrap();
    assert_eq!(finals[0].size, 100);
    assert_eq!(finals[1].size, 0);
}
