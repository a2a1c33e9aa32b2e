// Integration tests for retention analysis over a real directory tree

use super::fixtures::*;
use renderpub::core::retention::{RetentionAnalyzer, RetentionPolicy, ScanMode};
use std::path::PathBuf;

const FRAME: &[(&str, usize)] = &[("beauty.0001.exr", 16)];

fn labels(project: &Project, shots: &[&str], policy: RetentionPolicy) -> Vec<String> {
    let template = project.config.source_template().unwrap();
    let roots: Vec<PathBuf> = shots.iter().map(|s| project.shot_root(s)).collect();
    RetentionAnalyzer::new(&template, ScanMode::WorkingArea, policy)
        .analyze(&roots)
        .labels()
}

#[test]
fn test_threshold_keeps_five_most_recent() {
    let project = Project::new();
    for (i, age) in [6.0, 5.0, 4.0, 3.0, 2.0, 1.0].iter().enumerate() {
        project.working_version("sh010", "amy", "beauty", &format!("v{}", i + 1), *age, FRAME);
    }

    let selected = labels(&project, &["sh010"], RetentionPolicy::keep_latest(5));
    assert_eq!(selected, vec!["sh010/beauty/v1 (amy)"]);
}

#[test]
fn test_max_age_evicts_protected_versions() {
    let project = Project::new();
    for (i, age) in [20.0, 16.0, 15.0, 3.0, 2.0, 1.0].iter().enumerate() {
        project.working_version("sh010", "amy", "beauty", &format!("v{}", i + 1), *age, FRAME);
    }

    let policy = RetentionPolicy::keep_latest(5).with_max_age(10.0);
    let selected = labels(&project, &["sh010"], policy);
    assert_eq!(
        selected,
        vec![
            "sh010/beauty/v1 (amy)",
            "sh010/beauty/v2 (amy)",
            "sh010/beauty/v3 (amy)"
        ]
    );
}

#[test]
fn test_groups_merge_across_owners() {
    let project = Project::new();
    project.working_version("sh010", "amy", "beauty", "v001", 4.0, FRAME);
    project.working_version("sh010", "bob", "beauty", "v002", 3.0, FRAME);
    project.working_version("sh010", "amy", "beauty", "v003", 2.0, FRAME);
    project.working_version("sh010", "bob", "specular", "v001", 9.0, FRAME);

    let selected = labels(&project, &["sh010"], RetentionPolicy::keep_latest(1));
    assert_eq!(
        selected,
        vec!["sh010/beauty/v001 (amy)", "sh010/beauty/v002 (bob)"]
    );
}

#[test]
fn test_missing_shots_are_skipped() {
    let project = Project::new();
    project.working_version("sh010", "amy", "beauty", "v001", 2.0, FRAME);
    project.working_version("sh010", "amy", "beauty", "v002", 1.0, FRAME);

    let selected = labels(
        &project,
        &["sh999", "sh010"],
        RetentionPolicy::keep_latest(1),
    );
    assert_eq!(selected, vec!["sh010/beauty/v001 (amy)"]);
}

#[test]
fn test_analysis_is_idempotent() {
    let project = Project::new();
    for (i, age) in [9.0, 7.0, 5.0, 3.0].iter().enumerate() {
        project.working_version("sh010", "amy", "beauty", &format!("v{}", i + 1), *age, FRAME);
        project.working_version("sh020", "bob", "key", &format!("v{}", i + 1), *age, FRAME);
    }

    let policy = RetentionPolicy::keep_latest(2).with_max_age(8.0);
    let first = labels(&project, &["sh010", "sh020"], policy);
    let second = labels(&project, &["sh010", "sh020"], policy);
    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
}

#[test]
fn test_published_mode_scans_publish_location() {
    let project = Project::new();
    project.working_version("sh010", "amy", "beauty", "v001", 5.0, FRAME);
    project.published_version("sh010", "beauty", "v001", 5.0, FRAME);
    project.published_version("sh010", "beauty", "v002", 1.0, FRAME);

    let template = project.config.publish_template().unwrap();
    let plan = RetentionAnalyzer::new(
        &template,
        ScanMode::Published,
        RetentionPolicy::keep_latest(1),
    )
    .analyze(&[project.shot_root("sh010")]);

    assert_eq!(plan.labels(), vec!["sh010/beauty/v001 (published)"]);
    assert!(plan.paths()[0].starts_with(project.shot_root("sh010").join("publish")));
}
