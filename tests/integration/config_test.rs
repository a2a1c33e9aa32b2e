// Integration tests for configuration loading

use renderpub::core::config::Config;
use renderpub::core::template::PathTemplate;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.json");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn test_load_full_config() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"{
            "project_root": "/mnt/projects",
            "active_department": "lighting",
            "departments": {
                "lighting": {
                    "source_path": "work/{owner}/renders/preview",
                    "publish_path": "publish/lighting"
                },
                "comp": { "source_path": "comp/work" }
            },
            "throttle_delay_ms": 250,
            "mirror_program": "C:/Windows/System32/robocopy.exe",
            "admin_users": ["lead", "sup"],
            "publish_log_name": "shot_publish.json"
        }"#,
    );

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.project_root, Path::new("/mnt/projects"));
    assert_eq!(config.throttle_delay_ms, 250);
    assert_eq!(config.admin_users, vec!["lead", "sup"]);
    assert_eq!(config.publish_log_name, "shot_publish.json");
    assert_eq!(config.archive_log_name, "xPubArchiveLog.JSON");

    let source = config.source_template().unwrap();
    assert!(source.has_owner_placeholder());
    assert_eq!(
        config.publish_template().unwrap(),
        PathTemplate::parse("publish/lighting")
    );
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let err = Config::load_from(&dir.path().join("nope.json")).unwrap_err();
    assert!(err.to_string().contains("config file not found"));
}

#[test]
fn test_invalid_json_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "{ project_root: ");
    assert!(Config::load_from(&path).is_err());
}

#[test]
fn test_required_fields_are_validated() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, r#"{"project_root": "/p", "active_department": "  "}"#);
    assert!(Config::load_from(&path).is_err());

    let path = write_config(&dir, r#"{"active_department": "lighting"}"#);
    assert!(Config::load_from(&path).is_err());
}

#[test]
fn test_inactive_department_templates_are_ignored() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"{
            "project_root": "/p",
            "active_department": "fx",
            "departments": { "lighting": { "source_path": "work" } }
        }"#,
    );

    let config = Config::load_from(&path).unwrap();
    assert!(config.source_template().is_err());
}
