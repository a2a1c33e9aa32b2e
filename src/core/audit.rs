//! Append-only JSON audit logs for publish and archive operations
//!
//! A log file holds one JSON array. It is kept read-only at rest; the writer
//! makes it writable only for the duration of an append. Existing content
//! that is not an array is wrapped into a one-element array, and content
//! that does not parse is treated as an empty log.
//!
//! A single writer process is assumed. Concurrent appends from several
//! processes may lose entries.

use crate::error::Result;
use crate::platform::identity;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::Path;

/// One published version
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishRecord {
    pub source: String,
    pub destination: String,
}

/// Entry appended to a shot's publish log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct PublishLogEntry {
    pub user: String,
    pub host: String,
    pub date_time: String,
    pub mode: String,
    pub comment: String,
    pub publishes: Vec<PublishRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaxAgeFilter {
    pub enabled: bool,
    pub days: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ArchiveFilters {
    pub threshold: usize,
    pub max_age: MaxAgeFilter,
    /// Throttle selected for the run, `Fast` or `Slow`
    pub throttle: String,
}

/// Entry appended to a sequence's archive log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ArchiveLogEntry {
    pub user: String,
    pub host: String,
    pub date_time: String,
    pub shot: String,
    pub filters: ArchiveFilters,
    pub comment: String,
    pub cleaned_versions: Vec<String>,
}

/// Actor, host and timestamp shared by every entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    pub user: String,
    pub host: String,
    pub date_time: String,
}

impl Stamp {
    /// Identity of the current process and the local time
    pub fn current() -> Self {
        Self {
            user: identity::current_user(),
            host: identity::current_host(),
            date_time: identity::timestamp_now(),
        }
    }
}

impl PublishLogEntry {
    pub fn new(stamp: Stamp, mode: &str, comment: &str, publishes: Vec<PublishRecord>) -> Self {
        Self {
            user: stamp.user,
            host: stamp.host,
            date_time: stamp.date_time,
            mode: mode.to_string(),
            comment: comment.to_string(),
            publishes,
        }
    }
}

impl ArchiveLogEntry {
    pub fn new(
        stamp: Stamp,
        shot: &str,
        filters: ArchiveFilters,
        comment: &str,
        cleaned_versions: Vec<String>,
    ) -> Self {
        Self {
            user: stamp.user,
            host: stamp.host,
            date_time: stamp.date_time,
            shot: shot.to_string(),
            filters,
            comment: comment.to_string(),
            cleaned_versions,
        }
    }
}

/// Coerce raw log content into a list of entries
fn parse_entries(raw: &str) -> Vec<Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(entries)) => entries,
        Ok(other) => vec![other],
        Err(err) => {
            log::warn!("audit log is not valid JSON, starting a new list: {}", err);
            Vec::new()
        }
    }
}

/// Read all entries of a log. A missing or unreadable file is an empty log.
pub fn read_entries(path: &Path) -> Vec<Value> {
    match fs::read_to_string(path) {
        Ok(raw) => parse_entries(&raw),
        Err(_) => Vec::new(),
    }
}

/// Append `entry` to the log at `path`, creating parent directories and the
/// file as needed. Returns the number of entries now in the log.
pub fn append_entry<T: Serialize>(path: &Path, entry: &T) -> Result<usize> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut entries = if path.exists() {
        set_writable(path, true)?;
        read_entries(path)
    } else {
        Vec::new()
    };

    entries.push(serde_json::to_value(entry)?);

    let data = to_indented_json(&entries)?;
    let write_result = fs::File::create(path).and_then(|mut file| {
        file.write_all(&data)?;
        file.write_all(b"\n")
    });

    // Restore read-only even when the write failed part way.
    let protect_result = set_writable(path, false);
    write_result?;
    protect_result?;

    log::info!("appended audit entry to {}", path.display());
    Ok(entries.len())
}

/// Pretty JSON with four-space indentation, the layout existing logs use
fn to_indented_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

#[cfg(unix)]
fn set_writable(path: &Path, writable: bool) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    let mode = perms.mode();
    let new_mode = if writable { mode | 0o200 } else { mode & !0o222 };
    perms.set_mode(new_mode);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn set_writable(path: &Path, writable: bool) -> Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(!writable);
    fs::set_permissions(path, perms)?;
    Ok(())
}
