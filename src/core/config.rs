use crate::core::template::PathTemplate;
use crate::error::{RenderPubError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the default config location
pub const CONFIG_ENV_VAR: &str = "RENDERPUB_CONFIG";

pub const DEFAULT_THROTTLE_DELAY_MS: u64 = 100;
pub const DEFAULT_MIRROR_PROGRAM: &str = "robocopy";
pub const DEFAULT_METADATA_SUBPATH: &str = "data/lighting";
pub const DEFAULT_PUBLISH_LOG_NAME: &str = "xPubLog.JSON";
pub const DEFAULT_ARCHIVE_LOG_NAME: &str = "xPubArchiveLog.JSON";
pub const DEFAULT_SEQUENCE_METADATA_SUFFIX: &str = "_Seq";

/// Source and publish templates for one department
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DepartmentPaths {
    #[serde(default)]
    pub source_path: Option<String>,
    #[serde(default)]
    pub publish_path: Option<String>,
}

/// Immutable tool configuration, loaded once and passed into each component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub project_root: PathBuf,
    pub active_department: String,
    #[serde(default)]
    pub departments: HashMap<String, DepartmentPaths>,
    /// Inter-packet gap used by the Slow throttle
    #[serde(default = "default_throttle_delay_ms")]
    pub throttle_delay_ms: u64,
    #[serde(default = "default_mirror_program")]
    pub mirror_program: String,
    /// Users allowed to archive. Empty means unrestricted.
    #[serde(default)]
    pub admin_users: Vec<String>,
    #[serde(default = "default_metadata_subpath")]
    pub metadata_subpath: String,
    #[serde(default = "default_publish_log_name")]
    pub publish_log_name: String,
    #[serde(default = "default_archive_log_name")]
    pub archive_log_name: String,
    #[serde(default = "default_sequence_metadata_suffix")]
    pub sequence_metadata_suffix: String,
}

fn default_throttle_delay_ms() -> u64 {
    DEFAULT_THROTTLE_DELAY_MS
}

fn default_mirror_program() -> String {
    DEFAULT_MIRROR_PROGRAM.to_string()
}

fn default_metadata_subpath() -> String {
    DEFAULT_METADATA_SUBPATH.to_string()
}

fn default_publish_log_name() -> String {
    DEFAULT_PUBLISH_LOG_NAME.to_string()
}

fn default_archive_log_name() -> String {
    DEFAULT_ARCHIVE_LOG_NAME.to_string()
}

fn default_sequence_metadata_suffix() -> String {
    DEFAULT_SEQUENCE_METADATA_SUFFIX.to_string()
}

impl Config {
    /// Build a config with every optional field at its default
    pub fn new(project_root: impl Into<PathBuf>, active_department: impl Into<String>) -> Self {
        Self {
            project_root: project_root.into(),
            active_department: active_department.into(),
            departments: HashMap::new(),
            throttle_delay_ms: DEFAULT_THROTTLE_DELAY_MS,
            mirror_program: default_mirror_program(),
            admin_users: Vec::new(),
            metadata_subpath: default_metadata_subpath(),
            publish_log_name: default_publish_log_name(),
            archive_log_name: default_archive_log_name(),
            sequence_metadata_suffix: default_sequence_metadata_suffix(),
        }
    }

    /// Add or replace a department's templates
    pub fn with_department(
        mut self,
        name: impl Into<String>,
        source_path: Option<&str>,
        publish_path: Option<&str>,
    ) -> Self {
        self.departments.insert(
            name.into(),
            DepartmentPaths {
                source_path: source_path.map(str::to_string),
                publish_path: publish_path.map(str::to_string),
            },
        );
        self
    }

    /// Load the config from an explicit path, the env override, or the default location
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::get_config_path()?,
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RenderPubError::config(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        let data = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&data).map_err(|e| {
            RenderPubError::config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;

        log::info!("Config loaded from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.project_root.as_os_str().is_empty() {
            return Err(RenderPubError::config("'project_root' must not be empty"));
        }
        if self.active_department.trim().is_empty() {
            return Err(RenderPubError::config("'active_department' must not be empty"));
        }
        Ok(())
    }

    fn get_config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Ok(PathBuf::from(path.trim()));
            }
        }

        let config_dir = dirs::config_dir()
            .ok_or_else(|| RenderPubError::config("Could not determine config directory"))?;

        Ok(config_dir.join("renderpub").join("config.json"))
    }

    /// Templates of the active department, if it is configured at all
    pub fn department(&self) -> Option<&DepartmentPaths> {
        self.departments.get(&self.active_department)
    }

    /// Working-area template of the active department
    pub fn source_template(&self) -> Result<PathTemplate> {
        self.department()
            .and_then(|d| d.source_path.as_deref())
            .filter(|t| !t.trim().is_empty())
            .map(PathTemplate::parse)
            .ok_or_else(|| RenderPubError::missing_template(&self.active_department, "source_path"))
    }

    /// Publish template of the active department
    pub fn publish_template(&self) -> Result<PathTemplate> {
        self.department()
            .and_then(|d| d.publish_path.as_deref())
            .filter(|t| !t.trim().is_empty())
            .map(PathTemplate::parse)
            .ok_or_else(|| RenderPubError::missing_template(&self.active_department, "publish_path"))
    }

    /// Whether `user` may run archive operations
    pub fn is_archive_allowed(&self, user: &str) -> bool {
        self.admin_users.is_empty() || self.admin_users.iter().any(|u| u == user)
    }
}
