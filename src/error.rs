use std::io;
use thiserror::Error;

/// Error type for the renderpub library
#[derive(Error, Debug)]
pub enum RenderPubError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No '{key}' defined for department '{department}' in config")]
    MissingTemplate { department: String, key: &'static str },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for renderpub
pub type Result<T> = std::result::Result<T, RenderPubError>;

impl RenderPubError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        RenderPubError::Config(msg.into())
    }

    /// Create a missing-template error for the active department
    pub fn missing_template<S: Into<String>>(department: S, key: &'static str) -> Self {
        RenderPubError::MissingTemplate {
            department: department.into(),
            key,
        }
    }

    /// Create an invalid path error
    pub fn invalid_path<S: Into<String>>(msg: S) -> Self {
        RenderPubError::InvalidPath(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied<S: Into<String>>(msg: S) -> Self {
        RenderPubError::PermissionDenied(msg.into())
    }

    pub fn process<S: Into<String>>(msg: S) -> Self {
        RenderPubError::Process(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        RenderPubError::Other(msg.into())
    }
}
