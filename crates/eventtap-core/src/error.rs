//! Error types for eventtap.

use thiserror::Error;

/// Errors surfaced by tap creation, tap control and system queries.
#[derive(Debug, Error)]
pub enum TapError {
    #[error("event mask is empty")]
    EmptyMask,
    #[error("invalid tap configuration: {0}")]
    InvalidConfiguration(String),
    #[error("host run loop is not usable: {0}")]
    InvalidRunLoop(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("invalid process target: {0}")]
    InvalidProcess(String),
    #[error("hook creation failed: {0}")]
    HookCreationFailed(String),
    #[error("run loop attachment failed: {0}")]
    LoopAttachmentFailed(String),
    #[error("tap {id} has already been destroyed")]
    Destroyed { id: u32 },
    #[error("system tap query failed: {0}")]
    Query(String),
    #[error("profile error: {0}")]
    Profile(#[from] ProfileError),
}

impl TapError {
    /// Whether this error came out of tap creation.
    pub fn is_creation_error(&self) -> bool {
        matches!(
            self,
            TapError::EmptyMask
                | TapError::InvalidConfiguration(_)
                | TapError::InvalidRunLoop(_)
                | TapError::PermissionDenied(_)
                | TapError::InvalidProcess(_)
                | TapError::HookCreationFailed(_)
                | TapError::LoopAttachmentFailed(_)
        )
    }
}

/// Failures reading or writing tap profiles.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported profile format: {0}")]
    UnsupportedFormat(String),
}

/// Result type for tap operations.
pub type TapResult<T> = Result<T, TapError>;
