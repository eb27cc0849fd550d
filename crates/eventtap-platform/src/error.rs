//! Common error types for eventtap-platform.

use eventtap_core::TapError;
use thiserror::Error;

/// Failures reported by native calls.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("native event taps are not available on this platform")]
    Unsupported,
    #[error("{call} returned null")]
    NullReturn { call: &'static str },
    #[error("{call} failed with status {status}")]
    Status { call: &'static str, status: i32 },
}

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

impl From<PlatformError> for TapError {
    fn from(e: PlatformError) -> Self {
        match e {
            PlatformError::Unsupported => TapError::HookCreationFailed(e.to_string()),
            PlatformError::NullReturn { .. } => TapError::HookCreationFailed(e.to_string()),
            PlatformError::Status { .. } => TapError::Query(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_maps_to_query_error() {
        let err: TapError = PlatformError::Status {
            call: "CGGetEventTapList",
            status: 1001,
        }
        .into();
        assert!(matches!(err, TapError::Query(ref msg) if msg.contains("1001")));
    }

    #[test]
    fn test_null_maps_to_creation_error() {
        let err: TapError = PlatformError::NullReturn {
            call: "CGEventTapCreate",
        }
        .into();
        assert!(err.is_creation_error());
    }
}
