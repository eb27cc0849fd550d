//! eventtap-platform: native hook backends for eventtap.
//!
//! This crate provides:
//! - `MacBackend`, a [`HookBackend`](eventtap_core::HookBackend) over
//!   CoreGraphics event taps (macOS only)
//! - Conversion of the OS tap-list record into [`TapInformation`](eventtap_core::TapInformation)
//!
//! ## Module Structure
//!
//! - `callback` - Callback context and return-value rules
//! - `error` - Platform error types
//! - `tap_list` - OS tap-list record layout
//! - `macos` - CGEventTap backend

mod callback;
mod error;
mod tap_list;

#[cfg(target_os = "macos")]
mod macos;

pub use error::{PlatformError, PlatformResult};
pub use tap_list::RawTapInformation;

#[cfg(target_os = "macos")]
pub use macos::{MacBackend, MacEvent, MacHook, TapProxy};

/// Whether this build has a native hook backend.
pub const fn native_backend_available() -> bool {
    cfg!(target_os = "macos")
}
