//! eventtap-core: tap lifecycle and event dispatch.
//!
//! Design goal: keep this crate platform-agnostic. The OS hooking
//! primitive sits behind [`HookBackend`]; the native CoreGraphics backend
//! lives in `eventtap-platform`.
//!
//! ## Module Structure
//!
//! - `category` - Event categories and 64-bit category masks
//! - `config` - Tap placement, process targets, tap configuration
//! - `backend` - The OS seam
//! - `tap` - Installed taps and their runtime state
//! - `dispatch` - Per-event routing and the handler result contract
//! - `provider` / `delegate` - Handler lookup and the slot-table provider
//! - `manager` - Tap creation and lifecycle control
//! - `enumerator` / `info` - System-wide tap listing and tap records
//! - `profile` - Tap profiles on disk
//! - `simulated` - In-process backend

mod backend;
mod category;
mod config;
mod delegate;
mod dispatch;
mod enumerator;
mod error;
mod info;
mod manager;
mod profile;
mod provider;
pub mod simulated;
mod tap;

pub use backend::{EventSink, HookBackend, HookRequest, InstalledHook, SinkRef};
pub use category::{EventCategory, EventMask, RawEventType};
pub use config::{ProcessSerialNumber, ProcessTarget, TapConfiguration, TapPlacement};
pub use delegate::DelegateAdapter;
pub use dispatch::{dispatch, Disposition, EventSlot};
pub use enumerator::SystemTapEnumerator;
pub use error::{ProfileError, TapError, TapResult};
pub use info::{TapInformation, TAP_OPTION_LISTEN_ONLY};
pub use manager::TapManager;
pub use profile::{
    get_app_data_dir, get_profiles_dir, list_profiles, load_profile, save_profile, TapProfile,
};
pub use provider::{
    DispatchProvider, EventHandler, ReceiveAnyHandler, SharedProvider, UnknownEventHandler,
};
pub use tap::Tap;
