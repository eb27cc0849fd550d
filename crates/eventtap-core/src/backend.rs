//! The OS seam: hook creation, run loop attachment and tap queries.
//!
//! Everything above this trait is platform-agnostic. `eventtap-platform`
//! implements it over CoreGraphics; [`crate::simulated`] implements it in
//! process for tests and hosts without native taps.

use crate::{
    Disposition, EventMask, ProcessSerialNumber, RawEventType, TapConfiguration, TapInformation,
    TapResult,
};
use std::sync::Weak;

/// Everything the OS needs to create a hook.
#[derive(Debug, Clone)]
pub struct HookRequest {
    pub configuration: TapConfiguration,
}

impl HookRequest {
    pub fn new(configuration: TapConfiguration) -> Self {
        Self { configuration }
    }
}

/// Entry point the backend's fixed callback forwards every intercepted
/// event to. Implemented by [`crate::Tap`].
pub trait EventSink<E, P>: Send + Sync {
    fn deliver(&self, event_type: RawEventType, event: &E, proxy: P) -> Disposition<E>;
}

/// Non-owning reference handed to the OS as callback context.
pub type SinkRef<E, P> = Weak<dyn EventSink<E, P>>;

/// An installed hook, exclusively owned by its tap.
///
/// Dropping it detaches the hook from its run loop and releases the OS
/// resource; no callback may run after the drop returns.
pub trait InstalledHook: Send + Sync {
    /// Identifier the OS assigned at creation.
    fn id(&self) -> u32;
    /// Categories the OS agreed to deliver.
    fn granted_mask(&self) -> EventMask;
    /// Arm or disarm the hook on the OS side.
    fn set_enabled(&self, enabled: bool);
}

/// Hook-creation and introspection capability of the host OS.
pub trait HookBackend: Send + Sync + 'static {
    /// Intercepted event. Handlers only ever borrow the original.
    type Event: Send + 'static;
    /// Opaque event-source context passed with each event.
    type Proxy: Copy + Send + 'static;
    /// Host event loop a hook is attached to.
    type RunLoop;
    type Hook: InstalledHook + 'static;

    /// Serial number of the calling process.
    fn current_process(&self) -> TapResult<ProcessSerialNumber>;

    /// Reject run loops that cannot host a hook, before anything is
    /// created.
    fn validate_run_loop(&self, _run_loop: &Self::RunLoop) -> TapResult<()> {
        Ok(())
    }

    /// Create a disabled, unattached hook that forwards to `sink`.
    fn create_hook(
        &self,
        request: &HookRequest,
        sink: SinkRef<Self::Event, Self::Proxy>,
    ) -> TapResult<Self::Hook>;

    /// Attach the hook's source to `run_loop` under every common mode.
    fn attach(&self, hook: &mut Self::Hook, run_loop: &Self::RunLoop) -> TapResult<()>;

    /// Number of taps installed system-wide, by any process.
    fn system_tap_count(&self) -> TapResult<u32>;

    /// Descriptive records of every tap installed system-wide.
    fn system_taps(&self) -> TapResult<Vec<TapInformation>>;
}
