//! Owned CGEvent references.

use super::ffi::{self, CGEventRef, CGEventTapProxy, CGPoint};
use std::mem::ManuallyDrop;
use std::ptr::NonNull;

/// A retained `CGEventRef`.
///
/// Cloning retains, dropping releases. Handlers receive the event the OS
/// is delivering; to substitute an event, return a different `MacEvent`
/// (for example an edited [`MacEvent::copy`]).
pub struct MacEvent {
    raw: NonNull<std::ffi::c_void>,
}

// SAFETY: CGEvent references are CF objects; retain and release are
// thread-safe. An event is only mutated through `&mut self`.
unsafe impl Send for MacEvent {}
unsafe impl Sync for MacEvent {}

impl MacEvent {
    /// Wrap a reference the caller already owns (+1).
    ///
    /// # Safety
    /// `raw` must be a valid `CGEventRef` whose reference is transferred.
    pub(crate) unsafe fn from_owned(raw: CGEventRef) -> Option<Self> {
        NonNull::new(raw).map(|raw| Self { raw })
    }

    /// View a reference the OS still owns. The wrapper must not be dropped.
    ///
    /// # Safety
    /// `raw` must stay valid for as long as the view is used.
    pub(crate) unsafe fn borrowed(raw: CGEventRef) -> Option<ManuallyDrop<Self>> {
        NonNull::new(raw).map(|raw| ManuallyDrop::new(Self { raw }))
    }

    /// Give up ownership, returning the +1 reference.
    pub(crate) fn into_raw(self) -> CGEventRef {
        let raw = self.raw.as_ptr();
        std::mem::forget(self);
        raw
    }

    pub fn as_ptr(&self) -> CGEventRef {
        self.raw.as_ptr()
    }

    /// Independent, mutable copy of this event.
    pub fn copy(&self) -> Option<MacEvent> {
        unsafe { Self::from_owned(ffi::CGEventCreateCopy(self.as_ptr())) }
    }

    pub fn location(&self) -> (f64, f64) {
        let point = unsafe { ffi::CGEventGetLocation(self.as_ptr()) };
        (point.x, point.y)
    }

    pub fn set_location(&mut self, x: f64, y: f64) {
        unsafe { ffi::CGEventSetLocation(self.as_ptr(), CGPoint { x, y }) };
    }

    pub fn integer_field(&self, field: u32) -> i64 {
        unsafe { ffi::CGEventGetIntegerValueField(self.as_ptr(), field) }
    }

    pub fn set_integer_field(&mut self, field: u32, value: i64) {
        unsafe { ffi::CGEventSetIntegerValueField(self.as_ptr(), field, value) };
    }

    /// Virtual keycode of a keyboard event.
    pub fn keycode(&self) -> u16 {
        self.integer_field(ffi::KEYBOARD_EVENT_KEYCODE) as u16
    }

    pub fn flags(&self) -> u64 {
        unsafe { ffi::CGEventGetFlags(self.as_ptr()) }
    }

    /// Nanoseconds since system start-up.
    pub fn timestamp(&self) -> u64 {
        unsafe { ffi::CGEventGetTimestamp(self.as_ptr()) }
    }
}

impl Clone for MacEvent {
    fn clone(&self) -> Self {
        unsafe { ffi::CFRetain(self.as_ptr() as *const _) };
        Self { raw: self.raw }
    }
}

impl Drop for MacEvent {
    fn drop(&mut self) {
        unsafe { ffi::CFRelease(self.as_ptr() as *const _) };
    }
}

impl std::fmt::Debug for MacEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacEvent").field("raw", &self.raw).finish()
    }
}

/// Event-source context the OS passes alongside each event.
#[derive(Debug, Clone, Copy)]
pub struct TapProxy(CGEventTapProxy);

// SAFETY: an opaque token; never dereferenced on the Rust side.
unsafe impl Send for TapProxy {}
unsafe impl Sync for TapProxy {}

impl TapProxy {
    pub(crate) fn new(raw: CGEventTapProxy) -> Self {
        Self(raw)
    }

    pub fn as_ptr(&self) -> CGEventTapProxy {
        self.0
    }
}
