//! [`HookBackend`] over CGEventTapCreate and CGEventTapCreateForPSN.
//!
//! Every hook gets the same `extern "C"` callback. The per-tap context
//! boxes a weak reference to the tap, so a callback racing the tap's last
//! owner upgrades to nothing and passes the event through.

use super::event::{MacEvent, TapProxy};
use super::ffi::{self, CFMachPortRef, CGEventRef, CGEventTapProxy, RawProcessSerialNumber};
use crate::callback::{CallbackContext, Settled};
use crate::{PlatformError, PlatformResult, RawTapInformation};
use core_foundation::base::TCFType;
use core_foundation::runloop::{kCFRunLoopCommonModes, CFRunLoop, CFRunLoopSource};
use core_graphics::event::{CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement};
use eventtap_core::{
    EventCategory, EventMask, HookBackend, HookRequest, InstalledHook, ProcessSerialNumber,
    SinkRef, TapConfiguration, TapError, TapInformation, TapPlacement, TapResult,
};
use std::collections::HashSet;
use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use tracing::{debug, error, warn};

type MacSink = SinkRef<MacEvent, TapProxy>;
type MacContext = CallbackContext<MacSink>;

/// Native CoreGraphics backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacBackend;

impl MacBackend {
    pub fn new() -> Self {
        Self
    }
}

fn check(call: &'static str, status: i32) -> PlatformResult<()> {
    if status == 0 {
        Ok(())
    } else {
        Err(PlatformError::Status { call, status })
    }
}

fn read_tap_list() -> PlatformResult<Vec<RawTapInformation>> {
    let mut count = 0u32;
    check("CGGetEventTapList", unsafe {
        ffi::CGGetEventTapList(0, ptr::null_mut(), &mut count)
    })?;

    // Taps can come and go between the two calls; trust the second count.
    let mut list = vec![RawTapInformation::default(); count as usize];
    let mut filled = 0u32;
    check("CGGetEventTapList", unsafe {
        ffi::CGGetEventTapList(count, list.as_mut_ptr(), &mut filled)
    })?;
    list.truncate(filled as usize);
    Ok(list)
}

fn location(placement: TapPlacement) -> Option<u32> {
    match placement {
        TapPlacement::Hid => Some(CGEventTapLocation::HID as u32),
        TapPlacement::Session => Some(CGEventTapLocation::Session as u32),
        TapPlacement::AnnotatedSession => Some(CGEventTapLocation::AnnotatedSession as u32),
        TapPlacement::Process => None,
    }
}

fn resolve_process(psn: ProcessSerialNumber) -> TapResult<RawProcessSerialNumber> {
    let raw = RawProcessSerialNumber {
        high: psn.high,
        low: psn.low,
    };
    let mut pid = 0;
    let status = unsafe { ffi::GetProcessPID(&raw, &mut pid) };
    if status != 0 {
        return Err(TapError::InvalidProcess(format!("{psn} (status {status})")));
    }
    Ok(raw)
}

fn creation_failure(call: &'static str, mask: EventMask) -> TapError {
    let privileged = mask.categories().any(EventCategory::requires_privilege);
    if privileged && !unsafe { ffi::AXIsProcessTrusted() } {
        return TapError::PermissionDenied(format!(
            "{mask} includes keyboard events and the process is not trusted for accessibility"
        ));
    }
    PlatformError::NullReturn { call }.into()
}

/// Find the record the OS added for a tap we just created.
fn identify(before: &HashSet<u32>, config: &TapConfiguration) -> Option<RawTapInformation> {
    let pid = std::process::id() as i32;
    let options = if config.passive {
        CGEventTapOptions::ListenOnly as u32
    } else {
        CGEventTapOptions::Default as u32
    };
    read_tap_list()
        .ok()?
        .into_iter()
        .filter(|info| !before.contains(&info.event_tap_id))
        .filter(|info| info.tapping_process == pid && info.options == options)
        .filter(|info| {
            config.placement == TapPlacement::Process || info.tap_point == config.placement.raw()
        })
        .max_by_key(|info| info.event_tap_id)
}

extern "C" fn tap_callback(
    proxy: CGEventTapProxy,
    event_type: u32,
    event: CGEventRef,
    user_info: *mut c_void,
) -> CGEventRef {
    if user_info.is_null() {
        return event;
    }
    // SAFETY: `user_info` is the hook's context box, freed only after the
    // port is invalidated and no further callbacks can arrive.
    let context = unsafe { &*(user_info as *const MacContext) };
    let Some(sink) = context.sink.upgrade() else {
        return event;
    };

    if EventCategory::from_raw(event_type).is_some_and(EventCategory::is_tap_disabled) {
        warn!(event_type, "event tap disabled by the system");
    }

    // Tap-disabled notifications are not guaranteed to carry an event.
    let borrowed = unsafe { MacEvent::borrowed(event) };
    let placeholder = match borrowed {
        Some(_) => None,
        None => unsafe { MacEvent::from_owned(ffi::CGEventCreate(ptr::null())) },
    };
    let original: &MacEvent = match (&borrowed, &placeholder) {
        (Some(borrowed), _) => &**borrowed,
        (None, Some(placeholder)) => placeholder,
        (None, None) => return event,
    };

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        sink.deliver(event_type, original, TapProxy::new(proxy))
    }));
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(_) => {
            error!(event_type, "event handler panicked, passing event through");
            return event;
        }
    };
    // Replacements not handed over are released here.
    match context.settle(event_type, outcome, |replacement| replacement.as_ptr() == event) {
        Settled::Original => event,
        Settled::Suppress => ptr::null_mut(),
        // The OS takes over the returned reference.
        Settled::Replacement(replacement) => replacement.into_raw(),
    }
}

impl HookBackend for MacBackend {
    type Event = MacEvent;
    type Proxy = TapProxy;
    type RunLoop = CFRunLoop;
    type Hook = MacHook;

    fn current_process(&self) -> TapResult<ProcessSerialNumber> {
        let mut raw = RawProcessSerialNumber::default();
        let status = unsafe { ffi::GetCurrentProcess(&mut raw) };
        check("GetCurrentProcess", status as i32)?;
        Ok(ProcessSerialNumber::new(raw.high, raw.low))
    }

    fn create_hook(&self, request: &HookRequest, sink: MacSink) -> TapResult<MacHook> {
        let config = &request.configuration;
        let mask = config.requested_mask;
        let place = if config.insert_before_others {
            CGEventTapPlacement::HeadInsertEventTap as u32
        } else {
            CGEventTapPlacement::TailAppendEventTap as u32
        };
        let options = if config.passive {
            CGEventTapOptions::ListenOnly as u32
        } else {
            CGEventTapOptions::Default as u32
        };
        let target = config.target_process.map(resolve_process).transpose()?;

        let before: HashSet<u32> = read_tap_list()
            .map(|list| list.iter().map(|info| info.event_tap_id).collect())
            .unwrap_or_default();

        let context = Box::into_raw(Box::new(MacContext::new(sink, config.passive)));
        let (call, port) = match (target, location(config.placement)) {
            (Some(psn), _) => ("CGEventTapCreateForPSN", unsafe {
                ffi::CGEventTapCreateForPSN(
                    &psn,
                    place,
                    options,
                    mask.bits(),
                    tap_callback,
                    context as *mut c_void,
                )
            }),
            (None, Some(tap)) => ("CGEventTapCreate", unsafe {
                ffi::CGEventTapCreate(
                    tap,
                    place,
                    options,
                    mask.bits(),
                    tap_callback,
                    context as *mut c_void,
                )
            }),
            (None, None) => {
                drop(unsafe { Box::from_raw(context) });
                return Err(TapError::InvalidConfiguration(
                    "process placement without a target process".into(),
                ));
            }
        };
        if port.is_null() {
            drop(unsafe { Box::from_raw(context) });
            return Err(creation_failure(call, mask));
        }
        // New taps come up enabled; the tap decides when to turn it on.
        unsafe { ffi::CGEventTapEnable(port, false) };

        let (id, granted) = match identify(&before, config) {
            Some(info) => (info.event_tap_id, EventMask::from_bits(info.events_of_interest)),
            None => {
                warn!("created tap not found in the system tap list, assuming full grant");
                (0, mask)
            }
        };
        debug!(tap = id, granted = %granted, "native hook created");

        Ok(MacHook {
            id,
            granted,
            port,
            context,
            source: None,
            run_loop: None,
        })
    }

    fn attach(&self, hook: &mut MacHook, run_loop: &CFRunLoop) -> TapResult<()> {
        let source = unsafe { ffi::CFMachPortCreateRunLoopSource(ptr::null(), hook.port, 0) };
        if source.is_null() {
            return Err(TapError::LoopAttachmentFailed(
                "CFMachPortCreateRunLoopSource returned null".into(),
            ));
        }
        let source = unsafe { CFRunLoopSource::wrap_under_create_rule(source as *mut _) };
        run_loop.add_source(&source, unsafe { kCFRunLoopCommonModes });

        hook.source = Some(source);
        hook.run_loop = Some(run_loop.clone());
        Ok(())
    }

    fn system_tap_count(&self) -> TapResult<u32> {
        let mut count = 0u32;
        check("CGGetEventTapList", unsafe {
            ffi::CGGetEventTapList(0, ptr::null_mut(), &mut count)
        })?;
        Ok(count)
    }

    fn system_taps(&self) -> TapResult<Vec<TapInformation>> {
        Ok(read_tap_list()?.iter().map(TapInformation::from).collect())
    }
}

/// A live CGEventTap: the mach port, its run loop source, and the
/// callback context.
pub struct MacHook {
    id: u32,
    granted: EventMask,
    port: CFMachPortRef,
    context: *mut MacContext,
    source: Option<CFRunLoopSource>,
    run_loop: Option<CFRunLoop>,
}

// SAFETY: the port and run loop are CF objects usable from any thread.
// `context` is only read by the callback and freed in `Drop`.
unsafe impl Send for MacHook {}
unsafe impl Sync for MacHook {}

impl InstalledHook for MacHook {
    fn id(&self) -> u32 {
        self.id
    }

    fn granted_mask(&self) -> EventMask {
        self.granted
    }

    fn set_enabled(&self, enabled: bool) {
        unsafe { ffi::CGEventTapEnable(self.port, enabled) };
    }
}

impl Drop for MacHook {
    fn drop(&mut self) {
        unsafe { ffi::CGEventTapEnable(self.port, false) };
        if let (Some(run_loop), Some(source)) = (self.run_loop.take(), self.source.take()) {
            run_loop.remove_source(&source, unsafe { kCFRunLoopCommonModes });
        }
        unsafe {
            ffi::CFMachPortInvalidate(self.port);
            ffi::CFRelease(self.port as *const _);
            drop(Box::from_raw(self.context));
        }
        debug!(tap = self.id, "native hook released");
    }
}
