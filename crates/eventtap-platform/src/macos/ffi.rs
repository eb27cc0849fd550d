// FFI declarations for functions not exposed by the core-graphics crate.

use crate::RawTapInformation;
use std::ffi::c_void;

pub type CFMachPortRef = *mut c_void;
pub type CFRunLoopSourceRef = *mut c_void;
pub type CFAllocatorRef = *const c_void;
pub type CFIndex = isize;
pub type CFTypeRef = *const c_void;
pub type CGEventRef = *mut c_void;
pub type CGEventTapProxy = *mut c_void;
pub type CGError = i32;
pub type OSErr = i16;
pub type OSStatus = i32;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct CGPoint {
    pub x: f64,
    pub y: f64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct RawProcessSerialNumber {
    pub high: u32,
    pub low: u32,
}

// Event field constants
pub const KEYBOARD_EVENT_KEYCODE: u32 = 9;

// Event types are passed through as plain integers so tags outside the
// known set stay representable.
pub type CGEventTapCallback = extern "C" fn(
    proxy: CGEventTapProxy,
    event_type: u32,
    event: CGEventRef,
    user_info: *mut c_void,
) -> CGEventRef;

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    pub fn CGEventTapCreate(
        tap: u32,
        place: u32,
        options: u32,
        events_of_interest: u64,
        callback: CGEventTapCallback,
        user_info: *mut c_void,
    ) -> CFMachPortRef;

    pub fn CGEventTapCreateForPSN(
        process_serial_number: *const RawProcessSerialNumber,
        place: u32,
        options: u32,
        events_of_interest: u64,
        callback: CGEventTapCallback,
        user_info: *mut c_void,
    ) -> CFMachPortRef;

    pub fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);

    pub fn CGGetEventTapList(
        max_number_of_taps: u32,
        tap_list: *mut RawTapInformation,
        event_tap_count: *mut u32,
    ) -> CGError;

    pub fn CGEventCreate(source: *const c_void) -> CGEventRef;
    pub fn CGEventCreateCopy(event: CGEventRef) -> CGEventRef;
    pub fn CGEventGetLocation(event: CGEventRef) -> CGPoint;
    pub fn CGEventSetLocation(event: CGEventRef, location: CGPoint);
    pub fn CGEventGetIntegerValueField(event: CGEventRef, field: u32) -> i64;
    pub fn CGEventSetIntegerValueField(event: CGEventRef, field: u32, value: i64);
    pub fn CGEventGetFlags(event: CGEventRef) -> u64;
    pub fn CGEventGetTimestamp(event: CGEventRef) -> u64;
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    pub fn CFMachPortCreateRunLoopSource(
        allocator: CFAllocatorRef,
        port: CFMachPortRef,
        order: CFIndex,
    ) -> CFRunLoopSourceRef;

    pub fn CFMachPortInvalidate(port: CFMachPortRef);
    pub fn CFRetain(cf: CFTypeRef) -> CFTypeRef;
    pub fn CFRelease(cf: CFTypeRef);
}

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    pub fn GetCurrentProcess(psn: *mut RawProcessSerialNumber) -> OSErr;
    pub fn GetProcessPID(psn: *const RawProcessSerialNumber, pid: *mut i32) -> OSStatus;
    pub fn AXIsProcessTrusted() -> bool;
}
