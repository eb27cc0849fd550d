//! CoreGraphics event-tap backend.

mod backend;
mod event;
mod ffi;

pub use backend::{MacBackend, MacHook};
pub use event::{MacEvent, TapProxy};
