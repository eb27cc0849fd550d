//! Per-tap callback context and the rule for what a callback hands back.
//!
//! The OS ignores the return value of listen-only taps and of tap-disabled
//! notifications, so a replacement produced there is released locally
//! instead of being passed to the OS.

#![cfg_attr(not(target_os = "macos"), allow(dead_code))]

use eventtap_core::{Disposition, EventCategory, RawEventType};

/// Boxed behind the native callback's user-info pointer.
pub(crate) struct CallbackContext<S> {
    pub sink: S,
    pub passive: bool,
}

/// What the callback returns to the OS.
#[derive(Debug, PartialEq)]
pub(crate) enum Settled<E> {
    Original,
    Suppress,
    Replacement(E),
}

impl<S> CallbackContext<S> {
    pub fn new(sink: S, passive: bool) -> Self {
        Self { sink, passive }
    }

    pub fn result_ignored(&self, event_type: RawEventType) -> bool {
        self.passive
            || EventCategory::from_raw(event_type).is_some_and(EventCategory::is_tap_disabled)
    }

    /// Map a handler outcome to the callback's return. `is_original` tells
    /// whether a replacement is the incoming event itself.
    pub fn settle<E>(
        &self,
        event_type: RawEventType,
        outcome: Disposition<E>,
        is_original: impl Fn(&E) -> bool,
    ) -> Settled<E> {
        if self.result_ignored(event_type) {
            return Settled::Original;
        }
        match outcome {
            Disposition::Continue => Settled::Original,
            Disposition::Drop => Settled::Suppress,
            Disposition::Replace(replacement) if is_original(&replacement) => Settled::Original,
            Disposition::Replace(replacement) => Settled::Replacement(replacement),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const KEY_UP: RawEventType = EventCategory::KeyUp as RawEventType;
    const TIMEOUT: RawEventType = EventCategory::TapDisabledByTimeout as RawEventType;

    /// Counts releases, standing in for a retained OS event.
    struct Retained<'a> {
        id: u32,
        released: &'a Cell<u32>,
    }

    impl Drop for Retained<'_> {
        fn drop(&mut self) {
            self.released.set(self.released.get() + 1);
        }
    }

    fn replace(id: u32, released: &Cell<u32>) -> Disposition<Retained<'_>> {
        Disposition::Replace(Retained { id, released })
    }

    fn is_first(event: &Retained<'_>) -> bool {
        event.id == 1
    }

    #[test]
    fn test_active_tap_passes_replacement_on() {
        let released = Cell::new(0);
        let context = CallbackContext::new((), false);

        let settled = context.settle(KEY_UP, replace(2, &released), is_first);
        assert!(matches!(settled, Settled::Replacement(Retained { id: 2, .. })));
        assert_eq!(released.get(), 0);

        let settled = context.settle(KEY_UP, replace(1, &released), is_first);
        assert!(matches!(settled, Settled::Original));
        assert_eq!(released.get(), 1);

        let settled = context.settle(KEY_UP, Disposition::<Retained<'_>>::Drop, is_first);
        assert!(matches!(settled, Settled::Suppress));
        let settled = context.settle(KEY_UP, Disposition::<Retained<'_>>::Continue, is_first);
        assert!(matches!(settled, Settled::Original));
    }

    #[test]
    fn test_passive_tap_releases_replacement() {
        let released = Cell::new(0);
        let context = CallbackContext::new((), true);
        assert!(context.result_ignored(KEY_UP));

        let settled = context.settle(KEY_UP, replace(2, &released), is_first);
        assert!(matches!(settled, Settled::Original));
        assert_eq!(released.get(), 1);

        let settled = context.settle(KEY_UP, Disposition::<Retained<'_>>::Drop, is_first);
        assert!(matches!(settled, Settled::Original));
    }

    #[test]
    fn test_tap_disabled_notification_releases_replacement() {
        let released = Cell::new(0);
        let context = CallbackContext::new((), false);
        assert!(context.result_ignored(TIMEOUT));
        assert!(!context.result_ignored(KEY_UP));
        assert!(!context.result_ignored(9));

        let settled = context.settle(TIMEOUT, replace(2, &released), is_first);
        assert!(matches!(settled, Settled::Original));
        assert_eq!(released.get(), 1);
    }
}
