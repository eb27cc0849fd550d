//! Event dispatch: routes one intercepted event to the tap's handlers.
//!
//! Handler results follow a tri-state contract. `Continue` hands the
//! original event back to the OS, `Replace` hands back a new event (the OS
//! releases both), and `Drop` removes the event from the pipeline. In
//! every case the original stays owned by the caller; handlers only borrow
//! it.

use crate::{EventCategory, HookBackend, RawEventType, Tap};
use tracing::trace;

/// What the OS should do with an intercepted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition<E> {
    /// Keep processing the original event.
    Continue,
    /// Use this event instead of the original.
    Replace(E),
    /// Remove the event from the pipeline.
    Drop,
}

impl<E> Disposition<E> {
    pub fn is_continue(&self) -> bool {
        matches!(self, Disposition::Continue)
    }

    pub fn is_drop(&self) -> bool {
        matches!(self, Disposition::Drop)
    }

    /// The replacement event, if any.
    pub fn replacement(&self) -> Option<&E> {
        match self {
            Disposition::Replace(event) => Some(event),
            _ => None,
        }
    }

    /// Resolve against the original: `None` means the event was dropped.
    pub fn resolve<'a>(&'a self, original: &'a E) -> Option<&'a E> {
        match self {
            Disposition::Continue => Some(original),
            Disposition::Replace(event) => Some(event),
            Disposition::Drop => None,
        }
    }
}

#[derive(Debug)]
enum SlotState<E> {
    Original,
    Replaced(E),
    Emptied,
}

/// Mutable view of the event handed to a receive-any handler.
///
/// The original event is borrowed; a handler may swap in a replacement or
/// empty the slot, and may restore the original afterwards.
#[derive(Debug)]
pub struct EventSlot<'a, E> {
    original: &'a E,
    state: SlotState<E>,
}

impl<'a, E> EventSlot<'a, E> {
    pub fn new(original: &'a E) -> Self {
        Self {
            original,
            state: SlotState::Original,
        }
    }

    /// The event currently in the slot, `None` once emptied.
    pub fn event(&self) -> Option<&E> {
        match &self.state {
            SlotState::Original => Some(self.original),
            SlotState::Replaced(event) => Some(event),
            SlotState::Emptied => None,
        }
    }

    /// The event the OS delivered, whatever the slot now holds.
    pub fn original(&self) -> &'a E {
        self.original
    }

    pub fn replace(&mut self, event: E) {
        self.state = SlotState::Replaced(event);
    }

    /// Empty the slot; the event will be dropped.
    pub fn clear(&mut self) {
        self.state = SlotState::Emptied;
    }

    pub fn restore(&mut self) {
        self.state = SlotState::Original;
    }

    pub fn is_replaced(&self) -> bool {
        matches!(self.state, SlotState::Replaced(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.state, SlotState::Emptied)
    }

    pub fn into_disposition(self) -> Disposition<E> {
        match self.state {
            SlotState::Original => Disposition::Continue,
            SlotState::Replaced(event) => Disposition::Replace(event),
            SlotState::Emptied => Disposition::Drop,
        }
    }
}

/// Dispatch one event for `tap`.
///
/// 1. The receive-any handler sees the mutable slot first; if it reports
///    the event handled, the slot's contents are final.
/// 2. Otherwise the handler for the event's category gets the current
///    event value.
/// 3. Tags no category covers go to the unknown-category handler.
///
/// Missing handlers pass the event through.
pub fn dispatch<B: HookBackend>(
    tap: &Tap<B>,
    event_type: RawEventType,
    event: &B::Event,
    proxy: B::Proxy,
) -> Disposition<B::Event> {
    let category = EventCategory::from_raw(event_type);
    trace!(tap = tap.id(), event_type, ?category, "dispatching event");

    // The provider is cloned out so handlers may swap it while running.
    let Some(provider) = tap.provider() else {
        return Disposition::Continue;
    };

    let mut slot = EventSlot::new(event);
    if let Some(receive_any) = provider.receive_any() {
        if receive_any(tap, &mut slot, event_type, proxy) {
            trace!(tap = tap.id(), event_type, "event handled by receive-any handler");
            return slot.into_disposition();
        }
    }

    let outcome = {
        let Some(current) = slot.event() else {
            return Disposition::Drop;
        };
        match category {
            Some(category) => match provider.handler(category) {
                Some(handler) => handler(tap, current, proxy),
                None => Disposition::Continue,
            },
            None => match provider.unknown_handler() {
                Some(handler) => handler(tap, current, event_type, proxy),
                None => Disposition::Continue,
            },
        }
    };

    match outcome {
        Disposition::Continue => slot.into_disposition(),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untouched_slot_continues() {
        let original = 7u32;
        let slot = EventSlot::new(&original);
        assert_eq!(slot.event(), Some(&7));
        assert_eq!(slot.into_disposition(), Disposition::Continue);
    }

    #[test]
    fn test_slot_replace_and_restore() {
        let original = 7u32;
        let mut slot = EventSlot::new(&original);
        slot.replace(9);
        assert!(slot.is_replaced());
        assert_eq!(slot.event(), Some(&9));
        assert_eq!(slot.original(), &7);
        slot.restore();
        assert_eq!(slot.event(), Some(&7));
        slot.clear();
        assert!(slot.is_empty());
        assert_eq!(slot.event(), None);
        assert_eq!(slot.into_disposition(), Disposition::Drop);
    }

    #[test]
    fn test_resolve() {
        let original = 1u8;
        assert_eq!(Disposition::Continue.resolve(&original), Some(&1));
        assert_eq!(Disposition::Replace(2).resolve(&original), Some(&2));
        assert_eq!(Disposition::<u8>::Drop.resolve(&original), None);
    }
}
