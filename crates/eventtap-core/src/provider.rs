//! The dispatch capability: category → handler lookup.

use crate::{Disposition, EventCategory, EventSlot, HookBackend, RawEventType, Tap};
use std::sync::Arc;

/// Runs before any category handler with the mutable event slot.
///
/// Returns `true` when the event is fully handled; the slot's contents
/// then go back to the OS and no category handler runs.
pub type ReceiveAnyHandler<B> = Arc<
    dyn Fn(
            &Tap<B>,
            &mut EventSlot<'_, <B as HookBackend>::Event>,
            RawEventType,
            <B as HookBackend>::Proxy,
        ) -> bool
        + Send
        + Sync,
>;

/// Handles one known category.
pub type EventHandler<B> = Arc<
    dyn Fn(
            &Tap<B>,
            &<B as HookBackend>::Event,
            <B as HookBackend>::Proxy,
        ) -> Disposition<<B as HookBackend>::Event>
        + Send
        + Sync,
>;

/// Handles tags outside [`EventCategory`].
pub type UnknownEventHandler<B> = Arc<
    dyn Fn(
            &Tap<B>,
            &<B as HookBackend>::Event,
            RawEventType,
            <B as HookBackend>::Proxy,
        ) -> Disposition<<B as HookBackend>::Event>
        + Send
        + Sync,
>;

/// Anything that can tell the dispatcher which handler owns an event.
///
/// Every lookup may return `None`, which the dispatcher treats as
/// pass-through. [`crate::DelegateAdapter`] is the general-purpose
/// implementation; a type with fixed behaviour can implement this
/// directly.
///
/// A provider that needs to reach its tap must hold it weakly: the tap
/// already holds the provider strongly.
pub trait DispatchProvider<B: HookBackend>: Send + Sync {
    fn receive_any(&self) -> Option<ReceiveAnyHandler<B>> {
        None
    }

    fn handler(&self, category: EventCategory) -> Option<EventHandler<B>>;

    fn unknown_handler(&self) -> Option<UnknownEventHandler<B>> {
        None
    }
}

/// Shared, swappable provider reference as a tap stores it.
pub type SharedProvider<B> = Arc<dyn DispatchProvider<B>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::{PostOutcome, SimEvent, SimLoop, SimProxy, SimulatedSystem};
    use crate::{EventMask, TapManager, TapPlacement};

    /// Swallows every key release, nothing else.
    struct KeyUpFilter;

    impl DispatchProvider<SimulatedSystem> for KeyUpFilter {
        fn handler(&self, category: EventCategory) -> Option<EventHandler<SimulatedSystem>> {
            match category {
                EventCategory::KeyUp => Some(Arc::new(
                    |_tap: &Tap<SimulatedSystem>, _event: &SimEvent, _proxy: SimProxy| {
                        Disposition::Drop
                    },
                )),
                _ => None,
            }
        }
    }

    #[test]
    fn test_fixed_provider() {
        let manager = TapManager::new(SimulatedSystem::new());
        let run_loop = SimLoop::new();
        let mask = EventMask::from_categories([EventCategory::KeyDown, EventCategory::KeyUp]);
        let provider: SharedProvider<SimulatedSystem> = Arc::new(KeyUpFilter);
        let tap = manager
            .create_by_placement(TapPlacement::Session, mask, true, false, &run_loop, Some(provider))
            .unwrap();
        tap.enable().unwrap();

        let key_down = EventCategory::KeyDown.raw();
        let key_up = EventCategory::KeyUp.raw();
        let system = manager.backend();
        assert_eq!(
            system.post(key_down, SimEvent::key(1, 0)),
            PostOutcome::Delivered(SimEvent::key(1, 0))
        );
        assert_eq!(
            system.post(key_up, SimEvent::key(2, 0)),
            PostOutcome::Dropped { by_tap: tap.id() }
        );
    }
}
