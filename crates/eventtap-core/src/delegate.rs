//! General-purpose dispatch provider: one assignable slot per category.

use crate::provider::{DispatchProvider, EventHandler, ReceiveAnyHandler, UnknownEventHandler};
use crate::{Disposition, EventCategory, EventSlot, HookBackend, RawEventType, Tap};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Dispatch provider backed by a table of independently settable handler
/// slots.
///
/// An empty slot means "not handled" and the event passes through. Slots
/// can be changed at any time, from any thread, without touching the tap.
///
/// ```ignore
/// let delegate = DelegateAdapter::new()
///     .on(EventCategory::KeyUp, |_tap, _event, _proxy| Disposition::Drop)
///     .on_any(|_tap, _slot, _raw, _proxy| false);
/// ```
pub struct DelegateAdapter<B: HookBackend> {
    receive_any: RwLock<Option<ReceiveAnyHandler<B>>>,
    handlers: RwLock<HashMap<EventCategory, EventHandler<B>>>,
    unknown: RwLock<Option<UnknownEventHandler<B>>>,
}

impl<B: HookBackend> DelegateAdapter<B> {
    pub fn new() -> Self {
        Self {
            receive_any: RwLock::new(None),
            handlers: RwLock::new(HashMap::new()),
            unknown: RwLock::new(None),
        }
    }

    /// Wrap into the shared form a tap stores.
    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn set_handler<F>(&self, category: EventCategory, handler: F)
    where
        F: Fn(&Tap<B>, &B::Event, B::Proxy) -> Disposition<B::Event> + Send + Sync + 'static,
    {
        self.handlers.write().insert(category, Arc::new(handler));
    }

    pub fn clear_handler(&self, category: EventCategory) {
        self.handlers.write().remove(&category);
    }

    pub fn has_handler(&self, category: EventCategory) -> bool {
        self.handlers.read().contains_key(&category)
    }

    pub fn set_receive_any<F>(&self, handler: F)
    where
        F: Fn(&Tap<B>, &mut EventSlot<'_, B::Event>, RawEventType, B::Proxy) -> bool
            + Send
            + Sync
            + 'static,
    {
        *self.receive_any.write() = Some(Arc::new(handler));
    }

    pub fn clear_receive_any(&self) {
        *self.receive_any.write() = None;
    }

    pub fn set_unknown<F>(&self, handler: F)
    where
        F: Fn(&Tap<B>, &B::Event, RawEventType, B::Proxy) -> Disposition<B::Event>
            + Send
            + Sync
            + 'static,
    {
        *self.unknown.write() = Some(Arc::new(handler));
    }

    pub fn clear_unknown(&self) {
        *self.unknown.write() = None;
    }

    /// Empty every slot.
    pub fn clear(&self) {
        self.clear_receive_any();
        self.clear_unknown();
        self.handlers.write().clear();
    }

    /// Builder form of [`set_handler`](Self::set_handler).
    pub fn on<F>(self, category: EventCategory, handler: F) -> Self
    where
        F: Fn(&Tap<B>, &B::Event, B::Proxy) -> Disposition<B::Event> + Send + Sync + 'static,
    {
        self.set_handler(category, handler);
        self
    }

    /// Builder form of [`set_receive_any`](Self::set_receive_any).
    pub fn on_any<F>(self, handler: F) -> Self
    where
        F: Fn(&Tap<B>, &mut EventSlot<'_, B::Event>, RawEventType, B::Proxy) -> bool
            + Send
            + Sync
            + 'static,
    {
        self.set_receive_any(handler);
        self
    }

    /// Builder form of [`set_unknown`](Self::set_unknown).
    pub fn on_unknown<F>(self, handler: F) -> Self
    where
        F: Fn(&Tap<B>, &B::Event, RawEventType, B::Proxy) -> Disposition<B::Event>
            + Send
            + Sync
            + 'static,
    {
        self.set_unknown(handler);
        self
    }
}

impl<B: HookBackend> Default for DelegateAdapter<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: HookBackend> DispatchProvider<B> for DelegateAdapter<B> {
    fn receive_any(&self) -> Option<ReceiveAnyHandler<B>> {
        self.receive_any.read().clone()
    }

    fn handler(&self, category: EventCategory) -> Option<EventHandler<B>> {
        self.handlers.read().get(&category).cloned()
    }

    fn unknown_handler(&self) -> Option<UnknownEventHandler<B>> {
        self.unknown.read().clone()
    }
}
