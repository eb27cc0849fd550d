//! An installed tap and its runtime state.

use crate::backend::{EventSink, InstalledHook};
use crate::dispatch::dispatch;
use crate::provider::SharedProvider;
use crate::{
    Disposition, EventMask, HookBackend, ProcessSerialNumber, RawEventType, TapConfiguration,
    TapError, TapPlacement, TapResult,
};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy)]
struct TapIdentity {
    id: u32,
    granted_mask: EventMask,
}

/// A hook installed by [`crate::TapManager`], shared as `Arc<Tap<B>>`.
///
/// The tap exclusively owns its hook. Dropping the last `Arc` releases the
/// hook just like [`Tap::destroy`].
///
/// Only two fields change after creation, both atomically: the enabled
/// flag, and the dispatch provider (swapped as a whole).
pub struct Tap<B: HookBackend> {
    configuration: TapConfiguration,
    identity: OnceLock<TapIdentity>,
    enabled: AtomicBool,
    destroyed: AtomicBool,
    provider: RwLock<Option<SharedProvider<B>>>,
    hook: Mutex<Option<B::Hook>>,
}

impl<B: HookBackend> Tap<B> {
    pub(crate) fn new(configuration: TapConfiguration, provider: Option<SharedProvider<B>>) -> Self {
        Self {
            configuration,
            identity: OnceLock::new(),
            enabled: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            provider: RwLock::new(provider),
            hook: Mutex::new(None),
        }
    }

    /// Take ownership of a freshly created, attached hook.
    pub(crate) fn install(&self, hook: B::Hook) {
        let granted_mask = hook
            .granted_mask()
            .intersection(self.configuration.requested_mask);
        let _ = self.identity.set(TapIdentity {
            id: hook.id(),
            granted_mask,
        });
        *self.hook.lock() = Some(hook);
    }

    pub fn configuration(&self) -> &TapConfiguration {
        &self.configuration
    }

    /// Identifier the OS assigned at creation.
    pub fn id(&self) -> u32 {
        self.identity.get().map_or(0, |identity| identity.id)
    }

    /// Categories the OS actually delivers; always a subset of the
    /// requested mask.
    pub fn granted_mask(&self) -> EventMask {
        self.identity
            .get()
            .map_or(EventMask::EMPTY, |identity| identity.granted_mask)
    }

    pub fn requested_mask(&self) -> EventMask {
        self.configuration.requested_mask
    }

    pub fn placement(&self) -> TapPlacement {
        self.configuration.placement
    }

    pub fn insert_before_others(&self) -> bool {
        self.configuration.insert_before_others
    }

    pub fn is_passive(&self) -> bool {
        self.configuration.passive
    }

    /// Target process, or the zero serial number for global taps.
    pub fn process_serial_number(&self) -> ProcessSerialNumber {
        self.configuration.target_process.unwrap_or_default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Current dispatch provider.
    pub fn provider(&self) -> Option<SharedProvider<B>> {
        self.provider.read().clone()
    }

    /// Swap the dispatch provider, returning the previous one. `None`
    /// turns every event into a pass-through.
    pub fn set_provider(&self, provider: Option<SharedProvider<B>>) -> Option<SharedProvider<B>> {
        std::mem::replace(&mut *self.provider.write(), provider)
    }

    /// Enable the tap. Enabling an enabled tap changes nothing, but the
    /// hook is re-armed so a tap the OS disabled on timeout comes back.
    pub fn enable(&self) -> TapResult<()> {
        self.set_enabled(true)
    }

    pub fn disable(&self) -> TapResult<()> {
        self.set_enabled(false)
    }

    fn set_enabled(&self, enabled: bool) -> TapResult<()> {
        let hook = self.hook.lock();
        let Some(hook) = hook.as_ref() else {
            return Err(TapError::Destroyed { id: self.id() });
        };
        let was_enabled = self.enabled.swap(enabled, Ordering::SeqCst);
        hook.set_enabled(enabled);
        if was_enabled != enabled {
            debug!(tap = self.id(), enabled, "tap state changed");
        }
        Ok(())
    }

    /// Detach and release the hook. No callback for this tap runs after
    /// this returns; a handler already running is not interrupted.
    ///
    /// Callers must not destroy a tap while one of its events is being
    /// dispatched on another thread.
    pub fn destroy(&self) -> TapResult<()> {
        let Some(hook) = self.hook.lock().take() else {
            return Err(TapError::Destroyed { id: self.id() });
        };
        self.destroyed.store(true, Ordering::SeqCst);
        self.enabled.store(false, Ordering::SeqCst);
        hook.set_enabled(false);
        drop(hook);
        info!(tap = self.id(), "tap destroyed");
        Ok(())
    }
}

impl<B: HookBackend> EventSink<B::Event, B::Proxy> for Tap<B> {
    fn deliver(
        &self,
        event_type: RawEventType,
        event: &B::Event,
        proxy: B::Proxy,
    ) -> Disposition<B::Event> {
        if self.is_destroyed() {
            return Disposition::Continue;
        }
        dispatch(self, event_type, event, proxy)
    }
}

impl<B: HookBackend> Drop for Tap<B> {
    fn drop(&mut self) {
        if let Some(hook) = self.hook.get_mut().take() {
            hook.set_enabled(false);
            drop(hook);
            debug!(tap = self.id(), "tap released by last owner");
        }
    }
}

impl<B: HookBackend> fmt::Debug for Tap<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tap")
            .field("id", &self.id())
            .field("placement", &self.placement())
            .field("requested_mask", &self.requested_mask())
            .field("granted_mask", &self.granted_mask())
            .field("before_others", &self.insert_before_others())
            .field("passive", &self.is_passive())
            .field("enabled", &self.is_enabled())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
