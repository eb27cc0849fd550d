//! Tap factory and lifecycle control.

use crate::backend::{HookRequest, InstalledHook, SinkRef};
use crate::provider::SharedProvider;
use crate::{
    EventMask, HookBackend, ProcessTarget, SystemTapEnumerator, Tap, TapConfiguration,
    TapPlacement, TapResult,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Creates taps through a [`HookBackend`] and controls their state.
///
/// Every tap comes back attached to the requested run loop and disabled.
pub struct TapManager<B: HookBackend> {
    backend: Arc<B>,
}

impl<B: HookBackend> Clone for TapManager<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: HookBackend> TapManager<B> {
    pub fn new(backend: B) -> Self {
        Self::with_backend(Arc::new(backend))
    }

    pub fn with_backend(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Read-only view of every tap on the system.
    pub fn enumerator(&self) -> SystemTapEnumerator<B> {
        SystemTapEnumerator::new(Arc::clone(&self.backend))
    }

    /// Create a tap at one of the placements.
    ///
    /// [`TapPlacement::Process`] installs the tap at the calling process;
    /// use [`create_by_process`](Self::create_by_process) to target another.
    pub fn create_by_placement(
        &self,
        placement: TapPlacement,
        mask: EventMask,
        before_others: bool,
        passive: bool,
        run_loop: &B::RunLoop,
        provider: Option<SharedProvider<B>>,
    ) -> TapResult<Arc<Tap<B>>> {
        if placement == TapPlacement::Process {
            return self.create_by_process(
                ProcessTarget::Current,
                mask,
                before_others,
                passive,
                run_loop,
                provider,
            );
        }
        let configuration = TapConfiguration::global(placement, mask)
            .before_others(before_others)
            .passive(passive);
        self.create(configuration, run_loop, provider)
    }

    /// Create a tap targeted at one process, or at the caller.
    pub fn create_by_process(
        &self,
        target: ProcessTarget,
        mask: EventMask,
        before_others: bool,
        passive: bool,
        run_loop: &B::RunLoop,
        provider: Option<SharedProvider<B>>,
    ) -> TapResult<Arc<Tap<B>>> {
        let process = match target {
            ProcessTarget::Current => self.backend.current_process()?,
            ProcessTarget::Serial(psn) => psn,
        };
        let configuration = TapConfiguration::for_process(process, mask)
            .before_others(before_others)
            .passive(passive);
        self.create(configuration, run_loop, provider)
    }

    /// Create a tap from a full configuration.
    ///
    /// Fails without side effects when the configuration or run loop is
    /// unusable or the OS refuses the hook. A hook that cannot be attached
    /// is released before the error is returned.
    pub fn create(
        &self,
        configuration: TapConfiguration,
        run_loop: &B::RunLoop,
        provider: Option<SharedProvider<B>>,
    ) -> TapResult<Arc<Tap<B>>> {
        configuration.validate()?;
        self.backend.validate_run_loop(run_loop)?;

        let request = HookRequest::new(configuration.clone());
        let tap = Arc::new(Tap::new(configuration, provider));
        let weak = Arc::downgrade(&tap);
        let sink: SinkRef<B::Event, B::Proxy> = weak;

        let mut hook = self.backend.create_hook(&request, sink).map_err(|e| {
            warn!(placement = %request.configuration.placement, error = %e, "hook creation refused");
            e
        })?;
        self.backend.attach(&mut hook, run_loop).map_err(|e| {
            warn!(hook = hook.id(), error = %e, "run loop attachment failed, releasing hook");
            e
        })?;
        tap.install(hook);

        let requested = tap.requested_mask();
        let granted = tap.granted_mask();
        if granted != requested {
            warn!(
                tap = tap.id(),
                requested = %requested,
                dropped = %requested.difference(granted),
                "OS granted a reduced event mask"
            );
        }
        info!(
            tap = tap.id(),
            placement = %tap.placement(),
            granted = %granted,
            before_others = tap.insert_before_others(),
            passive = tap.is_passive(),
            "tap created"
        );
        Ok(tap)
    }

    pub fn enable(&self, tap: &Tap<B>) -> TapResult<()> {
        tap.enable()
    }

    pub fn disable(&self, tap: &Tap<B>) -> TapResult<()> {
        tap.disable()
    }

    pub fn destroy(&self, tap: &Tap<B>) -> TapResult<()> {
        tap.destroy()
    }
}
