//! In-process hook backend.
//!
//! Keeps a system-wide tap registry, grants masks the way the OS does for
//! trusted and untrusted processes, and runs posted events through the
//! installed taps in pipeline order. Used by the test suite and on hosts
//! without native event taps.

use crate::backend::{HookRequest, InstalledHook, SinkRef};
use crate::{
    Disposition, EventCategory, EventMask, HookBackend, ProcessSerialNumber, RawEventType,
    TapConfiguration, TapError, TapInformation, TapPlacement, TapResult, TAP_OPTION_LISTEN_ONLY,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Event flowing through the simulated pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimEvent {
    pub serial: u64,
    pub keycode: Option<u16>,
    pub x: f64,
    pub y: f64,
}

impl SimEvent {
    pub fn new(serial: u64) -> Self {
        Self {
            serial,
            ..Self::default()
        }
    }

    pub fn key(serial: u64, keycode: u16) -> Self {
        Self {
            serial,
            keycode: Some(keycode),
            ..Self::default()
        }
    }

    pub fn at(serial: u64, x: f64, y: f64) -> Self {
        Self {
            serial,
            x,
            y,
            ..Self::default()
        }
    }
}

/// Event-source context: the tap the event is being delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimProxy {
    pub tap_id: u32,
}

/// What came out the far end of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PostOutcome {
    Delivered(SimEvent),
    Dropped { by_tap: u32 },
}

impl PostOutcome {
    pub fn event(&self) -> Option<&SimEvent> {
        match self {
            PostOutcome::Delivered(event) => Some(event),
            PostOutcome::Dropped { .. } => None,
        }
    }
}

struct SimTapEntry {
    info: TapInformation,
    /// `None` for taps registered on behalf of other processes.
    configuration: Option<TapConfiguration>,
    sink: Option<SinkRef<SimEvent, SimProxy>>,
    attached: bool,
    sequence: u64,
}

impl SimTapEntry {
    fn is_live(&self) -> bool {
        self.sink.is_some() && self.attached && self.info.enabled
    }

    /// Position in the pipeline: placement first, then head-inserted taps
    /// newest first, then tail-appended taps oldest first.
    fn order_key(&self) -> (u32, u8, u64) {
        let before_others = self
            .configuration
            .as_ref()
            .map_or(true, |c| c.insert_before_others);
        if before_others {
            (self.info.tap_point, 0, u64::MAX - self.sequence)
        } else {
            (self.info.tap_point, 1, self.sequence)
        }
    }
}

struct SimState {
    next_id: u32,
    next_sequence: u64,
    taps: Vec<SimTapEntry>,
    processes: HashMap<ProcessSerialNumber, i32>,
}

impl SimState {
    fn allocate(&mut self) -> (u32, u64) {
        let id = self.next_id;
        let sequence = self.next_sequence;
        self.next_id += 1;
        self.next_sequence += 1;
        (id, sequence)
    }

    fn entry_mut(&mut self, id: u32) -> Option<&mut SimTapEntry> {
        self.taps.iter_mut().find(|t| t.info.event_tap_id == id)
    }
}

/// Simulated host OS.
pub struct SimulatedSystem {
    state: Arc<Mutex<SimState>>,
    trusted: bool,
    process: ProcessSerialNumber,
    pid: i32,
}

impl SimulatedSystem {
    /// A system where the calling process is trusted for every category.
    pub fn new() -> Self {
        let process = ProcessSerialNumber::new(0, 0x1001);
        let pid = std::process::id() as i32;
        let mut processes = HashMap::new();
        processes.insert(process, pid);
        Self {
            state: Arc::new(Mutex::new(SimState {
                next_id: 1,
                next_sequence: 0,
                taps: Vec::new(),
                processes,
            })),
            trusted: true,
            process,
            pid,
        }
    }

    /// A system where keyboard categories are withheld from the caller.
    pub fn untrusted() -> Self {
        Self {
            trusted: false,
            ..Self::new()
        }
    }

    pub fn is_trusted(&self) -> bool {
        self.trusted
    }

    /// Make a process addressable by process-targeted taps.
    pub fn register_process(&self, psn: ProcessSerialNumber, pid: i32) {
        self.state.lock().processes.insert(psn, pid);
    }

    /// Register a tap owned by some other process. Returns its id.
    pub fn add_foreign_tap(&self, mut info: TapInformation) -> u32 {
        let mut state = self.state.lock();
        let (id, sequence) = state.allocate();
        info.event_tap_id = id;
        state.taps.push(SimTapEntry {
            info,
            configuration: None,
            sink: None,
            attached: true,
            sequence,
        });
        id
    }

    /// Remove a tap registered with [`add_foreign_tap`](Self::add_foreign_tap).
    pub fn remove_foreign_tap(&self, id: u32) -> bool {
        let mut state = self.state.lock();
        let before = state.taps.len();
        state
            .taps
            .retain(|t| !(t.info.event_tap_id == id && t.sink.is_none()));
        state.taps.len() != before
    }

    /// OS-side enabled state of a tap, `None` if it is not installed.
    pub fn is_hook_enabled(&self, id: u32) -> Option<bool> {
        let mut state = self.state.lock();
        state.entry_mut(id).map(|t| t.info.enabled)
    }

    /// Post an event into the global pipeline.
    pub fn post(&self, event_type: RawEventType, event: SimEvent) -> PostOutcome {
        self.run_pipeline(None, event_type, event)
    }

    /// Post an event to one process; only taps targeting it see it.
    pub fn post_to(
        &self,
        process: ProcessSerialNumber,
        event_type: RawEventType,
        event: SimEvent,
    ) -> PostOutcome {
        self.run_pipeline(Some(process), event_type, event)
    }

    /// Disable a tap OS-side and tell it why, as the OS does when a
    /// callback is too slow or user input turns the tap off.
    pub fn expire(&self, id: u32, reason: EventCategory) -> bool {
        if !reason.is_tap_disabled() {
            return false;
        }
        let sink = {
            let mut state = self.state.lock();
            let Some(entry) = state.entry_mut(id) else {
                return false;
            };
            entry.info.enabled = false;
            entry.sink.clone()
        };
        let Some(sink) = sink.and_then(|s| s.upgrade()) else {
            return false;
        };
        debug!(tap = id, %reason, "tap disabled by system");
        let _ = sink.deliver(reason.raw(), &SimEvent::default(), SimProxy { tap_id: id });
        true
    }

    fn route(&self, target: Option<ProcessSerialNumber>, event_type: RawEventType) -> Vec<u32> {
        let state = self.state.lock();
        let mut candidates: Vec<&SimTapEntry> = state
            .taps
            .iter()
            .filter(|t| t.is_live() && t.info.events().contains_raw(event_type))
            .filter(|t| match (&t.configuration, target) {
                (Some(config), None) => config.placement != TapPlacement::Process,
                (Some(config), Some(psn)) => config.target_process == Some(psn),
                (None, _) => false,
            })
            .collect();
        candidates.sort_by_key(|t| t.order_key());
        candidates.into_iter().map(|t| t.info.event_tap_id).collect()
    }

    fn live_sink(&self, id: u32) -> Option<(SinkRef<SimEvent, SimProxy>, bool)> {
        let mut state = self.state.lock();
        let entry = state.entry_mut(id)?;
        if !entry.is_live() {
            return None;
        }
        let passive = entry.info.is_passive();
        entry.sink.clone().map(|sink| (sink, passive))
    }

    fn run_pipeline(
        &self,
        target: Option<ProcessSerialNumber>,
        event_type: RawEventType,
        event: SimEvent,
    ) -> PostOutcome {
        let mut current = event;
        for id in self.route(target, event_type) {
            // Re-checked per tap: an earlier handler may have changed things.
            let Some((sink, passive)) = self.live_sink(id) else {
                continue;
            };
            let Some(sink) = sink.upgrade() else {
                continue;
            };
            let outcome = sink.deliver(event_type, &current, SimProxy { tap_id: id });
            if passive {
                continue;
            }
            match outcome {
                Disposition::Continue => {}
                Disposition::Replace(replacement) => current = replacement,
                Disposition::Drop => {
                    trace!(tap = id, event_type, "event dropped");
                    return PostOutcome::Dropped { by_tap: id };
                }
            }
        }
        PostOutcome::Delivered(current)
    }
}

impl Default for SimulatedSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl HookBackend for SimulatedSystem {
    type Event = SimEvent;
    type Proxy = SimProxy;
    type RunLoop = SimLoop;
    type Hook = SimHook;

    fn current_process(&self) -> TapResult<ProcessSerialNumber> {
        Ok(self.process)
    }

    fn validate_run_loop(&self, run_loop: &SimLoop) -> TapResult<()> {
        if run_loop.is_valid() {
            Ok(())
        } else {
            Err(TapError::InvalidRunLoop("run loop has been invalidated".into()))
        }
    }

    fn create_hook(
        &self,
        request: &HookRequest,
        sink: SinkRef<SimEvent, SimProxy>,
    ) -> TapResult<SimHook> {
        let config = &request.configuration;
        let mut state = self.state.lock();

        let process_being_tapped = match config.target_process {
            Some(psn) => match state.processes.get(&psn) {
                Some(pid) => *pid,
                None => return Err(TapError::InvalidProcess(format!("no process {psn}"))),
            },
            None => 0,
        };

        let mut granted = config.requested_mask;
        if !self.trusted {
            for category in EventCategory::ALL {
                if category.requires_privilege() {
                    granted.remove(category);
                }
            }
        }
        if granted.is_empty() {
            return Err(TapError::PermissionDenied(format!(
                "no requested category is available to an untrusted process: {}",
                config.requested_mask
            )));
        }

        let (id, sequence) = state.allocate();
        state.taps.push(SimTapEntry {
            info: TapInformation {
                event_tap_id: id,
                tap_point: config.placement.raw(),
                options: if config.passive { TAP_OPTION_LISTEN_ONLY } else { 0 },
                events_of_interest: granted.bits(),
                tapping_process: self.pid,
                process_being_tapped,
                enabled: false,
                ..TapInformation::default()
            },
            configuration: Some(config.clone()),
            sink: Some(sink),
            attached: false,
            sequence,
        });
        debug!(tap = id, granted = %granted, "simulated hook created");

        Ok(SimHook {
            id,
            granted,
            state: Arc::clone(&self.state),
            run_loop: None,
        })
    }

    fn attach(&self, hook: &mut SimHook, run_loop: &SimLoop) -> TapResult<()> {
        if !run_loop.add_source(hook.id) {
            return Err(TapError::LoopAttachmentFailed(
                "run loop defines no common modes".into(),
            ));
        }
        if let Some(entry) = self.state.lock().entry_mut(hook.id) {
            entry.attached = true;
        }
        hook.run_loop = Some(run_loop.clone());
        Ok(())
    }

    fn system_tap_count(&self) -> TapResult<u32> {
        Ok(self.state.lock().taps.len() as u32)
    }

    fn system_taps(&self) -> TapResult<Vec<TapInformation>> {
        Ok(self.state.lock().taps.iter().map(|t| t.info).collect())
    }
}

/// Hook installed in a [`SimulatedSystem`].
pub struct SimHook {
    id: u32,
    granted: EventMask,
    state: Arc<Mutex<SimState>>,
    run_loop: Option<SimLoop>,
}

impl InstalledHook for SimHook {
    fn id(&self) -> u32 {
        self.id
    }

    fn granted_mask(&self) -> EventMask {
        self.granted
    }

    fn set_enabled(&self, enabled: bool) {
        if let Some(entry) = self.state.lock().entry_mut(self.id) {
            entry.info.enabled = enabled;
        }
    }
}

impl Drop for SimHook {
    fn drop(&mut self) {
        if let Some(run_loop) = self.run_loop.take() {
            run_loop.remove_source(self.id);
        }
        let id = self.id;
        self.state.lock().taps.retain(|t| t.info.event_tap_id != id);
        debug!(tap = id, "simulated hook released");
    }
}

#[derive(Debug)]
struct LoopState {
    common_modes: Vec<String>,
    valid: bool,
    sources: Vec<(u32, String)>,
}

/// Host run loop with named modes.
#[derive(Debug, Clone)]
pub struct SimLoop {
    inner: Arc<Mutex<LoopState>>,
}

impl SimLoop {
    pub const DEFAULT_MODES: [&'static str; 3] = ["default", "event-tracking", "modal-panel"];

    pub fn new() -> Self {
        Self::with_modes(Self::DEFAULT_MODES)
    }

    pub fn with_modes<I, S>(modes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: Arc::new(Mutex::new(LoopState {
                common_modes: modes.into_iter().map(Into::into).collect(),
                valid: true,
                sources: Vec::new(),
            })),
        }
    }

    pub fn invalidate(&self) {
        self.inner.lock().valid = false;
    }

    pub fn is_valid(&self) -> bool {
        self.inner.lock().valid
    }

    /// Modes a tap's source is attached under.
    pub fn modes_for(&self, tap_id: u32) -> Vec<String> {
        self.inner
            .lock()
            .sources
            .iter()
            .filter(|(id, _)| *id == tap_id)
            .map(|(_, mode)| mode.clone())
            .collect()
    }

    /// Number of (source, mode) attachments.
    pub fn source_count(&self) -> usize {
        self.inner.lock().sources.len()
    }

    fn add_source(&self, tap_id: u32) -> bool {
        let mut state = self.inner.lock();
        if state.common_modes.is_empty() {
            return false;
        }
        let modes = state.common_modes.clone();
        state
            .sources
            .extend(modes.into_iter().map(|mode| (tap_id, mode)));
        true
    }

    fn remove_source(&self, tap_id: u32) {
        self.inner.lock().sources.retain(|(id, _)| *id != tap_id);
    }
}

impl Default for SimLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SharedProvider;
    use crate::{DelegateAdapter, ProcessTarget, Tap, TapManager};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const LEFT_DOWN: RawEventType = EventCategory::LeftMouseDown as RawEventType;
    const KEY_UP: RawEventType = EventCategory::KeyUp as RawEventType;

    /// Provider that appends `mark` to the event's x coordinate digits.
    fn marking(mark: f64) -> SharedProvider<SimulatedSystem> {
        DelegateAdapter::<SimulatedSystem>::new()
            .on(EventCategory::LeftMouseDown, move |_tap, event, _proxy| {
                Disposition::Replace(SimEvent::at(event.serial, event.x * 10.0 + mark, event.y))
            })
            .into_shared()
    }

    fn session_tap(
        manager: &TapManager<SimulatedSystem>,
        run_loop: &SimLoop,
        before_others: bool,
        mark: f64,
    ) -> Arc<Tap<SimulatedSystem>> {
        let tap = manager
            .create_by_placement(
                TapPlacement::Session,
                EventMask::from_categories([EventCategory::LeftMouseDown]),
                before_others,
                false,
                run_loop,
                Some(marking(mark)),
            )
            .unwrap();
        tap.enable().unwrap();
        tap
    }

    #[test]
    fn test_pipeline_order() {
        let manager = TapManager::new(SimulatedSystem::new());
        let run_loop = SimLoop::new();
        let _first = session_tap(&manager, &run_loop, false, 1.0);
        let _second = session_tap(&manager, &run_loop, false, 2.0);
        let _head = session_tap(&manager, &run_loop, true, 3.0);
        let hid = manager
            .create_by_placement(
                TapPlacement::Hid,
                EventMask::from_categories([EventCategory::LeftMouseDown]),
                false,
                false,
                &run_loop,
                Some(marking(4.0)),
            )
            .unwrap();
        hid.enable().unwrap();

        // HID first, then the head-inserted session tap, then the rest in
        // creation order.
        let outcome = manager.backend().post(LEFT_DOWN, SimEvent::new(1));
        assert_eq!(outcome.event().map(|e| e.x), Some(4312.0));
    }

    #[test]
    fn test_disabled_tap_is_skipped() {
        let manager = TapManager::new(SimulatedSystem::new());
        let run_loop = SimLoop::new();
        let tap = session_tap(&manager, &run_loop, true, 1.0);
        tap.disable().unwrap();

        let outcome = manager.backend().post(LEFT_DOWN, SimEvent::new(1));
        assert_eq!(outcome, PostOutcome::Delivered(SimEvent::new(1)));
    }

    #[test]
    fn test_passive_process_tap_observes_only() {
        let manager = TapManager::new(SimulatedSystem::new());
        let run_loop = SimLoop::new();
        let observed = Arc::new(AtomicUsize::new(0));
        let key_ups = Arc::clone(&observed);
        let delegate: SharedProvider<SimulatedSystem> = DelegateAdapter::<SimulatedSystem>::new()
            .on(EventCategory::KeyUp, move |_tap, _event, _proxy| {
                key_ups.fetch_add(1, Ordering::SeqCst);
                Disposition::Drop
            })
            .into_shared();
        let mask = EventMask::from_categories([EventCategory::LeftMouseDown, EventCategory::KeyUp]);
        let tap = manager
            .create_by_process(
                ProcessTarget::Current,
                mask,
                false,
                true,
                &run_loop,
                Some(delegate),
            )
            .unwrap();
        tap.enable().unwrap();

        // The dispatcher reports the handler's result; the OS ignores it.
        let proxy = SimProxy { tap_id: tap.id() };
        let click = SimEvent::new(0);
        let dispatch = crate::dispatch::<SimulatedSystem>;
        assert_eq!(dispatch(&tap, LEFT_DOWN, &click, proxy), Disposition::Continue);
        assert_eq!(dispatch(&tap, KEY_UP, &click, proxy), Disposition::Drop);
        assert_eq!(observed.load(Ordering::SeqCst), 1);
        observed.store(0, Ordering::SeqCst);

        let current = manager.backend().current_process().unwrap();
        let outcome = manager.backend().post_to(current, KEY_UP, SimEvent::key(1, 12));
        assert_eq!(outcome, PostOutcome::Delivered(SimEvent::key(1, 12)));
        assert_eq!(observed.load(Ordering::SeqCst), 1);

        // Global posts do not reach process taps.
        manager.backend().post(KEY_UP, SimEvent::key(2, 12));
        assert_eq!(observed.load(Ordering::SeqCst), 1);

        // Neither do posts to other processes.
        let other = ProcessSerialNumber::new(0, 0x2002);
        manager.backend().register_process(other, 4242);
        manager.backend().post_to(other, KEY_UP, SimEvent::key(3, 12));
        assert_eq!(observed.load(Ordering::SeqCst), 1);

        let info = manager.enumerator().list().unwrap();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].options, TAP_OPTION_LISTEN_ONLY);
        assert_eq!(info[0].process_being_tapped, manager.backend().pid);
    }

    #[test]
    fn test_foreign_taps_are_listed_not_called() {
        let system = SimulatedSystem::new();
        let id = system.add_foreign_tap(TapInformation {
            tap_point: TapPlacement::Hid.raw(),
            events_of_interest: EventMask::all_known().bits(),
            tapping_process: 1,
            enabled: true,
            ..TapInformation::default()
        });

        let manager = TapManager::new(system);
        let enumerator = manager.enumerator();
        assert_eq!(enumerator.count().unwrap(), 1);
        assert_eq!(enumerator.list().unwrap()[0].event_tap_id, id);
        assert!(enumerator
            .list_with_transform(|_| None::<u32>)
            .unwrap()
            .is_empty());

        let outcome = manager.backend().post(LEFT_DOWN, SimEvent::new(1));
        assert_eq!(outcome, PostOutcome::Delivered(SimEvent::new(1)));

        assert!(manager.backend().remove_foreign_tap(id));
        assert_eq!(enumerator.count().unwrap(), 0);
    }

    #[test]
    fn test_ids_are_unique() {
        let manager = TapManager::new(SimulatedSystem::new());
        let run_loop = SimLoop::new();
        let a = session_tap(&manager, &run_loop, true, 1.0);
        let b = session_tap(&manager, &run_loop, true, 2.0);
        assert_ne!(a.id(), b.id());

        let ids = manager
            .enumerator()
            .list_with_transform(|info| Some(info.event_tap_id))
            .unwrap();
        assert!(ids.contains(&a.id()) && ids.contains(&b.id()));
    }
}
