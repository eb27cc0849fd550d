//! System-wide tap listing.

use crate::{HookBackend, TapInformation, TapResult};
use std::sync::Arc;

/// Read-only query over every tap installed on the system, including taps
/// owned by other processes.
///
/// Each call is a fresh OS query; nothing is cached.
pub struct SystemTapEnumerator<B: HookBackend> {
    backend: Arc<B>,
}

impl<B: HookBackend> SystemTapEnumerator<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub fn count(&self) -> TapResult<u32> {
        self.backend.system_tap_count()
    }

    /// Every tap record as reported by the OS.
    pub fn list(&self) -> TapResult<Vec<TapInformation>> {
        self.backend.system_taps()
    }

    /// Apply `transform` to every tap record, keeping the `Some` results.
    ///
    /// ```ignore
    /// let ids = enumerator.list_with_transform(|info| Some(info.event_tap_id))?;
    /// ```
    pub fn list_with_transform<T, F>(&self, mut transform: F) -> TapResult<Vec<T>>
    where
        F: FnMut(&TapInformation) -> Option<T>,
    {
        Ok(self
            .backend
            .system_taps()?
            .iter()
            .filter_map(|info| transform(info))
            .collect())
    }
}
