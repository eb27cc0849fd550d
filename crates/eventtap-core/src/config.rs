//! Tap configuration: where a hook goes and what it asks for.

use crate::{EventMask, TapError, TapResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where in the event pipeline a tap is inserted.
///
/// Raw values match what the OS reports as the tap point of an installed
/// tap; [`TapPlacement::Process`] is reported for process-targeted taps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u32)]
pub enum TapPlacement {
    /// Where HID system events enter the window server (global, pre-session).
    Hid = 0,
    /// Where HID and remote-control events enter a login session.
    Session = 1,
    /// Where session events have been annotated to flow to an application.
    AnnotatedSession = 2,
    /// Targeted at a single process.
    Process = 3,
}

impl TapPlacement {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(TapPlacement::Hid),
            1 => Some(TapPlacement::Session),
            2 => Some(TapPlacement::AnnotatedSession),
            3 => Some(TapPlacement::Process),
            _ => None,
        }
    }

    pub fn raw(self) -> u32 {
        self as u32
    }

    /// Global placements sit before any per-session processing.
    pub fn is_pre_session(self) -> bool {
        self == TapPlacement::Hid
    }
}

impl fmt::Display for TapPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TapPlacement::Hid => "hid",
            TapPlacement::Session => "session",
            TapPlacement::AnnotatedSession => "annotated-session",
            TapPlacement::Process => "process",
        };
        f.write_str(name)
    }
}

/// Opaque identifier of a process as the OS addresses it for taps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessSerialNumber {
    pub high: u32,
    pub low: u32,
}

impl ProcessSerialNumber {
    pub const fn new(high: u32, low: u32) -> Self {
        Self { high, low }
    }

    /// The all-zero value the OS uses for "no process".
    pub fn is_none(&self) -> bool {
        self.high == 0 && self.low == 0
    }
}

impl fmt::Display for ProcessSerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.high, self.low)
    }
}

/// Process selector for process-targeted taps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessTarget {
    /// The calling process, resolved through the backend.
    Current,
    Serial(ProcessSerialNumber),
}

impl From<ProcessSerialNumber> for ProcessTarget {
    fn from(psn: ProcessSerialNumber) -> Self {
        ProcessTarget::Serial(psn)
    }
}

fn default_before_others() -> bool {
    true
}

/// Caller-supplied description of a tap. Immutable once a tap exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapConfiguration {
    pub placement: TapPlacement,
    #[serde(rename = "events")]
    pub requested_mask: EventMask,
    /// Insert ahead of existing taps at the same placement.
    #[serde(default = "default_before_others")]
    pub insert_before_others: bool,
    /// Listen-only taps cannot alter or drop events.
    #[serde(default)]
    pub passive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_process: Option<ProcessSerialNumber>,
}

impl TapConfiguration {
    /// A tap at one of the global placements.
    pub fn global(placement: TapPlacement, requested_mask: EventMask) -> Self {
        Self {
            placement,
            requested_mask,
            insert_before_others: true,
            passive: false,
            target_process: None,
        }
    }

    /// A tap targeted at a single process.
    pub fn for_process(process: ProcessSerialNumber, requested_mask: EventMask) -> Self {
        Self {
            placement: TapPlacement::Process,
            requested_mask,
            insert_before_others: true,
            passive: false,
            target_process: Some(process),
        }
    }

    pub fn before_others(mut self, before_others: bool) -> Self {
        self.insert_before_others = before_others;
        self
    }

    pub fn passive(mut self, passive: bool) -> Self {
        self.passive = passive;
        self
    }

    /// Check the invariants a tap relies on.
    ///
    /// The mask must be non-empty, and the placement is `process` exactly
    /// when a target process is present.
    pub fn validate(&self) -> TapResult<()> {
        if self.requested_mask.is_empty() {
            return Err(TapError::EmptyMask);
        }
        match (self.placement, self.target_process) {
            (TapPlacement::Process, None) => Err(TapError::InvalidConfiguration(
                "process placement requires a target process".into(),
            )),
            (TapPlacement::Process, Some(psn)) if psn.is_none() => Err(TapError::InvalidProcess(
                "target process serial number is zero".into(),
            )),
            (placement, Some(psn)) if placement != TapPlacement::Process => {
                Err(TapError::InvalidConfiguration(format!(
                    "target process {psn} given for global placement {placement}"
                )))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventCategory;

    fn keys() -> EventMask {
        EventMask::EMPTY.with(EventCategory::KeyDown)
    }

    #[test]
    fn test_global_config_is_valid() {
        let config = TapConfiguration::global(TapPlacement::Session, keys());
        assert!(config.validate().is_ok());
        assert!(config.insert_before_others);
        assert!(!config.passive);
    }

    #[test]
    fn test_empty_mask_rejected() {
        let config = TapConfiguration::global(TapPlacement::Hid, EventMask::EMPTY);
        assert!(matches!(config.validate(), Err(TapError::EmptyMask)));
    }

    #[test]
    fn test_placement_target_mismatch_rejected() {
        let mut config = TapConfiguration::global(TapPlacement::Process, keys());
        assert!(matches!(config.validate(), Err(TapError::InvalidConfiguration(_))));

        config.placement = TapPlacement::Hid;
        config.target_process = Some(ProcessSerialNumber::new(0, 42));
        assert!(matches!(config.validate(), Err(TapError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_zero_process_rejected() {
        let config = TapConfiguration::for_process(ProcessSerialNumber::default(), keys());
        assert!(matches!(config.validate(), Err(TapError::InvalidProcess(_))));
    }

    #[test]
    fn test_yaml_defaults() {
        let yaml = "placement: annotated-session\nevents: [key_down, scroll_wheel]\n";
        let config: TapConfiguration = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.placement, TapPlacement::AnnotatedSession);
        assert!(config.insert_before_others);
        assert!(!config.passive);
        assert!(config.requested_mask.contains(EventCategory::ScrollWheel));
        assert_eq!(config.target_process, None);
    }
}
