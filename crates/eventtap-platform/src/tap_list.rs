//! Layout of one entry in the OS tap list.

use eventtap_core::TapInformation;

/// One record as filled in by `CGGetEventTapList`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct RawTapInformation {
    pub event_tap_id: u32,
    pub tap_point: u32,
    pub options: u32,
    pub events_of_interest: u64,
    pub tapping_process: i32,
    pub process_being_tapped: i32,
    pub enabled: bool,
    pub min_usec_latency: f32,
    pub avg_usec_latency: f32,
    pub max_usec_latency: f32,
}

impl From<&RawTapInformation> for TapInformation {
    fn from(raw: &RawTapInformation) -> Self {
        TapInformation {
            event_tap_id: raw.event_tap_id,
            tap_point: raw.tap_point,
            options: raw.options,
            events_of_interest: raw.events_of_interest,
            tapping_process: raw.tapping_process,
            process_being_tapped: raw.process_being_tapped,
            enabled: raw.enabled,
            min_usec_latency: raw.min_usec_latency,
            avg_usec_latency: raw.avg_usec_latency,
            max_usec_latency: raw.max_usec_latency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventtap_core::{EventCategory, TapPlacement, TAP_OPTION_LISTEN_ONLY};

    #[test]
    fn test_layout_matches_os_struct() {
        // u64 mask forces 8-byte alignment after the three u32 fields.
        assert_eq!(std::mem::offset_of!(RawTapInformation, events_of_interest), 16);
        assert_eq!(std::mem::offset_of!(RawTapInformation, enabled), 32);
        assert_eq!(std::mem::size_of::<RawTapInformation>(), 48);
    }

    #[test]
    fn test_conversion() {
        let raw = RawTapInformation {
            event_tap_id: 5,
            tap_point: TapPlacement::AnnotatedSession.raw(),
            options: TAP_OPTION_LISTEN_ONLY,
            events_of_interest: 1 << EventCategory::KeyDown.raw(),
            tapping_process: 88,
            enabled: true,
            ..RawTapInformation::default()
        };
        let info = TapInformation::from(&raw);
        assert_eq!(info.event_tap_id, 5);
        assert_eq!(info.placement(), Some(TapPlacement::AnnotatedSession));
        assert!(info.is_passive());
        assert!(info.events().contains(EventCategory::KeyDown));
        assert_eq!(info.process_being_tapped, 0);
        assert!(info.enabled);
    }
}
