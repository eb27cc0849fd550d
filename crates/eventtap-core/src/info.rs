//! Descriptive record of an installed tap, as the OS reports it.

use crate::{EventMask, TapPlacement};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `options` value of a listen-only tap.
pub const TAP_OPTION_LISTEN_ONLY: u32 = 1;

/// One installed tap. Field names in serialized form match the OS
/// structure; fields missing on input read as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TapInformation {
    #[serde(rename = "eventTapID")]
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

impl TapInformation {
    pub fn placement(&self) -> Option<TapPlacement> {
        TapPlacement::from_raw(self.tap_point)
    }

    pub fn is_passive(&self) -> bool {
        self.options == TAP_OPTION_LISTEN_ONLY
    }

    pub fn events(&self) -> EventMask {
        EventMask::from_bits(self.events_of_interest)
    }

    /// Key-value form, one entry per field.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Rebuild a record from its key-value form. Absent fields are zero.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(map.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TapInformation {
        TapInformation {
            event_tap_id: 42,
            tap_point: 3,
            options: TAP_OPTION_LISTEN_ONLY,
            events_of_interest: (1 << 1) | (1 << 11),
            tapping_process: 501,
            process_being_tapped: 777,
            enabled: true,
            min_usec_latency: 1.5,
            avg_usec_latency: 2.5,
            max_usec_latency: 10.0,
        }
    }

    #[test]
    fn test_map_uses_os_field_names() {
        let map = sample().to_map();
        assert_eq!(map.get("eventTapID"), Some(&Value::from(42u32)));
        assert_eq!(map.get("tapPoint"), Some(&Value::from(3u32)));
        assert_eq!(map.get("processBeingTapped"), Some(&Value::from(777)));
        assert!(map.contains_key("maxUsecLatency"));
        assert_eq!(map.len(), 10);
    }

    #[test]
    fn test_map_round_trip() {
        let info = sample();
        assert_eq!(TapInformation::from_map(&info.to_map()).unwrap(), info);
    }

    #[test]
    fn test_missing_fields_read_as_zero() {
        let mut map = Map::new();
        map.insert("eventTapID".into(), Value::from(7));
        let info = TapInformation::from_map(&map).unwrap();
        assert_eq!(info.event_tap_id, 7);
        assert_eq!(info.events_of_interest, 0);
        assert!(!info.enabled);

        let empty = TapInformation::from_map(&Map::new()).unwrap();
        assert_eq!(empty, TapInformation::default());
    }

    #[test]
    fn test_accessors() {
        let info = sample();
        assert_eq!(info.placement(), Some(TapPlacement::Process));
        assert!(info.is_passive());
        assert_eq!(info.events().bits(), (1 << 1) | (1 << 11));
    }
}
