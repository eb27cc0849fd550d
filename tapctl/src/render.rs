//! Text and JSON output.

#![cfg_attr(not(target_os = "macos"), allow(dead_code))]

use eventtap_core::{EventCategory, RawEventType, TapInformation};
use serde_json::Value;
use std::fmt::Write;

/// All records as a JSON array of objects keyed by the OS field names.
pub fn taps_json(taps: &[TapInformation]) -> serde_json::Result<String> {
    let records = taps.iter().map(|info| Value::Object(info.to_map())).collect();
    serde_json::to_string_pretty(&Value::Array(records))
}

fn placement_name(info: &TapInformation) -> String {
    match info.placement() {
        Some(placement) => placement.to_string(),
        None => format!("#{}", info.tap_point),
    }
}

pub fn tap_table(taps: &[TapInformation]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>6}  {:<17}  {:<7}  {:<7}  {:>7}  {:>7}  {:>9}  EVENTS",
        "ID", "PLACEMENT", "MODE", "ENABLED", "PID", "TARGET", "AVG(us)"
    );
    for info in taps {
        let _ = writeln!(
            out,
            "{:>6}  {:<17}  {:<7}  {:<7}  {:>7}  {:>7}  {:>9.1}  {}",
            info.event_tap_id,
            placement_name(info),
            if info.is_passive() { "listen" } else { "filter" },
            if info.enabled { "yes" } else { "no" },
            info.tapping_process,
            info.process_being_tapped,
            info.avg_usec_latency,
            info.events(),
        );
    }
    let _ = writeln!(out, "{} tap(s)", taps.len());
    out
}

/// One line per observed event.
pub fn event_summary(
    event_type: RawEventType,
    location: (f64, f64),
    keycode: Option<u16>,
) -> String {
    let name = match EventCategory::from_raw(event_type) {
        Some(category) => category.name().to_string(),
        None => format!("unknown({event_type})"),
    };
    match keycode {
        Some(keycode) => format!("{name:<20} keycode={keycode}"),
        None => format!("{name:<20} x={:.1} y={:.1}", location.0, location.1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventtap_core::{EventMask, TapPlacement, TAP_OPTION_LISTEN_ONLY};

    fn sample() -> TapInformation {
        TapInformation {
            event_tap_id: 12,
            tap_point: TapPlacement::Session.raw(),
            options: TAP_OPTION_LISTEN_ONLY,
            events_of_interest: EventMask::from_categories([EventCategory::KeyDown]).bits(),
            tapping_process: 300,
            enabled: true,
            ..TapInformation::default()
        }
    }

    #[test]
    fn test_table() {
        let table = tap_table(&[sample()]);
        let row = table.lines().nth(1).unwrap();
        assert!(row.contains("session"));
        assert!(row.contains("listen"));
        assert!(row.contains(&EventMask::from_categories([EventCategory::KeyDown]).to_string()));
        assert!(table.ends_with("1 tap(s)\n"));
    }

    #[test]
    fn test_unknown_placement_shown_raw() {
        let info = TapInformation {
            tap_point: 9,
            ..sample()
        };
        assert_eq!(placement_name(&info), "#9");
    }

    #[test]
    fn test_json_uses_os_field_names() {
        let json = taps_json(&[sample()]).unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["eventTapID"], 12);
        assert_eq!(parsed[0]["tappingProcess"], 300);
        assert_eq!(taps_json(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_event_summary() {
        let key = event_summary(EventCategory::KeyDown.raw(), (0.0, 0.0), Some(12));
        assert!(key.starts_with(EventCategory::KeyDown.name()));
        assert!(key.ends_with("keycode=12"));

        let click = event_summary(EventCategory::LeftMouseDown.raw(), (10.0, 20.5), None);
        assert!(click.ends_with("x=10.0 y=20.5"));

        assert!(event_summary(40, (0.0, 0.0), None).starts_with("unknown(40)"));
    }
}
