//! Event categories and category masks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw event type tag as delivered by the OS.
///
/// Kept as a bare integer so that tags unknown to this crate still reach
/// the unknown-category handler.
pub type RawEventType = u32;

/// Known event categories.
///
/// Discriminants match the values the OS reports, so `category as u32`
/// is the raw tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u32)]
pub enum EventCategory {
    Null = 0,
    LeftMouseDown = 1,
    LeftMouseUp = 2,
    RightMouseDown = 3,
    RightMouseUp = 4,
    MouseMoved = 5,
    LeftMouseDragged = 6,
    RightMouseDragged = 7,
    KeyDown = 10,
    KeyUp = 11,
    FlagsChanged = 12,
    ScrollWheel = 22,
    TabletPointer = 23,
    TabletProximity = 24,
    OtherMouseDown = 25,
    OtherMouseUp = 26,
    OtherMouseDragged = 27,
    /// The OS disabled the tap because a callback took too long.
    TapDisabledByTimeout = 0xFFFF_FFFE,
    /// The OS disabled the tap in response to user input.
    TapDisabledByUserInput = 0xFFFF_FFFF,
}

impl EventCategory {
    /// Every known category, in raw-value order.
    pub const ALL: [EventCategory; 19] = [
        EventCategory::Null,
        EventCategory::LeftMouseDown,
        EventCategory::LeftMouseUp,
        EventCategory::RightMouseDown,
        EventCategory::RightMouseUp,
        EventCategory::MouseMoved,
        EventCategory::LeftMouseDragged,
        EventCategory::RightMouseDragged,
        EventCategory::KeyDown,
        EventCategory::KeyUp,
        EventCategory::FlagsChanged,
        EventCategory::ScrollWheel,
        EventCategory::TabletPointer,
        EventCategory::TabletProximity,
        EventCategory::OtherMouseDown,
        EventCategory::OtherMouseUp,
        EventCategory::OtherMouseDragged,
        EventCategory::TapDisabledByTimeout,
        EventCategory::TapDisabledByUserInput,
    ];

    /// Resolve a raw tag, `None` for tags this crate does not know.
    pub fn from_raw(raw: RawEventType) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.raw() == raw)
    }

    pub fn raw(self) -> RawEventType {
        self as u32
    }

    /// Bit this category occupies in an [`EventMask`].
    ///
    /// The tap-disabled notifications cannot be requested; they are always
    /// delivered.
    pub fn mask_bit(self) -> Option<u64> {
        let raw = self.raw();
        (raw < 64).then(|| 1u64 << raw)
    }

    /// Categories the OS only grants to trusted (accessibility-enabled)
    /// processes.
    pub fn requires_privilege(self) -> bool {
        matches!(
            self,
            EventCategory::KeyDown | EventCategory::KeyUp | EventCategory::FlagsChanged
        )
    }

    pub fn is_tap_disabled(self) -> bool {
        matches!(
            self,
            EventCategory::TapDisabledByTimeout | EventCategory::TapDisabledByUserInput
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            EventCategory::Null => "null",
            EventCategory::LeftMouseDown => "left_mouse_down",
            EventCategory::LeftMouseUp => "left_mouse_up",
            EventCategory::RightMouseDown => "right_mouse_down",
            EventCategory::RightMouseUp => "right_mouse_up",
            EventCategory::MouseMoved => "mouse_moved",
            EventCategory::LeftMouseDragged => "left_mouse_dragged",
            EventCategory::RightMouseDragged => "right_mouse_dragged",
            EventCategory::KeyDown => "key_down",
            EventCategory::KeyUp => "key_up",
            EventCategory::FlagsChanged => "flags_changed",
            EventCategory::ScrollWheel => "scroll_wheel",
            EventCategory::TabletPointer => "tablet_pointer",
            EventCategory::TabletProximity => "tablet_proximity",
            EventCategory::OtherMouseDown => "other_mouse_down",
            EventCategory::OtherMouseUp => "other_mouse_up",
            EventCategory::OtherMouseDragged => "other_mouse_dragged",
            EventCategory::TapDisabledByTimeout => "tap_disabled_by_timeout",
            EventCategory::TapDisabledByUserInput => "tap_disabled_by_user_input",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of event categories, laid out as the OS's 64-bit event mask.
///
/// Serialized as a list of category names so profiles stay readable. Bits
/// no category covers are written as their bit number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EventMask(u64);

impl EventMask {
    pub const EMPTY: EventMask = EventMask(0);

    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Every maskable category this crate knows about.
    pub fn all_known() -> Self {
        Self::from_categories(EventCategory::ALL)
    }

    /// Build a mask from categories. Non-maskable categories are ignored.
    pub fn from_categories<I>(categories: I) -> Self
    where
        I: IntoIterator<Item = EventCategory>,
    {
        let mut mask = Self::EMPTY;
        for category in categories {
            mask.insert(category);
        }
        mask
    }

    pub fn insert(&mut self, category: EventCategory) {
        if let Some(bit) = category.mask_bit() {
            self.0 |= bit;
        }
    }

    pub fn remove(&mut self, category: EventCategory) {
        if let Some(bit) = category.mask_bit() {
            self.0 &= !bit;
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, category: EventCategory) -> Self {
        self.insert(category);
        self
    }

    pub fn contains(self, category: EventCategory) -> bool {
        category.mask_bit().is_some_and(|bit| self.0 & bit != 0)
    }

    /// Whether an event with this raw tag is selected by the mask.
    pub fn contains_raw(self, raw: RawEventType) -> bool {
        raw < 64 && self.0 & (1u64 << raw) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_subset_of(self, other: EventMask) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn intersection(self, other: EventMask) -> EventMask {
        EventMask(self.0 & other.0)
    }

    pub fn difference(self, other: EventMask) -> EventMask {
        EventMask(self.0 & !other.0)
    }

    /// Known categories present in the mask.
    pub fn categories(self) -> impl Iterator<Item = EventCategory> {
        EventCategory::ALL
            .into_iter()
            .filter(move |c| self.contains(*c))
    }
}

impl FromIterator<EventCategory> for EventMask {
    fn from_iter<I: IntoIterator<Item = EventCategory>>(iter: I) -> Self {
        Self::from_categories(iter)
    }
}

impl fmt::Display for EventMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.categories().map(EventCategory::name).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// One serialized mask entry.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum MaskEntry {
    Name(EventCategory),
    Raw(u32),
}

impl Serialize for EventMask {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let unknown = self.difference(Self::all_known()).bits();
        let raw = (0..64u32)
            .filter(|bit| unknown & (1u64 << bit) != 0)
            .map(MaskEntry::Raw);
        serializer.collect_seq(self.categories().map(MaskEntry::Name).chain(raw))
    }
}

impl<'de> Deserialize<'de> for EventMask {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut mask = Self::EMPTY;
        for entry in Vec::<MaskEntry>::deserialize(deserializer)? {
            match entry {
                MaskEntry::Name(category) => mask.insert(category),
                MaskEntry::Raw(bit) if bit < 64 => mask.0 |= 1u64 << bit,
                MaskEntry::Raw(bit) => {
                    return Err(serde::de::Error::custom(format!(
                        "event mask bit {bit} is out of range"
                    )))
                }
            }
        }
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_round_trip() {
        for category in EventCategory::ALL {
            assert_eq!(EventCategory::from_raw(category.raw()), Some(category));
        }
        assert_eq!(EventCategory::from_raw(9), None);
        assert_eq!(EventCategory::from_raw(29), None);
    }

    #[test]
    fn test_tap_disabled_is_not_maskable() {
        let mask = EventMask::EMPTY.with(EventCategory::TapDisabledByTimeout);
        assert!(mask.is_empty());
        assert!(!mask.contains(EventCategory::TapDisabledByUserInput));
    }

    #[test]
    fn test_mask_bits_match_os_layout() {
        let mask = EventMask::from_categories([EventCategory::LeftMouseDown, EventCategory::KeyUp]);
        assert_eq!(mask.bits(), (1 << 1) | (1 << 11));
        assert!(mask.contains_raw(11));
        assert!(!mask.contains_raw(10));
        assert!(!mask.contains_raw(0xFFFF_FFFE));
    }

    #[test]
    fn test_subset() {
        let small = EventMask::EMPTY.with(EventCategory::KeyUp);
        let big = small.with(EventCategory::ScrollWheel);
        assert!(small.is_subset_of(big));
        assert!(!big.is_subset_of(small));
        assert!(EventMask::EMPTY.is_subset_of(small));
        assert_eq!(big.difference(small), EventMask::EMPTY.with(EventCategory::ScrollWheel));
    }

    #[test]
    fn test_mask_serde_uses_names() {
        let mask = EventMask::from_categories([EventCategory::KeyUp, EventCategory::LeftMouseDown]);
        let json = serde_json::to_string(&mask).unwrap();
        assert_eq!(json, r#"["left_mouse_down","key_up"]"#);
        let back: EventMask = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mask);
    }

    #[test]
    fn test_mask_serde_keeps_unknown_bits() {
        let mask = EventMask::from_bits((1 << 1) | (1 << 9));
        let json = serde_json::to_string(&mask).unwrap();
        assert_eq!(json, r#"["left_mouse_down",9]"#);
        let back: EventMask = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mask);

        assert!(serde_json::from_str::<EventMask>("[64]").is_err());
        assert!(serde_json::from_str::<EventMask>(r#"["not_a_category"]"#).is_err());
    }
}
