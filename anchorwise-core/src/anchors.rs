//! Anchor registry + resolver.
//!
//! An anchor is a named point in the user's day ("Morning Coffee", "After
//! Lunch"). The registry is an ordered list: lookup is a case-insensitive
//! substring scan and the first key contained in the anchor name wins, so
//! "Morning Coffee" must stay ahead of the broader "Morning".

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::time::localize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorTimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl AnchorTimeOfDay {
    pub const fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

/// Time used for anchors no registry key matches: assume afternoon.
pub const DEFAULT_ANCHOR_TIME: AnchorTimeOfDay = AnchorTimeOfDay::new(14, 0);

/// Registry in priority order.
pub const ANCHOR_REGISTRY: &[(&str, AnchorTimeOfDay)] = &[
    ("Morning Coffee", AnchorTimeOfDay::new(8, 0)),
    ("Morning", AnchorTimeOfDay::new(8, 0)),
    ("Start Laptop", AnchorTimeOfDay::new(9, 0)),
    ("Mid-Morning", AnchorTimeOfDay::new(10, 30)),
    ("Before Lunch", AnchorTimeOfDay::new(11, 30)),
    ("Lunch Break", AnchorTimeOfDay::new(12, 30)),
    ("After Lunch", AnchorTimeOfDay::new(13, 30)),
    ("Afternoon", AnchorTimeOfDay::new(14, 0)),
    ("Mid-Afternoon", AnchorTimeOfDay::new(15, 30)),
    ("End of Day", AnchorTimeOfDay::new(17, 0)),
    ("Evening", AnchorTimeOfDay::new(18, 0)),
    ("After Dinner", AnchorTimeOfDay::new(19, 30)),
    ("Before Bed", AnchorTimeOfDay::new(21, 0)),
    ("Night", AnchorTimeOfDay::new(21, 0)),
];

/// First registry entry whose key appears (case-insensitively) in `anchor`.
pub fn lookup_anchor(anchor: &str) -> Option<(&'static str, AnchorTimeOfDay)> {
    let needle = anchor.to_lowercase();
    ANCHOR_REGISTRY
        .iter()
        .find(|(key, _)| needle.contains(&key.to_lowercase()))
        .copied()
}

/// Time of day for an anchor, falling back to [`DEFAULT_ANCHOR_TIME`].
pub fn anchor_time_of_day(anchor: &str) -> AnchorTimeOfDay {
    lookup_anchor(anchor)
        .map(|(_, tod)| tod)
        .unwrap_or(DEFAULT_ANCHOR_TIME)
}

/// Resolve `anchor` on `date` in `tz`: the date at the anchor's hour and
/// minute, seconds and sub-seconds zeroed.
pub fn resolve_anchor_on(anchor: &str, tz: Tz, date: NaiveDate) -> DateTime<Tz> {
    let tod = anchor_time_of_day(anchor);
    localize(tz, date.and_time(tod.to_naive_time()))
}

/// Resolve `anchor` to a concrete timestamp. `base_date` defaults to today in `tz`.
///
/// Never fails: unknown anchors land at 14:00.
pub fn resolve_anchor_timestamp(anchor: &str, tz: Tz, base_date: Option<NaiveDate>) -> DateTime<Tz> {
    let date = base_date.unwrap_or_else(|| Utc::now().with_timezone(&tz).date_naive());
    resolve_anchor_on(anchor, tz, date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::America::Los_Angeles;

    fn feb10() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 10).unwrap()
    }

    #[test]
    fn test_known_anchor() {
        let dt = resolve_anchor_timestamp("Morning Coffee", Los_Angeles, Some(feb10()));
        assert_eq!((dt.hour(), dt.minute()), (8, 0));
        assert_eq!(dt.date_naive(), feb10());
    }

    #[test]
    fn test_after_lunch() {
        let dt = resolve_anchor_timestamp("After Lunch", Los_Angeles, Some(feb10()));
        assert_eq!((dt.hour(), dt.minute()), (13, 30));
    }

    #[test]
    fn test_unknown_anchor_defaults_to_afternoon() {
        let dt = resolve_anchor_timestamp("Random Nonsense", Los_Angeles, Some(feb10()));
        assert_eq!(dt.to_rfc3339(), "2026-02-10T14:00:00-08:00");
    }

    #[test]
    fn test_case_insensitive_matching() {
        let dt = resolve_anchor_timestamp("morning coffee time", Los_Angeles, Some(feb10()));
        assert_eq!(dt.hour(), 8);
    }

    #[test]
    fn test_first_match_wins_not_most_specific() {
        // "Mid-Morning" contains "Morning", which sits earlier in the registry.
        assert_eq!(lookup_anchor("Mid-Morning").unwrap().0, "Morning");
        // "Mid-Afternoon" contains "Afternoon" (14:00) ahead of its own key.
        assert_eq!(anchor_time_of_day("Mid-Afternoon"), AnchorTimeOfDay::new(14, 0));
        // "After Lunch" is checked before "Afternoon".
        assert_eq!(anchor_time_of_day("after lunch walk"), AnchorTimeOfDay::new(13, 30));
    }

    #[test]
    fn test_seconds_zeroed() {
        let dt = resolve_anchor_on("Evening", Los_Angeles, feb10());
        assert_eq!(dt.second(), 0);
        assert_eq!(dt.nanosecond(), 0);
        assert_eq!(dt.hour(), 18);
    }

    #[test]
    fn test_default_base_date_is_today() {
        let dt = resolve_anchor_timestamp("Night", Los_Angeles, None);
        let today = Utc::now().with_timezone(&Los_Angeles).date_naive();
        assert_eq!(dt.date_naive(), today);
        assert_eq!(dt.hour(), 21);
    }
}
