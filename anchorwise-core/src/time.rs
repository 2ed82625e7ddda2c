//! Time utilities: timezone parsing and tolerant timestamp parsing.
//!
//! Timestamps arrive as strings from the task store and calendar adapters, in
//! whatever shape the upstream produced. Everything here degrades to `None`
//! instead of failing so callers can skip a bad record and keep going.

use anyhow::Result;
use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Parse an IANA timezone like "America/Los_Angeles".
pub fn parse_timezone(tz: &str) -> Result<Tz> {
    tz.trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))
}

/// A point in time as reported by an external record.
///
/// Calendar APIs and hosted databases hand back both offset-carrying and
/// floating (naive) values; floating ones only become concrete once a user
/// timezone is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum EventTime {
    Zoned(DateTime<FixedOffset>),
    Floating(NaiveDateTime),
}

impl EventTime {
    /// Interpret this time in `tz`. Floating values are taken as wall-clock time in `tz`.
    pub fn in_zone(&self, tz: Tz) -> DateTime<Tz> {
        match self {
            EventTime::Zoned(dt) => dt.with_timezone(&tz),
            EventTime::Floating(ndt) => localize(tz, *ndt),
        }
    }

    pub fn to_utc(&self, tz: Tz) -> DateTime<Utc> {
        self.in_zone(tz).with_timezone(&Utc)
    }

    /// `None` when the result falls outside chrono's representable range.
    pub fn plus_minutes(self, minutes: i64) -> Option<Self> {
        let delta = Duration::try_minutes(minutes)?;
        match self {
            EventTime::Zoned(dt) => dt.checked_add_signed(delta).map(EventTime::Zoned),
            EventTime::Floating(ndt) => ndt.checked_add_signed(delta).map(EventTime::Floating),
        }
    }
}

impl From<DateTime<Tz>> for EventTime {
    fn from(dt: DateTime<Tz>) -> Self {
        EventTime::Zoned(dt.fixed_offset())
    }
}

impl From<DateTime<Utc>> for EventTime {
    fn from(dt: DateTime<Utc>) -> Self {
        EventTime::Zoned(dt.fixed_offset())
    }
}

/// Parse a timestamp string into an [`EventTime`].
///
/// Accepts RFC 3339 (`Z` or numeric offset), the space-separated variant,
/// naive date-times (with or without seconds / fractions) and bare dates
/// (midnight, floating).
pub fn parse_timestamp(raw: &str) -> Option<EventTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(EventTime::Zoned(dt));
    }

    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(EventTime::Zoned(dt));
        }
    }

    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(EventTime::Floating(ndt));
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| EventTime::Floating(d.and_time(NaiveTime::MIN)))
}

/// Place a wall-clock time in `tz`, resolving DST edges instead of failing.
///
/// Ambiguous times (fall back) take the earlier instant; times inside a
/// spring-forward gap are pushed forward by the gap.
pub fn localize(tz: Tz, ndt: NaiveDateTime) -> DateTime<Tz> {
    if let Some(dt) = tz.from_local_datetime(&ndt).earliest() {
        return dt;
    }
    tz.from_local_datetime(&(ndt + Duration::hours(1)))
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&ndt))
}

/// Format as `YYYY-MM-DD HH:MM`, the shape reschedule audit records use.
pub fn format_minute<Z: TimeZone>(dt: &DateTime<Z>) -> String
where
    Z::Offset: std::fmt::Display,
{
    dt.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_timezone() {
        let tz = parse_timezone("America/Los_Angeles").unwrap();
        assert_eq!(tz, chrono_tz::America::Los_Angeles);
        assert!(parse_timezone("Mars/Olympus_Mons").is_err());
    }

    #[test]
    fn test_parse_zulu_and_offset() {
        let z = parse_timestamp("2026-02-10T16:00:00Z").unwrap();
        let o = parse_timestamp("2026-02-10T08:00:00-08:00").unwrap();
        let tz = chrono_tz::America::Los_Angeles;
        assert_eq!(z.to_utc(tz), o.to_utc(tz));
    }

    #[test]
    fn test_parse_postgres_style() {
        let t = parse_timestamp("2026-02-10 16:00:00.123456+00:00").unwrap();
        assert!(matches!(t, EventTime::Zoned(_)));
    }

    #[test]
    fn test_naive_is_floating_and_localized() {
        let t = parse_timestamp("2026-02-10T08:00:00").unwrap();
        assert!(matches!(t, EventTime::Floating(_)));
        let local = t.in_zone(chrono_tz::America::Chicago);
        assert_eq!(local.hour(), 8);
        assert_eq!(local.to_rfc3339(), "2026-02-10T08:00:00-06:00");
    }

    #[test]
    fn test_bare_date_is_midnight() {
        let t = parse_timestamp("2026-02-10").unwrap();
        assert_eq!(
            t,
            EventTime::Floating(NaiveDate::from_ymd_opt(2026, 2, 10).unwrap().and_time(NaiveTime::MIN))
        );
    }

    #[test]
    fn test_garbage_is_none() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("tomorrow-ish").is_none());
        assert!(parse_timestamp("2026-13-45T99:00:00Z").is_none());
    }

    #[test]
    fn test_plus_minutes_out_of_range_is_none() {
        let t = parse_timestamp("2026-02-10T08:00:00Z").unwrap();
        assert!(t.plus_minutes(1_000_000_000_000).is_none());
        assert!(t.plus_minutes(i64::MAX).is_none());
        let f = parse_timestamp("2026-02-10 08:00").unwrap();
        assert!(f.plus_minutes(-1_000_000_000_000).is_none());
        assert_eq!(
            f.plus_minutes(30),
            Some(EventTime::Floating(NaiveDate::from_ymd_opt(2026, 2, 10).unwrap().and_hms_opt(8, 30, 0).unwrap()))
        );
    }

    #[test]
    fn test_localize_spring_forward_gap() {
        // 2026-03-08 02:30 does not exist in Los Angeles.
        let tz = chrono_tz::America::Los_Angeles;
        let ndt = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap().and_hms_opt(2, 30, 0).unwrap();
        let dt = localize(tz, ndt);
        assert_eq!(dt.hour(), 3);
    }
}
