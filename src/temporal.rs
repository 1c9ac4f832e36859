//! Timestamp normalization and report windows.
//!
//! Stored process times are a mix of zoned values, zone-naive values, and
//! legacy text in several formats. Nothing here guesses a zone for a value
//! that does not carry one: normalized stamps keep their zone-ness, and
//! comparisons against window boundaries are deliberately partial. The one
//! place a zone is assumed is [`shop_wall_time`], which treats naive values
//! as shop-local wall time for daily bucketing.

use chrono::{
    DateTime, Datelike, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc,
};
use std::cmp::Ordering;

use crate::product::RawTimestamp;

/// A parsed timestamp that remembers whether its source carried a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stamp {
    /// The source carried an explicit UTC offset.
    Zoned(DateTime<FixedOffset>),
    /// Wall-clock value with no zone information.
    Naive(NaiveDateTime),
}

impl Stamp {
    /// Compare a value against a window boundary.
    ///
    /// A naive boundary is authoritative: a zoned value is compared by its
    /// wall-clock reading with the offset stripped, not converted. A naive
    /// value against a zoned boundary has no defined ordering and yields
    /// `None`; range checks treat that as out of range.
    fn cmp_boundary(self, boundary: Stamp) -> Option<Ordering> {
        match (self, boundary) {
            (Stamp::Zoned(value), Stamp::Zoned(bound)) => Some(value.cmp(&bound)),
            (Stamp::Zoned(value), Stamp::Naive(bound)) => Some(value.naive_local().cmp(&bound)),
            (Stamp::Naive(value), Stamp::Naive(bound)) => Some(value.cmp(&bound)),
            (Stamp::Naive(_), Stamp::Zoned(_)) => None,
        }
    }
}

impl From<Stamp> for RawTimestamp {
    fn from(stamp: Stamp) -> Self {
        match stamp {
            Stamp::Zoned(dt) => RawTimestamp::Utc(dt.with_timezone(&Utc)),
            Stamp::Naive(dt) => RawTimestamp::Naive(dt),
        }
    }
}

/// Normalize a stored value into a comparable stamp.
///
/// Native values pass straight through. Text is parsed as strict ISO-8601
/// first (a trailing `Z` reads as UTC, an explicit offset is kept), then
/// against a fixed list of legacy formats. Returns `None` when no format
/// matches; callers decide what exclusion means at their site.
pub fn normalize(raw: &RawTimestamp) -> Option<Stamp> {
    match raw {
        RawTimestamp::Utc(dt) => Some(Stamp::Zoned(dt.fixed_offset())),
        RawTimestamp::Naive(dt) => Some(Stamp::Naive(*dt)),
        RawTimestamp::Text(s) => parse_text(s),
    }
}

#[derive(Clone, Copy)]
enum TextFormat {
    DateTime,
    DateOnly,
}

/// Legacy fallback formats, tried in order after ISO-8601.
///
/// Order is the tie-break between year-first and day-first readings of
/// ambiguous input: `05-03-2025` fails `%Y-%m-%d` (four digits where a day
/// should be) and lands on `%d-%m-%Y`, so it reads as 5 March.
const FALLBACK_FORMATS: &[(&str, TextFormat)] = &[
    ("%Y-%m-%d %H:%M:%S", TextFormat::DateTime),
    ("%Y/%m/%d %H:%M:%S", TextFormat::DateTime),
    ("%Y-%m-%d", TextFormat::DateOnly),
    ("%Y/%m/%d", TextFormat::DateOnly),
    ("%d-%m-%Y", TextFormat::DateOnly),
    ("%d/%m/%Y", TextFormat::DateOnly),
];

fn parse_text(raw: &str) -> Option<Stamp> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(Stamp::Zoned(dt));
    }
    // ISO without an offset stays naive. Seconds are optional, fractional
    // seconds tolerated.
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Stamp::Naive(dt));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M") {
        return Some(Stamp::Naive(dt));
    }

    for (format, kind) in FALLBACK_FORMATS {
        match kind {
            TextFormat::DateTime => {
                if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
                    return Some(Stamp::Naive(dt));
                }
            }
            TextFormat::DateOnly => {
                if let Ok(date) = NaiveDate::parse_from_str(text, format) {
                    return Some(Stamp::Naive(date.and_time(NaiveTime::MIN)));
                }
            }
        }
    }

    None
}

/// An inclusive report window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: Stamp,
    pub end: Stamp,
}

impl Window {
    /// Inclusive membership test. A value that cannot be ordered against a
    /// boundary is excluded.
    pub fn contains(&self, stamp: Stamp) -> bool {
        let after_start = matches!(
            stamp.cmp_boundary(self.start),
            Some(Ordering::Greater | Ordering::Equal)
        );
        let before_end = matches!(
            stamp.cmp_boundary(self.end),
            Some(Ordering::Less | Ordering::Equal)
        );
        after_start && before_end
    }

    /// Parse a client-supplied window, falling back to the current
    /// shop-local calendar month when either bound fails to parse.
    pub fn parse_or_current_month(start: &str, end: &str, shop: FixedOffset) -> Window {
        match (parse_text(start), parse_text(end)) {
            (Some(start), Some(end)) => Window { start, end },
            _ => Window::current_month(shop),
        }
    }

    /// The current calendar month in shop-local time.
    pub fn current_month(shop: FixedOffset) -> Window {
        Window::month_containing(Utc::now().with_timezone(&shop).date_naive())
    }

    /// The calendar month containing `day`, as zone-naive bounds: first day
    /// 00:00:00 through last day 23:59:59.
    pub fn month_containing(day: NaiveDate) -> Window {
        // Day 1 exists in every month, so the fallback never fires.
        let first = day.with_day(1).unwrap_or(day);
        let next_first = first + Months::new(1);
        let start = first.and_time(NaiveTime::MIN);
        let end = next_first.and_time(NaiveTime::MIN) - TimeDelta::seconds(1);
        Window {
            start: Stamp::Naive(start),
            end: Stamp::Naive(end),
        }
    }
}

/// Shop-local wall-clock reading of a stamp.
///
/// Zoned values convert into the shop offset; naive values are taken to
/// already be shop-local wall time. Only for daily bucketing; window
/// membership has different zone rules and goes through
/// [`Window::contains`].
pub fn shop_wall_time(stamp: Stamp, shop: FixedOffset) -> NaiveDateTime {
    match stamp {
        Stamp::Zoned(dt) => dt.with_timezone(&shop).naive_local(),
        Stamp::Naive(dt) => dt,
    }
}

/// Today's shop-local day as inclusive bounds, 00:00:00 through 23:59:59.
pub fn shop_today(shop: FixedOffset) -> (NaiveDateTime, NaiveDateTime) {
    let today = Utc::now().with_timezone(&shop).date_naive();
    let start = today.and_time(NaiveTime::MIN);
    let end = start + TimeDelta::seconds(86_399);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn text(s: &str) -> RawTimestamp {
        RawTimestamp::from(s)
    }

    #[test]
    fn zulu_text_and_native_utc_normalize_equal() {
        let native = RawTimestamp::Utc(
            DateTime::parse_from_rfc3339("2025-03-10T08:00:00+00:00")
                .unwrap()
                .with_timezone(&Utc),
        );
        assert_eq!(
            normalize(&text("2025-03-10T08:00:00Z")),
            normalize(&native)
        );
    }

    #[test]
    fn offset_text_keeps_its_instant() {
        let a = normalize(&text("2025-03-10T16:00:00+08:00")).unwrap();
        let b = normalize(&text("2025-03-10T08:00:00Z")).unwrap();
        // Same instant, different offsets.
        assert_eq!(a, b);
    }

    #[test]
    fn iso_without_offset_stays_naive() {
        assert_eq!(
            normalize(&text("2025-03-10T08:00:00")),
            Some(Stamp::Naive(naive(2025, 3, 10, 8, 0, 0)))
        );
        assert_eq!(
            normalize(&text("2025-03-10T08:00")),
            Some(Stamp::Naive(naive(2025, 3, 10, 8, 0, 0)))
        );
    }

    #[test]
    fn legacy_formats_parse_in_order() {
        assert_eq!(
            normalize(&text("2025-03-10 08:30:00")),
            Some(Stamp::Naive(naive(2025, 3, 10, 8, 30, 0)))
        );
        assert_eq!(
            normalize(&text("2025/03/10 08:30:00")),
            Some(Stamp::Naive(naive(2025, 3, 10, 8, 30, 0)))
        );
        assert_eq!(
            normalize(&text("2025-03-10")),
            Some(Stamp::Naive(naive(2025, 3, 10, 0, 0, 0)))
        );
        assert_eq!(
            normalize(&text("2025/03/10")),
            Some(Stamp::Naive(naive(2025, 3, 10, 0, 0, 0)))
        );
        assert_eq!(
            normalize(&text("10/03/2025")),
            Some(Stamp::Naive(naive(2025, 3, 10, 0, 0, 0)))
        );
    }

    #[test]
    fn ambiguous_dates_read_day_first() {
        // A four-digit trailing year cannot satisfy %Y-%m-%d, so the
        // day-first format takes it.
        assert_eq!(
            normalize(&text("05-03-2025")),
            Some(Stamp::Naive(naive(2025, 3, 5, 0, 0, 0)))
        );
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(
            normalize(&text("  2025-03-10 08:30:00  ")),
            Some(Stamp::Naive(naive(2025, 3, 10, 8, 30, 0)))
        );
    }

    #[test]
    fn garbage_is_unrecognized() {
        assert_eq!(normalize(&text("not a date")), None);
        assert_eq!(normalize(&text("")), None);
        assert_eq!(normalize(&text("   ")), None);
        assert_eq!(normalize(&text("2025-13-40")), None);
    }

    #[test]
    fn native_values_pass_through() {
        let dt = naive(2025, 3, 10, 8, 0, 0);
        assert_eq!(
            normalize(&RawTimestamp::Naive(dt)),
            Some(Stamp::Naive(dt))
        );
    }

    #[test]
    fn normalizing_a_normalized_value_is_stable() {
        for raw in [
            text("2025-03-10T08:00:00+09:00"),
            text("2025-03-10 08:30:00"),
            text("10/03/2025"),
        ] {
            let stamp = normalize(&raw).unwrap();
            assert_eq!(normalize(&RawTimestamp::from(stamp)), Some(stamp));
        }
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let window = Window {
            start: Stamp::Naive(naive(2025, 3, 1, 0, 0, 0)),
            end: Stamp::Naive(naive(2025, 3, 31, 23, 59, 59)),
        };
        assert!(window.contains(Stamp::Naive(naive(2025, 3, 1, 0, 0, 0))));
        assert!(window.contains(Stamp::Naive(naive(2025, 3, 31, 23, 59, 59))));
        assert!(window.contains(Stamp::Naive(naive(2025, 3, 15, 12, 0, 0))));
        assert!(!window.contains(Stamp::Naive(naive(2025, 2, 28, 23, 59, 59))));
        assert!(!window.contains(Stamp::Naive(naive(2025, 4, 1, 0, 0, 0))));
    }

    #[test]
    fn naive_boundary_strips_zoned_values() {
        let window = Window {
            start: Stamp::Naive(naive(2025, 3, 1, 0, 0, 0)),
            end: Stamp::Naive(naive(2025, 3, 31, 23, 59, 59)),
        };
        // 2025-03-10T08:00 wall clock at +09:00 is 2025-03-09T23:00 UTC;
        // the wall-clock reading is what counts against a naive boundary.
        let zoned = parse_text("2025-03-10T08:00:00+09:00").unwrap();
        assert!(window.contains(zoned));

        // Wall clock outside the month stays outside even though the
        // instant falls inside it.
        let edge = parse_text("2025-04-01T05:00:00+09:00").unwrap();
        assert!(!window.contains(edge));
    }

    #[test]
    fn naive_value_against_zoned_boundary_is_excluded() {
        let window = Window {
            start: parse_text("2025-03-01T00:00:00Z").unwrap(),
            end: parse_text("2025-03-31T23:59:59Z").unwrap(),
        };
        assert!(!window.contains(Stamp::Naive(naive(2025, 3, 15, 12, 0, 0))));
    }

    #[test]
    fn zoned_bounds_compare_by_instant() {
        let window = Window {
            start: parse_text("2025-03-01T00:00:00Z").unwrap(),
            end: parse_text("2025-03-31T23:59:59Z").unwrap(),
        };
        // 2025-03-01T07:59:59+08:00 is 2025-02-28T23:59:59Z, before start.
        assert!(!window.contains(parse_text("2025-03-01T07:59:59+08:00").unwrap()));
        // One second later is exactly the start instant.
        assert!(window.contains(parse_text("2025-03-01T08:00:00+08:00").unwrap()));
    }

    #[test]
    fn month_window_covers_full_month() {
        let window = Window::month_containing(NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
        assert_eq!(
            window.start,
            Stamp::Naive(naive(2025, 3, 1, 0, 0, 0))
        );
        assert_eq!(
            window.end,
            Stamp::Naive(naive(2025, 3, 31, 23, 59, 59))
        );
    }

    #[test]
    fn month_window_handles_leap_february() {
        let window = Window::month_containing(NaiveDate::from_ymd_opt(2024, 2, 2).unwrap());
        assert_eq!(window.end, Stamp::Naive(naive(2024, 2, 29, 23, 59, 59)));
    }

    #[test]
    fn month_window_handles_year_rollover() {
        let window = Window::month_containing(NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
        assert_eq!(window.start, Stamp::Naive(naive(2025, 12, 1, 0, 0, 0)));
        assert_eq!(window.end, Stamp::Naive(naive(2025, 12, 31, 23, 59, 59)));
    }

    #[test]
    fn malformed_bounds_fall_back_to_current_month() {
        let shop = FixedOffset::east_opt(8 * 3600).unwrap();
        let fallback = Window::parse_or_current_month("not-a-date", "2025-03-31", shop);
        assert_eq!(fallback, Window::current_month(shop));

        let explicit = Window::parse_or_current_month("2025-03-01", "2025-03-31", shop);
        assert_eq!(
            explicit.start,
            Stamp::Naive(naive(2025, 3, 1, 0, 0, 0))
        );
        assert_eq!(
            explicit.end,
            Stamp::Naive(naive(2025, 3, 31, 0, 0, 0))
        );
    }

    #[test]
    fn current_month_fallback_ends_on_last_second_of_month() {
        let shop = FixedOffset::east_opt(8 * 3600).unwrap();
        let window = Window::current_month(shop);
        let today = Utc::now().with_timezone(&shop).date_naive();
        let (Stamp::Naive(start), Stamp::Naive(end)) = (window.start, window.end) else {
            panic!("month fallback must produce naive bounds");
        };
        assert_eq!(start.date().day(), 1);
        assert_eq!(start.time(), NaiveTime::MIN);
        assert_eq!(start.date().month(), today.month());
        assert_eq!(end.date().month(), today.month());
        assert_eq!(end.time(), NaiveTime::from_hms_opt(23, 59, 59).unwrap());
        // Last day of the month: adding one day leaves the month.
        assert_ne!(
            (end.date() + TimeDelta::days(1)).month(),
            end.date().month()
        );
    }

    #[test]
    fn shop_wall_time_converts_zoned_and_keeps_naive() {
        let shop = FixedOffset::east_opt(8 * 3600).unwrap();
        let zoned = parse_text("2025-03-10T20:00:00Z").unwrap();
        assert_eq!(shop_wall_time(zoned, shop), naive(2025, 3, 11, 4, 0, 0));

        let wall = naive(2025, 3, 10, 20, 0, 0);
        assert_eq!(shop_wall_time(Stamp::Naive(wall), shop), wall);
    }

    #[test]
    fn shop_today_spans_one_day_inclusive() {
        let shop = FixedOffset::east_opt(8 * 3600).unwrap();
        let (start, end) = shop_today(shop);
        assert_eq!(start.time(), NaiveTime::MIN);
        assert_eq!(end - start, TimeDelta::seconds(86_399));
        let now_wall = Utc::now().with_timezone(&shop).naive_local();
        assert!(start <= now_wall && now_wall <= end);
    }
}
