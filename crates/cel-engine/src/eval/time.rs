//! Timestamp and duration parsing, formatting and field extraction.

use chrono::{DateTime, Datelike, FixedOffset, Offset, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;

use super::value::{Duration, Timestamp};

/// First day of the week for `getDayOfWeek`, which numbers days from 0.
/// With Sunday as day 0, Monday is 1 and Saturday is 6.
pub const WEEK_STARTS_ON: Weekday = Weekday::Sun;

/// Parse an RFC 3339 timestamp string.
///
/// Supports formats like:
/// - "2009-02-13T23:31:30Z"
/// - "2009-02-13T23:31:30.123456789Z"
/// - "2009-02-13T23:31:30+01:00"
pub fn parse_timestamp(s: &str) -> Result<Timestamp, String> {
    let dt = DateTime::parse_from_rfc3339(s)
        .map_err(|e| format!("invalid timestamp '{}': {}", s, e))?;

    let ts = Timestamp::from_datetime(dt.with_timezone(&Utc));
    if !ts.is_valid() {
        return Err(format!("timestamp '{}' is outside years 0001 to 9999", s));
    }
    Ok(ts)
}

fn unit_nanos(unit: &str) -> Option<i128> {
    let nanos = match unit {
        "h" => 3_600_000_000_000,
        "m" => 60_000_000_000,
        "s" => 1_000_000_000,
        "ms" => 1_000_000,
        "us" | "\u{00b5}s" => 1_000,
        "ns" => 1,
        _ => return None,
    };
    Some(nanos)
}

/// Parse a CEL duration string.
///
/// A duration is an optional sign followed by one or more decimal numbers,
/// each with a unit suffix: `"100s"`, `"1.5h"`, `"1h30m"`, `"-30s"`,
/// `"250ms"`. Units are `h`, `m`, `s`, `ms`, `us` and `ns`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let invalid = || format!("invalid duration '{}'", s);

    let (negative, mut remaining) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if remaining.is_empty() {
        return Err(invalid());
    }

    let mut total: i128 = 0;
    while !remaining.is_empty() {
        let num_end = remaining
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(remaining.len());
        let unit_end = remaining[num_end..]
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .map_or(remaining.len(), |i| num_end + i);

        let number = &remaining[..num_end];
        let unit = &remaining[num_end..unit_end];
        remaining = &remaining[unit_end..];

        if number.is_empty() || number == "." {
            return Err(invalid());
        }
        let multiplier =
            unit_nanos(unit).ok_or_else(|| format!("unknown unit '{}' in duration '{}'", unit, s))?;

        let nanos = match number.split_once('.') {
            None => number
                .parse::<i128>()
                .ok()
                .and_then(|n| n.checked_mul(multiplier)),
            Some((whole, frac)) => {
                if frac.contains('.') {
                    return Err(invalid());
                }
                let whole = if whole.is_empty() { Ok(0) } else { whole.parse::<i128>() };
                let fraction: f64 = format!("0.{}", frac).parse().map_err(|_| invalid())?;
                whole
                    .ok()
                    .and_then(|w| w.checked_mul(multiplier))
                    .and_then(|w| w.checked_add((fraction * multiplier as f64) as i128))
            }
        };
        total = nanos
            .and_then(|n| total.checked_add(n))
            .ok_or_else(|| format!("duration '{}' is out of range", s))?;
    }

    if negative {
        total = -total;
    }
    Duration::from_total_nanos(total).ok_or_else(|| format!("duration '{}' is out of range", s))
}

/// Format a timestamp as RFC 3339 with a `Z` suffix, keeping only the
/// significant fractional digits.
///
/// Examples:
/// - "2009-02-13T23:31:30Z"
/// - "2009-02-13T23:31:30.123Z"
pub fn format_timestamp(ts: &Timestamp) -> String {
    let Some(dt) = ts.to_datetime_utc() else {
        return format!("{}s", ts.seconds);
    };
    let base = dt.format("%Y-%m-%dT%H:%M:%S");
    let fraction = format!("{:09}", ts.nanos);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{}Z", base)
    } else {
        format!("{}.{}Z", base, fraction)
    }
}

/// Format a duration in seconds, e.g. `"100s"`, `"1.5s"` or `"-0.25s"`.
pub fn format_duration(d: &Duration) -> String {
    let total = d.total_nanos();
    let sign = if total < 0 { "-" } else { "" };
    let abs = total.unsigned_abs();
    let secs = abs / 1_000_000_000;
    let frac = abs % 1_000_000_000;

    if frac == 0 {
        format!("{}{}s", sign, secs)
    } else {
        let digits = format!("{:09}", frac);
        format!("{}{}.{}s", sign, secs, digits.trim_end_matches('0'))
    }
}

/// Parse a time zone given as an IANA name (`"America/New_York"`) or a
/// fixed UTC offset (`"+01:00"`, `"-05:30"`, `"02:00"`).
pub fn parse_timezone(tz: &str) -> Result<TimezoneInfo, String> {
    if let Ok(parsed) = tz.parse::<Tz>() {
        return Ok(TimezoneInfo::Iana(parsed));
    }
    parse_fixed_offset(tz).map(TimezoneInfo::Fixed)
}

fn parse_fixed_offset(s: &str) -> Result<FixedOffset, String> {
    let invalid = || format!("invalid time zone '{}'", s);

    let (negative, rest) = match s.trim() {
        t if t.starts_with('-') => (true, &t[1..]),
        t if t.starts_with('+') => (false, &t[1..]),
        t => (false, t),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    let hours = offset_field(hours, 23).ok_or_else(invalid)?;
    let minutes = offset_field(minutes, 59).ok_or_else(invalid)?;

    let total = hours * 3600 + minutes * 60;
    FixedOffset::east_opt(if negative { -total } else { total }).ok_or_else(invalid)
}

/// One or two ASCII digits no greater than `max`.
fn offset_field(field: &str, max: i32) -> Option<i32> {
    if field.is_empty() || field.len() > 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok().filter(|&n| n <= max)
}

/// Either an IANA time zone or a fixed offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimezoneInfo {
    Iana(Tz),
    Fixed(FixedOffset),
}

impl TimezoneInfo {
    /// Convert a UTC timestamp to local time in this zone.
    pub fn datetime_from_timestamp(&self, ts: &Timestamp) -> Option<DateTime<FixedOffset>> {
        let utc = ts.to_datetime_utc()?;
        match self {
            TimezoneInfo::Iana(tz) => {
                let local = utc.with_timezone(tz);
                let offset = local.offset().fix();
                Some(local.with_timezone(&offset))
            }
            TimezoneInfo::Fixed(offset) => Some(utc.with_timezone(offset)),
        }
    }
}

/// Timestamp accessor component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampComponent {
    FullYear,
    /// Month (0-11, 0 = January).
    Month,
    /// Day of month (1-31).
    Date,
    /// Day of month (0-30).
    DayOfMonth,
    /// Day of week (0-6, counted from [`WEEK_STARTS_ON`]).
    DayOfWeek,
    /// Day of year (0-365).
    DayOfYear,
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
}

impl TimestampComponent {
    pub fn extract<Z: TimeZone>(&self, dt: &DateTime<Z>) -> i64 {
        let value = match self {
            TimestampComponent::FullYear => return dt.year() as i64,
            TimestampComponent::Month => dt.month0(),
            TimestampComponent::Date => dt.day(),
            TimestampComponent::DayOfMonth => dt.day0(),
            TimestampComponent::DayOfWeek => {
                (7 + dt.weekday().num_days_from_monday() - WEEK_STARTS_ON.num_days_from_monday())
                    % 7
            }
            TimestampComponent::DayOfYear => dt.ordinal0(),
            TimestampComponent::Hours => dt.hour(),
            TimestampComponent::Minutes => dt.minute(),
            TimestampComponent::Seconds => dt.second(),
            TimestampComponent::Milliseconds => dt.nanosecond() % 1_000_000_000 / 1_000_000,
        };
        value as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parse_timestamp_basic() {
        let ts = parse_timestamp("2009-02-13T23:31:30Z").unwrap();
        assert_eq!(ts.seconds, 1234567890);
        assert_eq!(ts.nanos, 0);
    }

    #[test]
    fn parse_timestamp_with_nanos() {
        let ts = parse_timestamp("2009-02-13T23:31:30.123456789Z").unwrap();
        assert_eq!(ts.seconds, 1234567890);
        assert_eq!(ts.nanos, 123456789);
    }

    #[test]
    fn parse_timestamp_with_offset() {
        let ts = parse_timestamp("2009-02-13T18:31:30-05:00").unwrap();
        assert_eq!(ts.seconds, 1234567890);
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("2009-02-13").is_err());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[rstest]
    #[case("100s", 100, 0)]
    #[case("2h", 7200, 0)]
    #[case("1h30m", 5400, 0)]
    #[case("-30s", -30, 0)]
    #[case("500ms", 0, 500_000_000)]
    #[case("1.5h", 5400, 0)]
    #[case("1.5s", 1, 500_000_000)]
    #[case(".5s", 0, 500_000_000)]
    #[case("-1.5s", -1, -500_000_000)]
    #[case("1m1us1ns", 60, 1001)]
    #[case("0s", 0, 0)]
    fn parse_duration_accepts(#[case] input: &str, #[case] seconds: i64, #[case] nanos: i32) {
        assert_eq!(parse_duration(input), Ok(Duration::new(seconds, nanos)));
    }

    #[rstest]
    #[case("")]
    #[case("-")]
    #[case("10")]
    #[case("s")]
    #[case("1d")]
    #[case("1..5s")]
    #[case("1.2.3s")]
    #[case("99999999999999999999999999999999999999999h")]
    #[case("3000000000000s")]
    fn parse_duration_rejects(#[case] input: &str) {
        assert!(parse_duration(input).is_err(), "accepted {:?}", input);
    }

    #[test]
    fn format_timestamp_trims_fraction() {
        assert_eq!(format_timestamp(&Timestamp::new(1234567890, 0)), "2009-02-13T23:31:30Z");
        assert_eq!(
            format_timestamp(&Timestamp::new(1234567890, 123000000)),
            "2009-02-13T23:31:30.123Z"
        );
    }

    #[test]
    fn format_duration_forms() {
        assert_eq!(format_duration(&Duration::new(100, 0)), "100s");
        assert_eq!(format_duration(&Duration::new(1, 500000000)), "1.5s");
        assert_eq!(format_duration(&Duration::new(0, -250000000)), "-0.25s");
    }

    #[test]
    fn parse_timezones() {
        assert!(matches!(parse_timezone("America/New_York"), Ok(TimezoneInfo::Iana(_))));
        assert!(matches!(parse_timezone("+05:30"), Ok(TimezoneInfo::Fixed(_))));
        assert!(matches!(parse_timezone("05:30"), Ok(TimezoneInfo::Fixed(_))));
        assert!(parse_timezone("Mars/Olympus_Mons").is_err());
        assert!(parse_timezone("+05:75").is_err());
        assert!(parse_timezone("999999:00").is_err());
        assert!(parse_timezone("25:00").is_err());
        assert!(parse_timezone("+-3:00").is_err());
        assert!(matches!(parse_timezone("-23:59"), Ok(TimezoneInfo::Fixed(_))));
    }

    #[test]
    fn fixed_offset_shifts_local_time() {
        let ts = Timestamp::new(1234567890, 0);
        let tz = parse_timezone("-05:00").unwrap();
        let local = tz.datetime_from_timestamp(&ts).unwrap();
        assert_eq!(TimestampComponent::Hours.extract(&local), 18);
    }

    #[test]
    fn component_extract() {
        let dt = Timestamp::new(1234567890, 0).to_datetime_utc().unwrap();

        assert_eq!(TimestampComponent::FullYear.extract(&dt), 2009);
        assert_eq!(TimestampComponent::Month.extract(&dt), 1);
        assert_eq!(TimestampComponent::Date.extract(&dt), 13);
        assert_eq!(TimestampComponent::DayOfMonth.extract(&dt), 12);
        assert_eq!(TimestampComponent::DayOfYear.extract(&dt), 43);
        assert_eq!(TimestampComponent::Hours.extract(&dt), 23);
        assert_eq!(TimestampComponent::Minutes.extract(&dt), 31);
        assert_eq!(TimestampComponent::Seconds.extract(&dt), 30);
    }

    #[rstest]
    // 2025-04-27 was a Sunday.
    #[case("2025-04-27T12:00:00Z", 0)]
    #[case("2025-04-28T12:00:00Z", 1)]
    #[case("2025-05-03T12:00:00Z", 6)]
    fn day_of_week_counts_from_sunday(#[case] input: &str, #[case] expected: i64) {
        let dt = parse_timestamp(input).unwrap().to_datetime_utc().unwrap();
        assert_eq!(TimestampComponent::DayOfWeek.extract(&dt), expected);
    }
}
