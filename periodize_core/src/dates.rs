//! Calendar helpers shared by the resolver and the expander.

use crate::{Error, Result};
use chrono::{
    DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
    Weekday,
};

/// Whole calendar days from `from` to `to` (negative when `to` is earlier)
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// The upcoming Monday, or `today` itself when it is a Monday
pub fn next_monday(today: NaiveDate) -> NaiveDate {
    let from_sunday = i64::from(today.weekday().num_days_from_sunday());
    let days_until_monday = (1 + 7 - from_sunday) % 7;
    today + Duration::days(days_until_monday)
}

/// Offset of a weekday from Monday (Mon = 0 .. Sun = 6)
pub fn weekday_offset(day: Weekday) -> i64 {
    i64::from(day.num_days_from_monday())
}

/// Parse a weekday code as emitted by the text parser.
///
/// Accepts English three-letter codes and full names plus Spanish codes,
/// case-insensitively.
pub fn parse_weekday(code: &str) -> Option<Weekday> {
    let lower = code.trim().to_lowercase();
    let day = match lower.as_str() {
        "mon" | "monday" | "lun" | "lunes" => Weekday::Mon,
        "tue" | "tues" | "tuesday" | "mar" | "martes" => Weekday::Tue,
        "wed" | "wednesday" | "mie" | "mié" | "miercoles" | "miércoles" => Weekday::Wed,
        "thu" | "thur" | "thurs" | "thursday" | "jue" | "jueves" => Weekday::Thu,
        "fri" | "friday" | "vie" | "viernes" => Weekday::Fri,
        "sat" | "saturday" | "sab" | "sáb" | "sabado" | "sábado" => Weekday::Sat,
        "sun" | "sunday" | "dom" | "domingo" => Weekday::Sun,
        _ => return None,
    };
    Some(day)
}

/// Midnight at the start of `date`
pub fn at_midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Calendar day of `at` in the local time zone
pub fn local_day(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&Local).date_naive()
}

/// Local noon on `date`, as an instant
pub fn local_noon(date: NaiveDate) -> DateTime<Utc> {
    let noon = date.and_time(NaiveTime::MIN) + Duration::hours(12);
    Local
        .from_local_datetime(&noon)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
        .unwrap_or_else(|| noon.and_utc())
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| Error::InvalidDate(format!("'{}': {}", s, e)))
}
