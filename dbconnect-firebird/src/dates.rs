//! Conversions between this crate's Unix-epoch day/microsecond conventions (shared
//! with `dbconnect-postgres`, both pinned to 64-bit explicitly) and Firebird's
//! on-wire `SQL_TYPE_DATE`/`SQL_TYPE_TIME`/`SQL_TIMESTAMP` encodings.
//!
//! Firebird counts `SQL_TYPE_DATE` as whole days since 1858-11-17 (the Julian-day
//! convention `isc_encode_sql_date`/`isc_decode_sql_date` use in the C client) and
//! `SQL_TYPE_TIME` as units of 1/10000 second since midnight. We don't link those
//! C helpers (`sys.rs` only binds the subset this driver calls directly) and
//! reimplement the same arithmetic with `time::Date`, which is exact for every
//! calendar date the Gregorian calendar covers.

use dbconnect_core::error::{Error, ErrorKind, Result};
use time::{Date, Duration, Month};

/// Units of `SQL_TYPE_TIME` per second (1/10000 s, i.e. 100 microseconds each).
const TIME_UNITS_PER_SECOND: i64 = 10_000;

fn firebird_epoch() -> Date {
    Date::from_calendar_date(1858, Month::November, 17).expect("1858-11-17 is a valid date")
}

fn unix_epoch() -> Date {
    Date::from_calendar_date(1970, Month::January, 1).expect("1970-01-01 is a valid date")
}

/// Converts a day count since the Unix epoch (this crate's convention, shared with
/// `dbconnect-postgres`) to Firebird's `SQL_TYPE_DATE` day count since 1858-11-17.
pub fn unix_days_to_firebird(days_since_unix_epoch: i32) -> i32 {
    let date = unix_epoch() + Duration::days(days_since_unix_epoch as i64);
    (date - firebird_epoch()).whole_days() as i32
}

/// The inverse of [`unix_days_to_firebird`].
pub fn firebird_to_unix_days(firebird_date: i32) -> i32 {
    let date = firebird_epoch() + Duration::days(firebird_date as i64);
    (date - unix_epoch()).whole_days() as i32
}

/// Converts microseconds-since-midnight (this crate's time-of-day convention) to
/// Firebird's `SQL_TYPE_TIME` units (1/10000 s).
pub fn micros_to_firebird_time(micros_since_midnight: i64) -> u32 {
    (micros_since_midnight.rem_euclid(86_400_000_000) / 100) as u32
}

/// The inverse of [`micros_to_firebird_time`].
pub fn firebird_time_to_micros(firebird_time: u32) -> i64 {
    firebird_time as i64 * 100
}

/// Splits a microsecond-since-Unix-epoch timestamp into Firebird's
/// `(SQL_TYPE_DATE, SQL_TYPE_TIME)` pair, as `SQL_TIMESTAMP` is wire-encoded.
pub fn unix_micros_to_firebird_timestamp(micros_since_unix_epoch: i64) -> (i32, u32) {
    let days = micros_since_unix_epoch.div_euclid(86_400_000_000);
    let time_of_day = micros_since_unix_epoch.rem_euclid(86_400_000_000);
    (unix_days_to_firebird(days as i32), micros_to_firebird_time(time_of_day))
}

/// The inverse of [`unix_micros_to_firebird_timestamp`].
pub fn firebird_timestamp_to_unix_micros(firebird_date: i32, firebird_time: u32) -> i64 {
    let days = firebird_to_unix_days(firebird_date) as i64;
    days * 86_400_000_000 + firebird_time_to_micros(firebird_time)
}

/// Formats a Firebird `SQL_TYPE_DATE` day count as `YYYY-MM-DD`, for
/// `ResultSet::get_string` on a date column.
pub fn format_date(firebird_date: i32) -> String {
    let date = firebird_epoch() + Duration::days(firebird_date as i64);
    format!("{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day())
}

/// Formats a Firebird `SQL_TYPE_TIME` value as `HH:MM:SS.ffffff`.
pub fn format_time(firebird_time: u32) -> String {
    let micros = firebird_time_to_micros(firebird_time);
    let hour = micros / 3_600_000_000;
    let minute = (micros / 60_000_000) % 60;
    let second = (micros / 1_000_000) % 60;
    let frac = micros % 1_000_000;
    format!("{hour:02}:{minute:02}:{second:02}.{frac:06}")
}

/// Formats a Firebird `SQL_TIMESTAMP` pair as `YYYY-MM-DD HH:MM:SS.ffffff`.
pub fn format_timestamp(firebird_date: i32, firebird_time: u32) -> String {
    format!("{} {}", format_date(firebird_date), format_time(firebird_time))
}

/// Parses a `YYYY-MM-DD` string (as produced by this crate's own formatting, or typed
/// in by a caller building DDL) into a Firebird `SQL_TYPE_DATE` day count. Only used
/// by the `create_database` command path, which accepts plain strings for options.
pub fn parse_iso_date_to_firebird(text: &str) -> Result<i32> {
    let mut parts = text.splitn(3, '-');
    let year: i32 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::new(ErrorKind::Convert, format!("malformed date: {text:?}")))?;
    let month: u8 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::new(ErrorKind::Convert, format!("malformed date: {text:?}")))?;
    let day: u8 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::new(ErrorKind::Convert, format!("malformed date: {text:?}")))?;
    let month = Month::try_from(month)
        .map_err(|_| Error::new(ErrorKind::Convert, format!("invalid month in date: {text:?}")))?;
    let date = Date::from_calendar_date(year, month, day)
        .map_err(|_| Error::new(ErrorKind::Convert, format!("invalid date: {text:?}")))?;
    Ok((date - firebird_epoch()).whole_days() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_epoch_round_trips() {
        let firebird_day = unix_days_to_firebird(0);
        assert_eq!(firebird_to_unix_days(firebird_day), 0);
    }

    #[test]
    fn known_date_matches_firebird_convention() {
        // 1970-01-01 is 40587 days after 1858-11-17 under the Firebird/MJD-like convention.
        assert_eq!(unix_days_to_firebird(0), 40_587);
    }

    #[test]
    fn time_round_trips_within_unit_precision() {
        let micros = 43_261_000_000; // 12:01:01.0, exactly representable in 100us units
        let fb = micros_to_firebird_time(micros);
        assert_eq!(firebird_time_to_micros(fb), micros);
    }

    #[test]
    fn timestamp_round_trips() {
        let micros = 1_703_500_861_000_000; // 2023-12-25 12:01:01.0
        let (date, time) = unix_micros_to_firebird_timestamp(micros);
        assert_eq!(firebird_timestamp_to_unix_micros(date, time), micros);
    }
}
