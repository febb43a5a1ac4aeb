use dbconnect_core::error::{Error, ErrorKind, Result};
use time::{Date, Duration, Month, OffsetDateTime};

fn epoch_date() -> Date {
    OffsetDateTime::UNIX_EPOCH.date()
}

/// Formats a day count since the Unix epoch as the `YYYY-MM-DD` text `date` input
/// functions expect.
pub fn format_date(days_since_epoch: i32) -> String {
    let date = epoch_date() + Duration::days(days_since_epoch as i64);
    format!("{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day())
}

/// Formats a microsecond count since the Unix epoch as `YYYY-MM-DD HH:MM:SS.ffffff`.
pub fn format_timestamp(micros_since_epoch: i64) -> String {
    let dt = OffsetDateTime::UNIX_EPOCH + Duration::microseconds(micros_since_epoch);
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:06}",
        dt.year(),
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second(),
        dt.microsecond()
    )
}

/// Formats a microsecond count since midnight as `HH:MM:SS.ffffff`, the text `time`
/// input functions expect.
pub fn format_time(micros_since_midnight: i64) -> String {
    let micros_since_midnight = micros_since_midnight.rem_euclid(86_400_000_000);
    let hour = micros_since_midnight / 3_600_000_000;
    let minute = (micros_since_midnight / 60_000_000) % 60;
    let second = (micros_since_midnight / 1_000_000) % 60;
    let micros = micros_since_midnight % 1_000_000;
    format!("{hour:02}:{minute:02}:{second:02}.{micros:06}")
}

/// Parses a `time` column's `HH:MM:SS[.ffffff]` text representation into a microsecond
/// count since midnight.
pub fn parse_time(text: &str) -> Result<i64> {
    let mut fields = text.splitn(3, ':');
    let hour: i64 = fields
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::new(ErrorKind::Convert, format!("malformed time: {text:?}")))?;
    let minute: i64 = fields
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::new(ErrorKind::Convert, format!("malformed time: {text:?}")))?;
    let seconds_field = fields
        .next()
        .ok_or_else(|| Error::new(ErrorKind::Convert, format!("malformed time: {text:?}")))?;
    let (second_str, micros) = match seconds_field.split_once('.') {
        Some((s, frac)) => {
            let mut frac = frac.to_string();
            frac.truncate(6);
            while frac.len() < 6 {
                frac.push('0');
            }
            (s, frac.parse::<i64>().unwrap_or(0))
        }
        None => (seconds_field, 0),
    };
    let second: i64 = second_str
        .parse()
        .map_err(|_| Error::new(ErrorKind::Convert, format!("malformed time: {text:?}")))?;
    Ok(hour * 3_600_000_000 + minute * 60_000_000 + second * 1_000_000 + micros)
}

/// Parses a `date` column's `YYYY-MM-DD` text representation into a day count since
/// the Unix epoch.
pub fn parse_date(text: &str) -> Result<i32> {
    let (year, month, day) = split_date(text)?;
    let month = Month::try_from(month)
        .map_err(|_| Error::new(ErrorKind::Convert, format!("invalid month in date: {text:?}")))?;
    let date = Date::from_calendar_date(year, month, day)
        .map_err(|_| Error::new(ErrorKind::Convert, format!("invalid date: {text:?}")))?;
    Ok((date - epoch_date()).whole_days() as i32)
}

/// Parses a `timestamp` column's `YYYY-MM-DD HH:MM:SS[.ffffff]` text representation
/// into a microsecond count since the Unix epoch.
pub fn parse_timestamp(text: &str) -> Result<i64> {
    let (date_part, time_part) = text
        .split_once(' ')
        .ok_or_else(|| Error::new(ErrorKind::Convert, format!("malformed timestamp: {text:?}")))?;
    let (year, month, day) = split_date(date_part)?;
    let month = Month::try_from(month)
        .map_err(|_| Error::new(ErrorKind::Convert, format!("invalid month in timestamp: {text:?}")))?;
    let date = Date::from_calendar_date(year, month, day)
        .map_err(|_| Error::new(ErrorKind::Convert, format!("invalid date: {text:?}")))?;

    let mut fields = time_part.splitn(3, ':');
    let hour: u8 = fields
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::new(ErrorKind::Convert, format!("malformed timestamp: {text:?}")))?;
    let minute: u8 = fields
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::new(ErrorKind::Convert, format!("malformed timestamp: {text:?}")))?;
    let seconds_field = fields
        .next()
        .ok_or_else(|| Error::new(ErrorKind::Convert, format!("malformed timestamp: {text:?}")))?;
    let (second_str, micros) = match seconds_field.split_once('.') {
        Some((s, frac)) => {
            let mut frac = frac.to_string();
            frac.truncate(6);
            while frac.len() < 6 {
                frac.push('0');
            }
            (s, frac.parse::<u32>().unwrap_or(0))
        }
        None => (seconds_field, 0),
    };
    let second: u8 = second_str
        .parse()
        .map_err(|_| Error::new(ErrorKind::Convert, format!("malformed timestamp: {text:?}")))?;

    let days_since_epoch = (date - epoch_date()).whole_days();
    let time_of_day_micros = (hour as i64 * 3_600_000_000)
        + (minute as i64 * 60_000_000)
        + (second as i64 * 1_000_000)
        + micros as i64;
    Ok(days_since_epoch * 86_400_000_000 + time_of_day_micros)
}

fn split_date(text: &str) -> Result<(i32, u8, u8)> {
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
    Ok((year, month, day))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_round_trips() {
        let days = 19_723; // 2023-12-25
        let text = format_date(days);
        assert_eq!(text, "2023-12-25");
        assert_eq!(parse_date(&text).unwrap(), days);
    }

    #[test]
    fn timestamp_round_trips_with_fractional_seconds() {
        let micros = 1_703_500_861_500_000; // 2023-12-25 12:01:01.5
        let text = format_timestamp(micros);
        assert_eq!(parse_timestamp(&text).unwrap(), micros);
    }

    #[test]
    fn timestamp_without_fractional_seconds_parses() {
        assert_eq!(
            parse_timestamp("1970-01-01 00:00:00").unwrap(),
            0,
        );
    }

    #[test]
    fn time_round_trips_with_fractional_seconds() {
        let micros = 43_261_500_000; // 12:01:01.5
        let text = format_time(micros);
        assert_eq!(text, "12:01:01.500000");
        assert_eq!(parse_time(&text).unwrap(), micros);
    }
}
