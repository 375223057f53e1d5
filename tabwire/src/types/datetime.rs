//! Text format of date, time and time span values.
//!
//! - date time: `YYYY-MM-DDTHH:MM:SS.f`, subsecond is one to nine digits,
//!   optional when parsing
//! - date time with offset: RFC 3339; values RFC 3339 cannot carry (offset
//!   with seconds, year outside `0000..=9999`) use the date time format
//!   followed by `+HH:MM:SS`
//! - time span: `[-][d.]hh:mm:ss[.fffffffff]`
use time::{
    Duration, OffsetDateTime, PrimitiveDateTime,
    format_description::{BorrowedFormatItem as I, well_known::Rfc3339},
    macros::format_description,
};

use crate::common::reason_error;

const DATE_TIME: &[I<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");

const DATE_TIME_PARSE: &[I<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]");

const DATE_TIME_OFFSET_EXTENDED: &[I<'_>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]:[offset_second]"
);

const SECONDS_PER_DAY: u64 = 86_400;

/// Format date time without offset.
pub fn format_date_time(value: &PrimitiveDateTime) -> String {
    value.format(DATE_TIME).expect("format is statically known")
}

/// Parse date time without offset.
pub fn parse_date_time(text: &str) -> Result<PrimitiveDateTime, ParseTimeError> {
    PrimitiveDateTime::parse(text, DATE_TIME_PARSE).map_err(|e| ParseTimeError::new(e.to_string()))
}

/// Format date time with its utc offset.
pub fn format_date_time_offset(value: &OffsetDateTime) -> String {
    match value.format(&Rfc3339) {
        Ok(text) => text,
        Err(_) => value.format(DATE_TIME_OFFSET_EXTENDED).expect("format is statically known"),
    }
}

/// Parse date time with its utc offset.
pub fn parse_date_time_offset(text: &str) -> Result<OffsetDateTime, ParseTimeError> {
    OffsetDateTime::parse(text, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(text, DATE_TIME_OFFSET_EXTENDED))
        .map_err(|e| ParseTimeError::new(e.to_string()))
}

/// Format time span.
pub fn format_time_span(value: &Duration) -> String {
    let mut out = String::with_capacity(24);
    if value.is_negative() {
        out.push('-');
    }

    let secs = value.whole_seconds().unsigned_abs();
    let nanos = value.subsec_nanoseconds().unsigned_abs();
    let days = secs / SECONDS_PER_DAY;
    let rem = secs % SECONDS_PER_DAY;

    if days > 0 {
        out.push_str(itoa::Buffer::new().format(days));
        out.push('.');
    }

    out.push_str(&format!("{:02}:{:02}:{:02}", rem / 3600, rem % 3600 / 60, rem % 60));

    if nanos > 0 {
        let frac = format!("{nanos:09}");
        out.push('.');
        out.push_str(frac.trim_end_matches('0'));
    }

    out
}

/// Parse time span.
pub fn parse_time_span(text: &str) -> Result<Duration, ParseTimeError> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(body) => (true, body),
        None => (false, text),
    };

    // days are separated by `.` that comes before the first `:`
    let colon = body.find(':').ok_or_else(|| ParseTimeError::new("missing `:`"))?;
    let (days, clock) = match body[..colon].split_once('.') {
        Some((days, hours)) => (parse_digits(days)?, hours),
        None => (0, &body[..colon]),
    };
    let hours = parse_digits(clock)?;

    let rest = &body[colon + 1..];
    let (minutes, rest) = rest.split_once(':').ok_or_else(|| ParseTimeError::new("missing seconds"))?;
    let minutes = parse_digits(minutes)?;

    let (seconds, nanos) = match rest.split_once('.') {
        Some((seconds, frac)) => {
            if frac.is_empty() || frac.len() > 9 {
                return Err(ParseTimeError::new("invalid fraction"));
            }
            let scale = 10u64.pow(9 - frac.len() as u32);
            (parse_digits(seconds)?, parse_digits(frac)? * scale)
        }
        None => (parse_digits(rest)?, 0),
    };

    if hours > 23 || minutes > 59 || seconds > 59 {
        return Err(ParseTimeError::new("clock component out of range"));
    }

    let total = days
        .checked_mul(SECONDS_PER_DAY)
        .and_then(|s| s.checked_add(hours * 3600 + minutes * 60 + seconds))
        .ok_or_else(|| ParseTimeError::new("time span overflow"))?;

    let nanos = nanos as i32;
    let duration = match negative {
        // `i64::MIN` magnitude does not fit in positive `i64`
        true if total == i64::MIN.unsigned_abs() => Duration::new(i64::MIN, -nanos),
        true => Duration::new(-to_i64(total)?, -nanos),
        false => Duration::new(to_i64(total)?, nanos),
    };

    Ok(duration)
}

fn parse_digits(text: &str) -> Result<u64, ParseTimeError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseTimeError::new("expected digits"));
    }
    text.parse().map_err(|_| ParseTimeError::new("number overflow"))
}

fn to_i64(value: u64) -> Result<i64, ParseTimeError> {
    i64::try_from(value).map_err(|_| ParseTimeError::new("time span overflow"))
}

reason_error! {
    /// An error when parsing date, time or time span text.
    pub struct ParseTimeError("failed to parse time");
}
