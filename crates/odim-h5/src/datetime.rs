//! Date/time pairs as the convention stores them.
//!
//! A timestamp is split into a `YYYYMMDD` date string and an `HHMMSS` time
//! string, both in UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use thiserror::Error;

/// `strftime` format of the date half.
pub const DATE_FORMAT: &str = "%Y%m%d";
/// `strftime` format of the time half.
pub const TIME_FORMAT: &str = "%H%M%S";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateTimeError {
    #[error("invalid date '{0}', expected YYYYMMDD")]
    InvalidDate(String),

    #[error("invalid time '{0}', expected HHMMSS")]
    InvalidTime(String),
}

fn all_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

pub fn parse_date(date: &str) -> Result<NaiveDate, DateTimeError> {
    if !all_digits(date, 8) {
        return Err(DateTimeError::InvalidDate(date.to_string()));
    }
    NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|_| DateTimeError::InvalidDate(date.to_string()))
}

pub fn parse_time(time: &str) -> Result<NaiveTime, DateTimeError> {
    if !all_digits(time, 6) {
        return Err(DateTimeError::InvalidTime(time.to_string()));
    }
    NaiveTime::parse_from_str(time, TIME_FORMAT)
        .map_err(|_| DateTimeError::InvalidTime(time.to_string()))
}

/// Join a date and a time string into a UTC timestamp.
pub fn combine(date: &str, time: &str) -> Result<DateTime<Utc>, DateTimeError> {
    let naive = NaiveDateTime::new(parse_date(date)?, parse_time(time)?);
    Ok(naive.and_utc())
}

/// Split a UTC timestamp into its date and time strings.
pub fn split(timestamp: &DateTime<Utc>) -> (String, String) {
    (
        timestamp.format(DATE_FORMAT).to_string(),
        timestamp.format(TIME_FORMAT).to_string(),
    )
}
