/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

use std::fmt;

#[derive(Debug, Eq, PartialEq)]
pub enum DateParseError {
    Invalid(&'static str),
    IntParseError,
}

impl fmt::Display for DateParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateParseError::Invalid(reason) => write!(f, "invalid date: {}", reason),
            DateParseError::IntParseError => write!(f, "invalid date: integer field unparseable"),
        }
    }
}

impl std::error::Error for DateParseError {}

fn parse_slice<T>(ascii_slice: &[u8]) -> Result<T, DateParseError>
where
    T: std::str::FromStr,
{
    let as_str = std::str::from_utf8(ascii_slice).map_err(|_| DateParseError::IntParseError)?;
    as_str
        .parse::<T>()
        .map_err(|_| DateParseError::IntParseError)
}

/// Parses a fractional-seconds suffix (digits after a `.`) into nanoseconds.
/// At most 9 digits of precision are representable.
fn parse_subsecond_nanos(digits: &[u8]) -> Result<u32, DateParseError> {
    if digits.is_empty() {
        return Err(DateParseError::IntParseError);
    }
    if digits.len() > 9 {
        return Err(DateParseError::Invalid("too much subsecond precision"));
    }
    let fraction: u32 = parse_slice(digits)?;
    let mut scale = 1u32;
    for _ in digits.len()..9 {
        scale *= 10;
    }
    Ok(fraction * scale)
}

fn push_digit(out: &mut String, digit: u8) {
    out.push((b'0' + digit) as char);
}

fn push_two_digits(out: &mut String, value: u8) {
    push_digit(out, value / 10);
    push_digit(out, value % 10);
}

pub mod http_date {
    use super::{parse_slice, push_digit, push_two_digits, DateParseError};
    use crate::instant::datetime::{CivilDateTime, NANOS_PER_SECOND};
    use crate::Instant;

    /// Ok: "Mon, 16 Dec 2019 23:48:18 GMT"
    /// Ok: "Mon, 16 Dec 2019 23:48:18.123 GMT"
    /// Ok: "Mon, 16 Dec 2019 23:48:18.12 GMT"
    /// Not Ok: "Mon, 16 Dec 2019 23:48:18.1234 GMT"
    pub fn format(instant: &Instant) -> String {
        let date = CivilDateTime::from_epoch_secs(instant.epoch_seconds(), instant.subsec_nanos());
        let weekday = match date.wday {
            1 => "Mon",
            2 => "Tue",
            3 => "Wed",
            4 => "Thu",
            5 => "Fri",
            6 => "Sat",
            7 => "Sun",
            _ => unreachable!(),
        };
        let month = match date.mon {
            1 => "Jan",
            2 => "Feb",
            3 => "Mar",
            4 => "Apr",
            5 => "May",
            6 => "Jun",
            7 => "Jul",
            8 => "Aug",
            9 => "Sep",
            10 => "Oct",
            11 => "Nov",
            12 => "Dec",
            _ => unreachable!(),
        };
        let mut out = String::with_capacity(34);
        out.push_str(weekday);
        out.push_str(", ");
        push_two_digits(&mut out, date.day);
        out.push(' ');
        out.push_str(month);
        out.push(' ');
        push_two_digits(&mut out, (date.year / 100) as u8);
        push_two_digits(&mut out, (date.year % 100) as u8);
        out.push(' ');
        push_two_digits(&mut out, date.hour);
        out.push(':');
        push_two_digits(&mut out, date.min);
        out.push(':');
        push_two_digits(&mut out, date.sec);
        if date.nanos != 0 {
            // HTTP dates carry at most millisecond precision
            out.push('.');
            push_digit(&mut out, (date.nanos / (NANOS_PER_SECOND / 10)) as u8);
            push_digit(&mut out, (date.nanos / (NANOS_PER_SECOND / 100) % 10) as u8);
            push_digit(&mut out, (date.nanos / (NANOS_PER_SECOND / 1000) % 10) as u8);
        }
        out.push_str(" GMT");
        out
    }

    pub fn parse(s: &str) -> Result<Instant, DateParseError> {
        if !s.is_ascii() {
            return Err(DateParseError::Invalid("not ascii"));
        }
        let x = s.trim().as_bytes();
        let date = parse_imf_fixdate(x)?;
        if !date.is_valid() {
            return Err(DateParseError::Invalid("invalid date"));
        }
        let (epoch_secs, nanos) = date.to_epoch_secs();
        Ok(Instant::from_secs_and_nanos(epoch_secs, nanos))
    }

    fn parse_imf_fixdate(s: &[u8]) -> Result<CivilDateTime, DateParseError> {
        // Example: `Sun, 06 Nov 1994 08:49:37 GMT`
        if s.len() < 29
            || s.len() > 33
            || !s.ends_with(b" GMT")
            || s[16] != b' '
            || s[19] != b':'
            || s[22] != b':'
        {
            return Err(DateParseError::Invalid("incorrectly shaped string"));
        }
        let nanos: u32 = match &s[25] {
            b'.' => {
                let fraction_slice = &s[26..s.len() - 4];
                if fraction_slice.len() > 3 {
                    // Only thousandths are supported
                    return Err(DateParseError::Invalid("too much precision"));
                }
                super::parse_subsecond_nanos(fraction_slice)?
            }
            b' ' => 0,
            _ => return Err(DateParseError::Invalid("incorrectly shaped string")),
        };
        let wday = match &s[..5] {
            b"Mon, " => 1,
            b"Tue, " => 2,
            b"Wed, " => 3,
            b"Thu, " => 4,
            b"Fri, " => 5,
            b"Sat, " => 6,
            b"Sun, " => 7,
            _ => return Err(DateParseError::Invalid("invalid weekday")),
        };
        let mon = match &s[7..12] {
            b" Jan " => 1,
            b" Feb " => 2,
            b" Mar " => 3,
            b" Apr " => 4,
            b" May " => 5,
            b" Jun " => 6,
            b" Jul " => 7,
            b" Aug " => 8,
            b" Sep " => 9,
            b" Oct " => 10,
            b" Nov " => 11,
            b" Dec " => 12,
            _ => return Err(DateParseError::Invalid("invalid month")),
        };
        Ok(CivilDateTime {
            nanos,
            sec: parse_slice(&s[23..25])?,
            min: parse_slice(&s[20..22])?,
            hour: parse_slice(&s[17..19])?,
            day: parse_slice(&s[5..7])?,
            mon,
            year: parse_slice(&s[12..16])?,
            wday,
        })
    }
}

pub mod date_time {
    use super::{parse_slice, push_two_digits, DateParseError};
    use crate::instant::datetime::CivilDateTime;
    use crate::Instant;

    /// Ok: "2019-12-16T23:48:18Z"
    /// Ok: "2019-12-16T23:48:18.52Z"
    /// Trailing zeros in the fraction are trimmed.
    pub fn format(instant: &Instant) -> String {
        let date = CivilDateTime::from_epoch_secs(instant.epoch_seconds(), instant.subsec_nanos());
        let mut out = String::with_capacity(30);
        push_two_digits(&mut out, (date.year / 100) as u8);
        push_two_digits(&mut out, (date.year % 100) as u8);
        out.push('-');
        push_two_digits(&mut out, date.mon);
        out.push('-');
        push_two_digits(&mut out, date.day);
        out.push('T');
        push_two_digits(&mut out, date.hour);
        out.push(':');
        push_two_digits(&mut out, date.min);
        out.push(':');
        push_two_digits(&mut out, date.sec);
        if date.nanos != 0 {
            let fraction = format!("{:09}", date.nanos);
            out.push('.');
            out.push_str(fraction.trim_end_matches('0'));
        }
        out.push('Z');
        out
    }

    pub fn parse(s: &str) -> Result<Instant, DateParseError> {
        if !s.is_ascii() {
            return Err(DateParseError::Invalid("not ascii"));
        }
        let x = s.trim().as_bytes();
        // Shortest form: `2019-12-16T23:48:18Z`
        if x.len() < 20
            || x[4] != b'-'
            || x[7] != b'-'
            || (x[10] != b'T' && x[10] != b't')
            || x[13] != b':'
            || x[16] != b':'
            || !(x.ends_with(b"Z") || x.ends_with(b"z"))
        {
            return Err(DateParseError::Invalid("incorrectly shaped string"));
        }
        let nanos: u32 = match x.get(19) {
            Some(b'.') => super::parse_subsecond_nanos(&x[20..x.len() - 1])?,
            Some(b'Z') | Some(b'z') => 0,
            _ => return Err(DateParseError::Invalid("incorrectly shaped string")),
        };
        let date = CivilDateTime {
            nanos,
            sec: parse_slice(&x[17..19])?,
            min: parse_slice(&x[14..16])?,
            hour: parse_slice(&x[11..13])?,
            day: parse_slice(&x[8..10])?,
            mon: parse_slice(&x[5..7])?,
            year: parse_slice(&x[0..4])?,
            // wday is derived data; recomputing it from the other fields
            // would only matter for validity checking
            wday: 1,
        };
        if !date.is_valid() {
            return Err(DateParseError::Invalid("invalid date"));
        }
        let (epoch_secs, nanos) = date.to_epoch_secs();
        Ok(Instant::from_secs_and_nanos(epoch_secs, nanos))
    }
}

pub mod epoch_seconds {
    use super::DateParseError;
    use crate::Instant;

    /// Ok: "1576540098"
    /// Ok: "1576540098.52"
    pub fn parse(s: &str) -> Result<Instant, DateParseError> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| DateParseError::IntParseError)?;
        if !value.is_finite() {
            return Err(DateParseError::Invalid("not a finite number"));
        }
        Ok(Instant::from_f64(value))
    }
}
