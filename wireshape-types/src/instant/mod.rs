/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

use std::time::{SystemTime, UNIX_EPOCH};

pub mod datetime;
pub mod format;

pub use self::format::DateParseError;

/// A point in time, stored as epoch seconds plus subsecond nanos.
///
/// An `Instant` has no attached wire representation; each of the three wire
/// formats in [`Format`] can render or parse it. Formatting is deterministic
/// and timezone independent (always UTC).
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Instant {
    seconds: i64,
    subsecond_nanos: u32,
}

impl Instant {
    pub fn from_epoch_seconds(epoch_seconds: i64) -> Self {
        Instant {
            seconds: epoch_seconds,
            subsecond_nanos: 0,
        }
    }

    pub fn from_fractional_seconds(epoch_seconds: i64, fraction: f64) -> Self {
        Instant {
            seconds: epoch_seconds,
            subsecond_nanos: (fraction * 1_000_000_000_f64).round() as u32,
        }
    }

    pub fn from_secs_and_nanos(seconds: i64, subsecond_nanos: u32) -> Self {
        Instant {
            seconds,
            subsecond_nanos,
        }
    }

    pub fn from_f64(epoch_seconds: f64) -> Self {
        let seconds = epoch_seconds.floor() as i64;
        let rem = epoch_seconds - epoch_seconds.floor();
        Instant::from_fractional_seconds(seconds, rem)
    }

    pub fn from_system_time(system_time: SystemTime) -> Self {
        let duration = system_time
            .duration_since(UNIX_EPOCH)
            .expect("SystemTime can never represent a time before the Unix Epoch");
        Instant {
            seconds: duration.as_secs() as i64,
            subsecond_nanos: duration.subsec_nanos(),
        }
    }

    pub fn from_str(s: &str, format: Format) -> Result<Self, DateParseError> {
        match format {
            Format::DateTime => format::date_time::parse(s),
            Format::HttpDate => format::http_date::parse(s),
            Format::EpochSeconds => format::epoch_seconds::parse(s),
        }
    }

    /// Reads one date out of a delimited string, returning the parsed value
    /// and the remainder.
    ///
    /// HTTP dates contain the delimiter comma themselves, so for
    /// [`Format::HttpDate`] the split point is located after the terminal
    /// `GMT` rather than at the first delimiter.
    pub fn read(s: &str, format: Format, delim: char) -> Result<(Self, &str), DateParseError> {
        let (head, rest) = match format {
            Format::HttpDate => match s.find(" GMT") {
                Some(idx) => s.split_at(idx + 4),
                None => (s, ""),
            },
            _ => match s.find(delim) {
                Some(idx) => s.split_at(idx),
                None => (s, ""),
            },
        };
        let value = Self::from_str(head.trim(), format)?;
        let rest = rest
            .strip_prefix(delim)
            .unwrap_or(rest)
            .trim_start_matches(' ');
        Ok((value, rest))
    }

    pub fn has_nanos(&self) -> bool {
        self.subsecond_nanos != 0
    }

    pub fn subsec_nanos(&self) -> u32 {
        self.subsecond_nanos
    }

    pub fn epoch_fractional_seconds(&self) -> f64 {
        self.seconds as f64 + self.subsecond_nanos as f64 / 1_000_000_000_f64
    }

    pub fn epoch_seconds(&self) -> i64 {
        self.seconds
    }

    pub fn fmt(&self, format: Format) -> String {
        match format {
            Format::DateTime => format::date_time::format(self),
            Format::EpochSeconds => {
                if self.subsecond_nanos == 0 {
                    format!("{}", self.seconds)
                } else {
                    let fraction = format!("{:0>9}", self.subsecond_nanos);
                    format!("{}.{}", self.seconds, fraction.trim_end_matches('0'))
                }
            }
            Format::HttpDate => format::http_date::format(self),
        }
    }
}

/// The textual wire representations of a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// ISO-8601 / RFC-3339, e.g. `2019-12-16T23:48:18Z`
    DateTime,
    /// RFC-1123, e.g. `Mon, 16 Dec 2019 23:48:18 GMT`
    HttpDate,
    /// Unix epoch seconds with optional decimal fraction, e.g. `1576540098.52`
    EpochSeconds,
}

#[cfg(test)]
mod test {
    use super::{Format, Instant};

    #[test]
    fn parse_epoch_seconds() {
        assert_eq!(
            Instant::from_str("1576540098", Format::EpochSeconds),
            Ok(Instant::from_epoch_seconds(1576540098))
        );
        let fractional = Instant::from_str("1576540098.52", Format::EpochSeconds).unwrap();
        assert_eq!(fractional.epoch_seconds(), 1576540098);
        assert!((fractional.epoch_fractional_seconds() - 1576540098.52).abs() < 1e-6);
        assert!(Instant::from_str("not-a-number", Format::EpochSeconds).is_err());
    }

    #[test]
    fn read_delimited_dates() {
        let (first, rest) = Instant::read(
            "Mon, 16 Dec 2019 23:48:18 GMT,Tue, 17 Dec 2019 01:02:03 GMT",
            Format::HttpDate,
            ',',
        )
        .unwrap();
        assert_eq!(first, Instant::from_epoch_seconds(1576540098));
        let (second, rest) = Instant::read(rest, Format::HttpDate, ',').unwrap();
        assert_eq!(second.fmt(Format::HttpDate), "Tue, 17 Dec 2019 01:02:03 GMT");
        assert_eq!(rest, "");
    }

    #[test]
    fn read_delimited_iso_dates() {
        let (first, rest) =
            Instant::read("2019-12-16T23:48:18Z,2020-01-01T00:00:00Z", Format::DateTime, ',')
                .unwrap();
        assert_eq!(first, Instant::from_epoch_seconds(1576540098));
        let (second, rest) = Instant::read(rest, Format::DateTime, ',').unwrap();
        assert_eq!(second.fmt(Format::DateTime), "2020-01-01T00:00:00Z");
        assert_eq!(rest, "");
    }
}
