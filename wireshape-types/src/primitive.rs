/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Text codecs for the scalar wire types.
//!
//! These cover the representations shared by every protocol: query-string
//! parameters, URI path segments, and HTTP header values all carry scalars
//! as plain text. The JSON and XML walkers layer their own framing on top.

use std::fmt;

/// The wire text could not be parsed as the declared kind.
///
/// This is a client-side schema mismatch: it is fatal to the unmarshal call
/// that encountered it and is never retried.
#[derive(Debug, PartialEq, Eq)]
pub struct MalformedValueError {
    expected: &'static str,
    text: String,
}

impl MalformedValueError {
    pub fn new(expected: &'static str, text: impl Into<String>) -> Self {
        MalformedValueError {
            expected,
            text: text.into(),
        }
    }

    pub fn expected(&self) -> &'static str {
        self.expected
    }
}

impl fmt::Display for MalformedValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, got {:?}", self.expected, self.text)
    }
}

impl std::error::Error for MalformedValueError {}

pub fn fmt_boolean(value: bool) -> &'static str {
    match value {
        true => "true",
        false => "false",
    }
}

pub fn parse_boolean(text: &str) -> Result<bool, MalformedValueError> {
    match text {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(MalformedValueError::new("`true` or `false`", other)),
    }
}

pub fn fmt_integer(value: i64) -> String {
    // itoa::Buffer is a fixed-size stack allocation, so this is cheap
    itoa::Buffer::new().format(value).to_string()
}

pub fn parse_integer(text: &str) -> Result<i64, MalformedValueError> {
    text.parse()
        .map_err(|_| MalformedValueError::new("an integer", text))
}

pub fn fmt_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "Infinity".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        ryu::Buffer::new().format_finite(value).to_string()
    }
}

pub fn parse_float(text: &str) -> Result<f64, MalformedValueError> {
    match text {
        "NaN" => Ok(f64::NAN),
        "Infinity" => Ok(f64::INFINITY),
        "-Infinity" => Ok(f64::NEG_INFINITY),
        other => other
            .parse()
            .map_err(|_| MalformedValueError::new("a number", text)),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn booleans() {
        assert_eq!(fmt_boolean(true), "true");
        assert_eq!(parse_boolean("false"), Ok(false));
        assert!(parse_boolean("TRUE").is_err());
        assert!(parse_boolean("1").is_err());
    }

    #[test]
    fn integers() {
        assert_eq!(fmt_integer(-42), "-42");
        assert_eq!(parse_integer("-42"), Ok(-42));
        assert!(parse_integer("12ef3").is_err());
        assert!(parse_integer("").is_err());
    }

    #[test]
    fn floats() {
        assert_eq!(fmt_float(-1.2), "-1.2");
        assert_eq!(fmt_float(f64::NAN), "NaN");
        assert_eq!(fmt_float(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(parse_float("-1.2"), Ok(-1.2));
        assert!(parse_float("NaN").unwrap().is_nan());
        assert!(parse_float("one").is_err());
    }

    use proptest::prelude::*;
    proptest! {
        #[test]
        fn integer_round_trip(value: i64) {
            assert_eq!(parse_integer(&fmt_integer(value)), Ok(value));
        }

        #[test]
        fn finite_float_round_trip(value: f64) {
            prop_assume!(value.is_finite());
            assert_eq!(parse_float(&fmt_float(value)), Ok(value));
        }
    }
}
