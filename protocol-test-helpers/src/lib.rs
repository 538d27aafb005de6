/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Assertion helpers for protocol tests: query-string and body comparisons
//! that produce readable failures instead of giant string diffs.

use assert_json_diff::assert_json_eq_no_panic;
use http::Request;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolTestFailure {
    #[error("missing query param: expected `{expected}`, found {found:?}")]
    MissingQueryParam {
        expected: String,
        found: Vec<String>,
    },
    #[error("forbidden query param present: `{forbidden}`")]
    ForbiddenQueryParam { forbidden: String },
    #[error("body did not match. {comparison}")]
    BodyDidNotMatch { comparison: String },
    #[error("expected `{expected}` to be a valid {expected_format}: {found}")]
    InvalidBodyFormat {
        expected: String,
        expected_format: &'static str,
        found: String,
    },
}

fn extract_params(uri: &http::Uri) -> Vec<&str> {
    uri.query().unwrap_or_default().split('&').collect()
}

/// Checks that the request's query string contains every `key=value` pair in
/// `expected_params` (other parameters may also be present).
pub fn validate_query_string<B>(
    request: &Request<B>,
    expected_params: &[&str],
) -> Result<(), ProtocolTestFailure> {
    let actual_params = extract_params(request.uri());
    for param in expected_params {
        if !actual_params.contains(param) {
            return Err(ProtocolTestFailure::MissingQueryParam {
                expected: param.to_string(),
                found: actual_params.iter().map(|s| s.to_string()).collect(),
            });
        }
    }
    Ok(())
}

/// Checks that no query parameter with any of the given names is present.
pub fn forbid_query_params<B>(
    request: &Request<B>,
    forbid_params: &[&str],
) -> Result<(), ProtocolTestFailure> {
    for param in extract_params(request.uri()) {
        let name = param.split('=').next().unwrap_or(param);
        if forbid_params.contains(&name) {
            return Err(ProtocolTestFailure::ForbiddenQueryParam {
                forbidden: name.to_string(),
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    /// JSON-equivalence comparison: key order and whitespace are ignored
    Json,
    /// Form-encoded comparison: `&`-separated pairs, order ignored
    UrlEncodedForm,
    /// Byte-for-byte comparison
    Other,
}

/// Compares a request body against the expectation, by media type.
pub fn validate_body(
    actual: &[u8],
    expected: &str,
    media_type: MediaType,
) -> Result<(), ProtocolTestFailure> {
    match media_type {
        MediaType::Json => {
            let actual_json: serde_json::Value =
                serde_json::from_slice(actual).map_err(|err| {
                    ProtocolTestFailure::InvalidBodyFormat {
                        expected: String::from_utf8_lossy(actual).to_string(),
                        expected_format: "JSON",
                        found: err.to_string(),
                    }
                })?;
            let expected_json: serde_json::Value =
                serde_json::from_str(expected).map_err(|err| {
                    ProtocolTestFailure::InvalidBodyFormat {
                        expected: expected.to_string(),
                        expected_format: "JSON",
                        found: err.to_string(),
                    }
                })?;
            assert_json_eq_no_panic(&actual_json, &expected_json).map_err(|comparison| {
                ProtocolTestFailure::BodyDidNotMatch { comparison }
            })
        }
        MediaType::UrlEncodedForm => {
            let mut actual_pairs: Vec<&str> =
                std::str::from_utf8(actual).unwrap_or("").split('&').collect();
            let mut expected_pairs: Vec<&str> = expected.split('&').collect();
            actual_pairs.sort_unstable();
            expected_pairs.sort_unstable();
            if actual_pairs != expected_pairs {
                return Err(ProtocolTestFailure::BodyDidNotMatch {
                    comparison: format!(
                        "expected pairs {:?}, got {:?}",
                        expected_pairs, actual_pairs
                    ),
                });
            }
            Ok(())
        }
        MediaType::Other => {
            if actual != expected.as_bytes() {
                return Err(ProtocolTestFailure::BodyDidNotMatch {
                    comparison: format!(
                        "expected `{}`, got `{}`",
                        expected,
                        String::from_utf8_lossy(actual)
                    ),
                });
            }
            Ok(())
        }
    }
}

/// Unwraps a validation result with a readable panic message.
pub fn assert_ok(inp: Result<(), ProtocolTestFailure>) {
    if let Err(failure) = inp {
        panic!("protocol test failed: {}", failure);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn query_string_validation() {
        let request = http::Request::builder()
            .uri("/path?a=1&b=two")
            .body(())
            .unwrap();
        assert_ok(validate_query_string(&request, &["a=1"]));
        assert_ok(validate_query_string(&request, &["b=two", "a=1"]));
        validate_query_string(&request, &["c=3"]).expect_err("missing param");
        assert_ok(forbid_query_params(&request, &["c"]));
        forbid_query_params(&request, &["a"]).expect_err("forbidden param");
    }

    #[test]
    fn json_body_comparison_ignores_order() {
        assert_ok(validate_body(
            br#"{"a":1,"b":[2,3]}"#,
            r#"{"b":[2,3],"a":1}"#,
            MediaType::Json,
        ));
        validate_body(br#"{"a":1}"#, r#"{"a":2}"#, MediaType::Json).expect_err("different values");
        validate_body(b"not json", r#"{}"#, MediaType::Json).expect_err("invalid json");
    }

    #[test]
    fn form_body_comparison_ignores_order() {
        assert_ok(validate_body(
            b"Action=Delete&Version=2020",
            "Version=2020&Action=Delete",
            MediaType::UrlEncodedForm,
        ));
        validate_body(
            b"Action=Delete",
            "Action=Create",
            MediaType::UrlEncodedForm,
        )
        .expect_err("different pairs");
    }
}
