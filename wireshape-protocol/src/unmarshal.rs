/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! The unmarshal side of the structural walker.
//!
//! Both body walkers match wire fields against the shape by *name* at each
//! nesting depth — wire fields arrive in any order — and silently skip
//! fields the shape does not declare, so responses from newer service
//! versions keep decoding.

use std::borrow::Cow;
use thiserror::Error;
use wireshape_json::deserialize::{json_token_iter, skip_value, JsonTokenIterator, Token};
use wireshape_types::instant::Format;
use wireshape_types::primitive::{self, MalformedValueError};
use wireshape_types::shape::{Member, Shape, ShapeKind, WireLocation};
use wireshape_types::{Blob, Instant, Structure, Value};
use wireshape_xml::decode::{Document, ScopedDecoder, XmlError};

use std::iter::Peekable;

/// Client-side decode failures: the response body (or a header) did not
/// match the protocol or the declared shape. Fatal to the current call,
/// distinct from a service-reported error, and never retried.
#[derive(Debug, Error)]
pub enum UnmarshalError {
    #[error("failed to parse JSON body: {0}")]
    Json(#[from] wireshape_json::deserialize::Error),

    #[error("failed to parse XML body: {0}")]
    Xml(#[from] XmlError),

    #[error(transparent)]
    MalformedValue(#[from] MalformedValueError),

    #[error("response body is not valid UTF-8")]
    InvalidUtf8,

    #[error("header `{header}` could not be parsed")]
    Header { header: String },
}

type JsonTokens<'a> = Peekable<JsonTokenIterator<'a>>;

/// Decodes a JSON response body against `shape`.
///
/// Returns `None` when the body's first token is an explicit `null`. An
/// empty body decodes to an empty structure (header members may still
/// populate the result).
pub fn unmarshal_json_body(shape: &Shape, body: &[u8]) -> Result<Option<Structure>, UnmarshalError> {
    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Some(Structure::default()));
    }
    let mut tokens = json_token_iter(body).peekable();
    if let Some(Ok(Token::ValueNull { .. })) = tokens.peek() {
        return Ok(None);
    }
    wireshape_json::deserialize::expect_start_object(tokens.next())?;
    let structure = read_json_structure(&mut tokens, shape)?;
    Ok(Some(structure))
}

/// Reads object fields up to the matching `EndObject`, assuming the
/// `StartObject` token was already consumed.
fn read_json_structure(
    tokens: &mut JsonTokens<'_>,
    shape: &Shape,
) -> Result<Structure, UnmarshalError> {
    let mut builder = Structure::builder();
    loop {
        match tokens.next().transpose()? {
            Some(Token::EndObject { .. }) => break,
            Some(Token::ObjectKey { key, .. }) => {
                let key = key
                    .to_unescaped()
                    .map_err(wireshape_json::deserialize::Error::from)?;
                match shape.body_member_named(&key) {
                    Some(member) => {
                        if let Some(value) = read_json_value(tokens, member, member.kind())? {
                            builder = builder.field(member.name(), value);
                        }
                    }
                    None => skip_value(tokens)?,
                }
            }
            _ => {
                return Err(
                    wireshape_json::deserialize::Error::custom("expected object key or end").into(),
                )
            }
        }
    }
    Ok(builder.build())
}

/// Reads one value of the declared kind. A JSON `null` yields `None`: null
/// wire fields and absent wire fields populate the result identically.
fn read_json_value(
    tokens: &mut JsonTokens<'_>,
    member: &Member,
    kind: &ShapeKind,
) -> Result<Option<Value>, UnmarshalError> {
    let token = tokens.next().transpose()?;
    let token = match token {
        Some(token) => token,
        None => {
            return Err(wireshape_json::deserialize::Error::custom("expected value").into());
        }
    };
    if let Token::ValueNull { .. } = token {
        return Ok(None);
    }
    let value = match (kind, &token) {
        (ShapeKind::Boolean, Token::ValueBool { value, .. }) => Value::Bool(*value),
        (ShapeKind::Integer, Token::ValueNumber { value, .. })
        | (ShapeKind::Float, Token::ValueNumber { value, .. }) => Value::Number(*value),
        (ShapeKind::String, Token::ValueString { value, .. }) => {
            let unescaped = value
                .to_unescaped()
                .map_err(wireshape_json::deserialize::Error::from)?;
            Value::String(unescaped.to_string())
        }
        (ShapeKind::Blob, Token::ValueString { value, .. }) => {
            let unescaped = value
                .to_unescaped()
                .map_err(wireshape_json::deserialize::Error::from)?;
            let blob = Blob::from_base64(&unescaped)
                .map_err(|_| MalformedValueError::new("base64 data", unescaped.as_ref()))?;
            Value::Blob(blob)
        }
        (ShapeKind::Timestamp(_), Token::ValueNumber { value, .. }) => {
            Value::Instant(Instant::from_f64(value.to_f64()))
        }
        (ShapeKind::Timestamp(format), Token::ValueString { value, .. }) => {
            let unescaped = value
                .to_unescaped()
                .map_err(wireshape_json::deserialize::Error::from)?;
            let instant = Instant::from_str(&unescaped, *format)
                .map_err(|_| MalformedValueError::new("a timestamp", unescaped.as_ref()))?;
            Value::Instant(instant)
        }
        (ShapeKind::List(inner), Token::StartArray { .. }) => {
            let mut items = Vec::new();
            loop {
                if let Some(Ok(Token::EndArray { .. })) = tokens.peek() {
                    tokens.next();
                    break;
                }
                match read_json_value(tokens, member, inner)? {
                    Some(item) => items.push(item),
                    // an explicit null element is dropped
                    None => {}
                }
            }
            Value::List(items)
        }
        (ShapeKind::Structure(nested), Token::StartObject { .. }) => {
            Value::Structure(read_json_structure(tokens, nested)?)
        }
        _ => {
            return Err(token
                .error(Cow::Owned(format!(
                    "unexpected token for member `{}`",
                    member.name()
                )))
                .into())
        }
    };
    Ok(Some(value))
}

/// Decodes a REST-XML response body: the root element is the result shape.
pub fn unmarshal_xml_body(shape: &Shape, body: &[u8]) -> Result<Option<Structure>, UnmarshalError> {
    let text = body_str(body)?;
    if text.trim().is_empty() {
        return Ok(Some(Structure::default()));
    }
    let mut doc = Document::new(text);
    let mut root = doc.root()?;
    Ok(Some(read_xml_structure(&mut root, shape)?))
}

/// Decodes a query-protocol response body. The payload is nested as
/// `<{Op}Response><{Op}Result>...</{Op}Result><ResponseMetadata>...`;
/// returns the decoded result plus the request id from the metadata block.
pub fn unmarshal_query_response(
    shape: &Shape,
    operation: &str,
    body: &[u8],
) -> Result<(Structure, Option<String>), UnmarshalError> {
    let text = body_str(body)?;
    if text.trim().is_empty() {
        return Ok((Structure::default(), None));
    }
    let mut doc = Document::new(text);
    let mut root = doc.root()?;
    let result_el = format!("{}Result", operation);
    let mut result = Structure::default();
    let mut request_id = None;
    while let Some(mut child) = root.next_tag()? {
        if child.start_el().matches(&result_el) {
            result = read_xml_structure(&mut child, shape)?;
        } else if child.start_el().matches("ResponseMetadata") {
            while let Some(mut metadata) = child.next_tag()? {
                if metadata.start_el().matches("RequestId") {
                    request_id = Some(metadata.try_data()?.to_string());
                }
            }
        }
        // unknown siblings are dropped unread
    }
    Ok((result, request_id))
}

fn body_str(body: &[u8]) -> Result<&str, UnmarshalError> {
    std::str::from_utf8(body).map_err(|_| UnmarshalError::InvalidUtf8)
}

/// Error dispatch reads typed fields out of an `<Error>` element with the
/// same walker the success path uses.
pub(crate) fn read_xml_error_structure(
    scope: &mut ScopedDecoder<'_, '_>,
    shape: &Shape,
) -> Result<Structure, UnmarshalError> {
    read_xml_structure(scope, shape)
}

fn read_xml_structure(
    scope: &mut ScopedDecoder<'_, '_>,
    shape: &Shape,
) -> Result<Structure, UnmarshalError> {
    let mut builder = Structure::builder();
    while let Some(mut child) = scope.next_tag()? {
        let name = child.start_el().local().to_string();
        match shape.body_member_named(&name) {
            Some(member) => {
                let value = read_xml_value(&mut child, member, member.kind())?;
                builder = builder.field(member.name(), value);
            }
            // unknown elements are skipped wholesale when `child` drops
            None => {}
        }
    }
    Ok(builder.build())
}

fn read_xml_value(
    scope: &mut ScopedDecoder<'_, '_>,
    member: &Member,
    kind: &ShapeKind,
) -> Result<Value, UnmarshalError> {
    let value = match kind {
        ShapeKind::String => Value::String(scope.try_data()?.to_string()),
        ShapeKind::Boolean => {
            let data = scope.try_data()?;
            Value::Bool(primitive::parse_boolean(data.trim())?)
        }
        ShapeKind::Integer => {
            let data = scope.try_data()?;
            Value::from(primitive::parse_integer(data.trim())?)
        }
        ShapeKind::Float => {
            let data = scope.try_data()?;
            Value::from(primitive::parse_float(data.trim())?)
        }
        ShapeKind::Blob => {
            let data = scope.try_data()?;
            let blob = Blob::from_base64(data.trim())
                .map_err(|_| MalformedValueError::new("base64 data", data.trim()))?;
            Value::Blob(blob)
        }
        ShapeKind::Timestamp(format) => {
            let data = scope.try_data()?;
            let instant = Instant::from_str(data.trim(), *format)
                .map_err(|_| MalformedValueError::new("a timestamp", data.trim()))?;
            Value::Instant(instant)
        }
        ShapeKind::List(inner) => {
            let mut items = Vec::new();
            while let Some(mut entry) = scope.next_tag()? {
                items.push(read_xml_value(&mut entry, member, inner)?);
            }
            Value::List(items)
        }
        ShapeKind::Structure(nested) => Value::Structure(read_xml_structure(scope, nested)?),
    };
    Ok(value)
}

/// Populates header-located output members from the response headers.
/// Missing headers simply leave the member unset.
pub fn read_header_members(
    shape: &Shape,
    headers: &http::HeaderMap,
    builder: wireshape_types::StructureBuilder,
) -> Result<wireshape_types::StructureBuilder, UnmarshalError> {
    let mut builder = builder;
    for member in shape.members_at(WireLocation::Header) {
        let header_error = || UnmarshalError::Header {
            header: member.location_name().to_string(),
        };
        let raw = match headers.get(member.location_name()) {
            Some(value) => value.to_str().map_err(|_| header_error())?,
            None => continue,
        };
        let value = match member.kind() {
            ShapeKind::String => Value::String(raw.to_string()),
            ShapeKind::Boolean => Value::Bool(primitive::parse_boolean(raw.trim())?),
            ShapeKind::Integer => Value::from(primitive::parse_integer(raw.trim())?),
            ShapeKind::Float => Value::from(primitive::parse_float(raw.trim())?),
            ShapeKind::Blob => Value::Blob(
                Blob::from_base64(raw.trim())
                    .map_err(|_| MalformedValueError::new("base64 data", raw.trim()))?,
            ),
            ShapeKind::Timestamp(_) => {
                // Header dates are HTTP dates regardless of the body format
                let instant =
                    Instant::from_str(raw.trim(), Format::HttpDate).map_err(|_| header_error())?;
                Value::Instant(instant)
            }
            ShapeKind::List(_) | ShapeKind::Structure(_) => {
                let values =
                    wireshape_http::header::read_many::<String>(headers, member.location_name())
                        .map_err(|_| header_error())?;
                Value::List(values.into_iter().map(Value::String).collect())
            }
        };
        builder = builder.field(member.name(), value);
    }
    Ok(builder)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use wireshape_types::shape::{Member, Shape, ShapeKind, WireLocation};

    fn interconnect_shape() -> Arc<Shape> {
        Shape::builder("CreateInterconnectResult")
            .add(Member::new(
                "interconnectId",
                WireLocation::BodyField,
                ShapeKind::String,
            ))
            .add(Member::new(
                "bandwidth",
                WireLocation::BodyField,
                ShapeKind::String,
            ))
            .add(Member::new(
                "vlanCount",
                WireLocation::BodyField,
                ShapeKind::Integer,
            ))
            .build()
    }

    #[test]
    fn decodes_known_fields() {
        let body = br#"{"interconnectId":"id1","bandwidth":"1Gbps"}"#;
        let result = unmarshal_json_body(&interconnect_shape(), body)
            .unwrap()
            .unwrap();
        assert_eq!(result.get_str("interconnectId"), Some("id1"));
        assert_eq!(result.get_str("bandwidth"), Some("1Gbps"));
        assert_eq!(result.get("vlanCount"), None);
    }

    #[test]
    fn null_body_decodes_to_none() {
        assert!(unmarshal_json_body(&interconnect_shape(), b"null")
            .unwrap()
            .is_none());
    }

    #[test]
    fn empty_body_decodes_to_empty_structure() {
        let result = unmarshal_json_body(&interconnect_shape(), b"").unwrap().unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn unknown_fields_are_skipped() {
        let body = br#"{"brandNew":{"deep":[1,2,{"x":null}]},"interconnectId":"id1","alsoNew":[[]]}"#;
        let result = unmarshal_json_body(&interconnect_shape(), body)
            .unwrap()
            .unwrap();
        assert_eq!(result.get_str("interconnectId"), Some("id1"));
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn null_fields_stay_unset() {
        let body = br#"{"interconnectId":null,"bandwidth":"1Gbps"}"#;
        let result = unmarshal_json_body(&interconnect_shape(), body)
            .unwrap()
            .unwrap();
        assert_eq!(result.get("interconnectId"), None);
        assert_eq!(result.get_str("bandwidth"), Some("1Gbps"));
    }

    #[test]
    fn malformed_integer_is_fatal() {
        let body = br#"{"vlanCount":"not-a-number"}"#;
        let err = unmarshal_json_body(&interconnect_shape(), body).unwrap_err();
        assert!(matches!(err, UnmarshalError::Json(_)), "{:?}", err);
    }

    #[test]
    fn nested_lists_of_structures() {
        let tag = Shape::builder("Tag")
            .add(Member::new("key", WireLocation::BodyField, ShapeKind::String))
            .add(Member::new(
                "values",
                WireLocation::BodyField,
                ShapeKind::List(Box::new(ShapeKind::String)),
            ))
            .build();
        let shape = Shape::builder("DescribeTagsResult")
            .add(Member::new(
                "tags",
                WireLocation::BodyField,
                ShapeKind::List(Box::new(ShapeKind::Structure(tag))),
            ))
            .build();
        // sibling fields interleave with nested lists at the same depth,
        // and field order differs between elements
        let body = br#"{
            "tags": [
                {"key":"a","values":["1","2"],"unknown":{"k":[true]}},
                {"values":["3"],"key":"b"}
            ],
            "ignored": 5
        }"#;
        let result = unmarshal_json_body(&shape, body).unwrap().unwrap();
        let tags = result.get_list("tags").unwrap();
        assert_eq!(tags.len(), 2);
        match (&tags[0], &tags[1]) {
            (Value::Structure(first), Value::Structure(second)) => {
                assert_eq!(first.get_str("key"), Some("a"));
                assert_eq!(
                    first.get_list("values").map(|v| v.len()),
                    Some(2)
                );
                assert_eq!(second.get_str("key"), Some("b"));
                assert_eq!(second.get_list("values").map(|v| v.len()), Some(1));
            }
            other => panic!("unexpected tag values: {:?}", other),
        }
    }

    #[test]
    fn query_response_with_request_id() {
        let shape = Shape::builder("DeleteCertificateResult")
            .add(Member::new(
                "status",
                WireLocation::BodyField,
                ShapeKind::String,
            ))
            .build();
        let body = br#"<DeleteCertificateResponse xmlns="https://example.com/doc/">
            <DeleteCertificateResult><status>DELETED</status></DeleteCertificateResult>
            <ResponseMetadata><RequestId>abc-123</RequestId></ResponseMetadata>
        </DeleteCertificateResponse>"#;
        let (result, request_id) =
            unmarshal_query_response(&shape, "DeleteCertificate", body).unwrap();
        assert_eq!(result.get_str("status"), Some("DELETED"));
        assert_eq!(request_id.as_deref(), Some("abc-123"));
    }

    #[test]
    fn xml_unknown_elements_are_skipped() {
        let shape = Shape::builder("GetWidgetResult")
            .add(Member::new("id", WireLocation::BodyField, ShapeKind::String))
            .build();
        let body = br#"<GetWidgetResult>
            <novel><deep><deeper>x</deeper></deep></novel>
            <id>w-1</id>
        </GetWidgetResult>"#;
        let result = unmarshal_xml_body(&shape, body).unwrap().unwrap();
        assert_eq!(result.get_str("id"), Some("w-1"));
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn xml_wrapped_lists() {
        let shape = Shape::builder("ListWidgetsResult")
            .add(Member::new(
                "ids",
                WireLocation::BodyField,
                ShapeKind::List(Box::new(ShapeKind::Integer)),
            ))
            .build();
        let body = br#"<ListWidgetsResult><ids><member>1</member><member>2</member></ids></ListWidgetsResult>"#;
        let result = unmarshal_xml_body(&shape, body).unwrap().unwrap();
        let ids = result.get_list("ids").unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], Value::from(1i64));
    }

    #[test]
    fn header_members_populate_result() {
        let shape = Shape::builder("HeadObjectResult")
            .add(
                Member::new("contentType", WireLocation::Header, ShapeKind::String)
                    .renamed("Content-Type"),
            )
            .add(
                Member::new(
                    "lastModified",
                    WireLocation::Header,
                    ShapeKind::Timestamp(Format::HttpDate),
                )
                .renamed("Last-Modified"),
            )
            .build();
        let mut headers = http::HeaderMap::new();
        headers.insert("content-type", "application/json".parse().unwrap());
        headers.insert(
            "last-modified",
            "Mon, 16 Dec 2019 23:48:18 GMT".parse().unwrap(),
        );
        let result = read_header_members(&shape, &headers, Structure::builder())
            .unwrap()
            .build();
        assert_eq!(result.get_str("contentType"), Some("application/json"));
        assert_eq!(
            result.get_instant("lastModified"),
            Some(Instant::from_epoch_seconds(1576540098))
        );
    }
}
