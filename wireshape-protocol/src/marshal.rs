/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! The marshal side of the structural walker: binds each input member to its
//! wire location (URI path, query string, header, or body) and dresses the
//! request for the factory's protocol.

use crate::factory::{Protocol, ProtocolFactory};
use crate::operation::OperationShape;
use crate::uri;
use std::collections::HashMap;
use thiserror::Error;
use wireshape_http::body::WireBody;
use wireshape_http::operation::Request;
use wireshape_json::serialize::{JsonArrayWriter, JsonObjectWriter};
use wireshape_query::{QueryValueWriter, QueryWriter};
use wireshape_types::instant::Format;
use wireshape_types::primitive;
use wireshape_types::shape::{Member, Shape, ShapeKind, WireLocation};
use wireshape_types::{Number, Structure, Value};
use wireshape_xml::encode::{ScopeWriter, XmlWriter};

/// Caller/precondition failures. These are raised before any I/O happens
/// and are never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarshalError {
    #[error("required member `{member}` of `{shape}` is unset")]
    MissingMember { shape: String, member: String },

    #[error("member `{member}` does not match its declared kind")]
    KindMismatch { member: String },

    #[error("URI template placeholder `{{{placeholder}}}` has no matching member")]
    UnresolvedPlaceholder { placeholder: String },

    #[error("URI template is malformed: unterminated placeholder")]
    MalformedUriTemplate,

    #[error("marshalled request was invalid: {message}")]
    InvalidRequest { message: String },
}

/// Produces the wire request for `op` from `input`.
///
/// Member binding order is: URI path substitution, query parameters in
/// declaration order, headers, then the protocol body. An input shape with
/// no body members still yields an explicit empty body so `Content-Length`
/// is stable.
pub fn marshal(
    factory: &ProtocolFactory,
    op: &OperationShape,
    input: &Structure,
) -> Result<Request, MarshalError> {
    let shape = op.input();
    validate_structure(shape, input)?;

    let (method, path) = match factory.protocol() {
        // Action-based protocols post to the service root
        Protocol::AwsQuery | Protocol::AwsJson10 | Protocol::AwsJson11 => {
            (http::Method::POST, "/".to_string())
        }
        Protocol::RestJson | Protocol::RestXml => {
            (op.method().clone(), expand_request_uri(op, input)?)
        }
    };

    let query_string = build_query_string(factory.protocol(), shape, input)?;
    let uri = if query_string.is_empty() {
        path
    } else {
        format!("{}?{}", path, query_string)
    };

    let (body, content_type) = build_body(factory, op, input)?;

    let mut builder = http::Request::builder().method(method).uri(uri);
    for member in shape.members_at(WireLocation::Header) {
        if let Some(value) = input.get(member.name()) {
            let text = encode_header_value(member, value)?;
            builder = builder.header(member.location_name(), text);
        }
    }
    if let Protocol::AwsJson10 | Protocol::AwsJson11 = factory.protocol() {
        builder = builder.header("x-amz-target", factory.target(op.name()));
    }
    // Content type is only set when nothing else already set one
    let headers_set = builder.headers_ref().map(|h| h.contains_key(http::header::CONTENT_TYPE));
    if headers_set != Some(true) {
        builder = builder.header(http::header::CONTENT_TYPE, content_type);
    }

    let request = builder
        .body(body)
        .map_err(|err| MarshalError::InvalidRequest {
            message: err.to_string(),
        })?;
    Ok(Request::new(request))
}

fn expand_request_uri(op: &OperationShape, input: &Structure) -> Result<String, MarshalError> {
    let shape = op.input();
    let mut path_params: HashMap<&str, String> = HashMap::new();
    for member in shape.members_at(WireLocation::UriPath) {
        let encoded = match input.get(member.name()) {
            Some(value) => uri::percent_encode_path(&encode_scalar(member, value)?),
            // Optional-and-absent expands to the empty string; required
            // members were rejected by validation already
            None => String::new(),
        };
        path_params.insert(member.name(), encoded);
    }
    uri::expand_template(op.request_uri(), |name| path_params.remove(name)).map_err(|err| {
        match err {
            uri::TemplateError::UnresolvedPlaceholder(placeholder) => {
                MarshalError::UnresolvedPlaceholder { placeholder }
            }
            uri::TemplateError::UnterminatedPlaceholder => MarshalError::MalformedUriTemplate,
        }
    })
}

fn build_query_string(
    protocol: &Protocol,
    shape: &Shape,
    input: &Structure,
) -> Result<String, MarshalError> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for member in shape.members_at(WireLocation::QueryParam) {
        let value = match input.get(member.name()) {
            Some(value) => value,
            None => continue,
        };
        match (member.kind(), value) {
            (ShapeKind::List(inner), Value::List(items)) => {
                for (idx, item) in items.iter().enumerate() {
                    // The query protocol indexes repeated parameters;
                    // REST protocols repeat the bare name
                    let key = match protocol {
                        Protocol::AwsQuery => format!("{}.{}", member.location_name(), idx + 1),
                        _ => member.location_name().to_string(),
                    };
                    pairs.push((key, encode_scalar_kind(member, inner, item)?));
                }
            }
            _ => pairs.push((
                member.location_name().to_string(),
                encode_scalar(member, value)?,
            )),
        }
    }
    let encoded: Vec<String> = pairs
        .iter()
        .map(|(k, v)| {
            format!(
                "{}={}",
                uri::percent_encode_path(k),
                uri::percent_encode_path(v)
            )
        })
        .collect();
    Ok(encoded.join("&"))
}

fn build_body(
    factory: &ProtocolFactory,
    op: &OperationShape,
    input: &Structure,
) -> Result<(WireBody, &'static str), MarshalError> {
    let shape = op.input();
    match factory.protocol() {
        Protocol::AwsQuery => {
            let mut out = String::new();
            let mut writer = QueryWriter::new(&mut out, op.name(), factory.api_version());
            for member in shape.members_at(WireLocation::BodyField) {
                if let Some(value) = input.get(member.name()) {
                    write_query_value(writer.prefix(member.location_name()), member, member.kind(), value)?;
                }
            }
            writer.finish();
            Ok((WireBody::from(out), factory.protocol().content_type()))
        }
        Protocol::AwsJson10 | Protocol::AwsJson11 => {
            // The JSON protocols always carry an object body, `{}` included
            Ok((
                WireBody::from(json_body(shape, input)?),
                factory.protocol().content_type(),
            ))
        }
        Protocol::RestJson => {
            let body = if shape.has_body_members() {
                WireBody::from(json_body(shape, input)?)
            } else {
                WireBody::empty()
            };
            Ok((body, factory.protocol().content_type()))
        }
        Protocol::RestXml => {
            let body = if shape.has_body_members() {
                WireBody::from(xml_body(shape, input)?)
            } else {
                WireBody::empty()
            };
            Ok((body, factory.protocol().content_type()))
        }
    }
}

fn json_body(shape: &Shape, input: &Structure) -> Result<String, MarshalError> {
    let mut out = String::new();
    let mut object = JsonObjectWriter::new(&mut out);
    for member in shape.members_at(WireLocation::BodyField) {
        if let Some(value) = input.get(member.name()) {
            write_json_member(&mut object, member, member.kind(), value)?;
        }
    }
    object.finish();
    Ok(out)
}

fn write_json_member(
    object: &mut JsonObjectWriter<'_>,
    member: &Member,
    kind: &ShapeKind,
    value: &Value,
) -> Result<(), MarshalError> {
    let name = member.location_name();
    match (kind, value) {
        (ShapeKind::Boolean, Value::Bool(v)) => {
            object.boolean(name, *v);
        }
        (ShapeKind::Integer, Value::Number(n)) | (ShapeKind::Float, Value::Number(n)) => {
            object.number(name, *n);
        }
        (ShapeKind::String, Value::String(s)) => {
            object.string(name, s);
        }
        (ShapeKind::Blob, Value::Blob(blob)) => {
            object.string(name, &blob.to_base64());
        }
        (ShapeKind::Timestamp(format), Value::Instant(instant)) => {
            object.instant(name, instant, *format);
        }
        (ShapeKind::List(inner), Value::List(items)) => {
            let mut array = object.start_array(name);
            for item in items {
                write_json_element(&mut array, member, inner, item)?;
            }
            array.finish();
        }
        (ShapeKind::Structure(nested), Value::Structure(s)) => {
            let mut child = object.start_object(name);
            for nested_member in nested.members() {
                if let Some(v) = s.get(nested_member.name()) {
                    write_json_member(&mut child, nested_member, nested_member.kind(), v)?;
                }
            }
            child.finish();
        }
        _ => {
            return Err(MarshalError::KindMismatch {
                member: member.name().to_string(),
            })
        }
    }
    Ok(())
}

fn write_json_element(
    array: &mut JsonArrayWriter<'_>,
    member: &Member,
    kind: &ShapeKind,
    value: &Value,
) -> Result<(), MarshalError> {
    match (kind, value) {
        (ShapeKind::Boolean, Value::Bool(v)) => {
            array.boolean(*v);
        }
        (ShapeKind::Integer, Value::Number(n)) | (ShapeKind::Float, Value::Number(n)) => {
            array.number(*n);
        }
        (ShapeKind::String, Value::String(s)) => {
            array.string(s);
        }
        (ShapeKind::Blob, Value::Blob(blob)) => {
            array.string(&blob.to_base64());
        }
        (ShapeKind::Timestamp(format), Value::Instant(instant)) => {
            array.instant(instant, *format);
        }
        (ShapeKind::List(inner), Value::List(items)) => {
            let mut nested = array.start_array();
            for item in items {
                write_json_element(&mut nested, member, inner, item)?;
            }
            nested.finish();
        }
        (ShapeKind::Structure(nested), Value::Structure(s)) => {
            let mut child = array.start_object();
            for nested_member in nested.members() {
                if let Some(v) = s.get(nested_member.name()) {
                    write_json_member(&mut child, nested_member, nested_member.kind(), v)?;
                }
            }
            child.finish();
        }
        _ => {
            return Err(MarshalError::KindMismatch {
                member: member.name().to_string(),
            })
        }
    }
    Ok(())
}

fn write_query_value(
    writer: QueryValueWriter<'_>,
    member: &Member,
    kind: &ShapeKind,
    value: &Value,
) -> Result<(), MarshalError> {
    match (kind, value) {
        (ShapeKind::Boolean, Value::Bool(v)) => writer.boolean(*v),
        (ShapeKind::Integer, Value::Number(n)) | (ShapeKind::Float, Value::Number(n)) => {
            writer.number(*n)
        }
        (ShapeKind::String, Value::String(s)) => writer.string(s),
        (ShapeKind::Blob, Value::Blob(blob)) => writer.blob_base64(&blob.to_base64()),
        (ShapeKind::Timestamp(format), Value::Instant(instant)) => {
            writer.instant(instant, *format)
        }
        (ShapeKind::List(inner), Value::List(items)) => {
            let mut list = writer.list();
            for item in items {
                write_query_value(list.entry(), member, inner, item)?;
            }
            list.finish();
        }
        (ShapeKind::Structure(nested), Value::Structure(s)) => {
            let mut structure = writer.structure();
            for nested_member in nested.members() {
                if let Some(v) = s.get(nested_member.name()) {
                    write_query_value(
                        structure.field(nested_member.location_name()),
                        nested_member,
                        nested_member.kind(),
                        v,
                    )?;
                }
            }
            structure.finish();
        }
        _ => {
            return Err(MarshalError::KindMismatch {
                member: member.name().to_string(),
            })
        }
    }
    Ok(())
}

fn xml_body(shape: &Shape, input: &Structure) -> Result<String, MarshalError> {
    let mut out = String::new();
    let mut writer = XmlWriter::new(&mut out);
    let mut root = writer.start_el(shape.name()).finish();
    for member in shape.members_at(WireLocation::BodyField) {
        if let Some(value) = input.get(member.name()) {
            write_xml_value(&mut root, member, member.kind(), value)?;
        }
    }
    root.finish();
    Ok(out)
}

fn write_xml_value(
    scope: &mut ScopeWriter<'_>,
    member: &Member,
    kind: &ShapeKind,
    value: &Value,
) -> Result<(), MarshalError> {
    write_xml_named_value(scope, member.location_name(), member, kind, value)
}

fn write_xml_named_value(
    scope: &mut ScopeWriter<'_>,
    name: &str,
    member: &Member,
    kind: &ShapeKind,
    value: &Value,
) -> Result<(), MarshalError> {
    match (kind, value) {
        (ShapeKind::List(inner), Value::List(items)) => {
            let mut wrapper = scope.start_el(name).finish();
            for item in items {
                write_xml_named_value(&mut wrapper, "member", member, inner, item)?;
            }
            wrapper.finish();
        }
        (ShapeKind::Structure(nested), Value::Structure(s)) => {
            let mut el = scope.start_el(name).finish();
            for nested_member in nested.members() {
                if let Some(v) = s.get(nested_member.name()) {
                    write_xml_value(&mut el, nested_member, nested_member.kind(), v)?;
                }
            }
            el.finish();
        }
        _ => {
            let text = encode_scalar_kind(member, kind, value)?;
            let mut el = scope.start_el(name).finish();
            el.data(&text);
            el.finish();
        }
    }
    Ok(())
}

/// Recursively checks presence of required members and kind conformance,
/// before any wire output is produced.
fn validate_structure(shape: &Shape, value: &Structure) -> Result<(), MarshalError> {
    for member in shape.members() {
        match value.get(member.name()) {
            None => {
                if member.is_required() {
                    return Err(MarshalError::MissingMember {
                        shape: shape.name().to_string(),
                        member: member.name().to_string(),
                    });
                }
            }
            Some(v) => validate_value(member, member.kind(), v)?,
        }
    }
    Ok(())
}

fn validate_value(member: &Member, kind: &ShapeKind, value: &Value) -> Result<(), MarshalError> {
    let ok = match (kind, value) {
        (ShapeKind::Boolean, Value::Bool(_))
        | (ShapeKind::Integer, Value::Number(_))
        | (ShapeKind::Float, Value::Number(_))
        | (ShapeKind::String, Value::String(_))
        | (ShapeKind::Blob, Value::Blob(_))
        | (ShapeKind::Timestamp(_), Value::Instant(_)) => true,
        (ShapeKind::List(inner), Value::List(items)) => {
            for item in items {
                validate_value(member, inner, item)?;
            }
            true
        }
        (ShapeKind::Structure(nested), Value::Structure(s)) => {
            validate_structure(nested, s)?;
            true
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(MarshalError::KindMismatch {
            member: member.name().to_string(),
        })
    }
}

pub(crate) fn fmt_number(value: Number) -> String {
    match value {
        Number::PosInt(v) => v.to_string(),
        Number::NegInt(v) => primitive::fmt_integer(v),
        Number::Float(v) => primitive::fmt_float(v),
    }
}

/// Encodes a scalar member for a textual location (path, query, header).
fn encode_scalar(member: &Member, value: &Value) -> Result<String, MarshalError> {
    encode_scalar_kind(member, member.kind(), value)
}

fn encode_scalar_kind(
    member: &Member,
    kind: &ShapeKind,
    value: &Value,
) -> Result<String, MarshalError> {
    match (kind, value) {
        (ShapeKind::String, Value::String(s)) => Ok(s.clone()),
        (ShapeKind::Boolean, Value::Bool(v)) => Ok(primitive::fmt_boolean(*v).to_string()),
        (ShapeKind::Integer, Value::Number(n)) | (ShapeKind::Float, Value::Number(n)) => {
            Ok(fmt_number(*n))
        }
        (ShapeKind::Blob, Value::Blob(blob)) => Ok(blob.to_base64()),
        (ShapeKind::Timestamp(format), Value::Instant(instant)) => {
            Ok(instant.fmt(location_timestamp_format(*format, member.location())))
        }
        _ => Err(MarshalError::KindMismatch {
            member: member.name().to_string(),
        }),
    }
}

fn encode_header_value(member: &Member, value: &Value) -> Result<String, MarshalError> {
    match (member.kind(), value) {
        (ShapeKind::List(inner), Value::List(items)) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                parts.push(encode_scalar_kind(member, inner, item)?);
            }
            Ok(parts.join(","))
        }
        _ => encode_scalar(member, value),
    }
}

/// Timestamp formats are a property of the location, not the value: headers
/// carry HTTP dates and query/path components carry ISO-8601, regardless of
/// the format the member declares for bodies.
fn location_timestamp_format(declared: Format, location: WireLocation) -> Format {
    match location {
        WireLocation::Header => Format::HttpDate,
        WireLocation::QueryParam | WireLocation::UriPath => Format::DateTime,
        WireLocation::BodyField => declared,
    }
}
