/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Error dispatch: turning a failed wire response into a structured,
//! typed service error.
//!
//! Dispatch never fails. An unrecognized or unparseable error body still
//! produces a [`ServiceError`] carrying the raw status, code text, and
//! message, so callers can always inspect what the service actually said.

use crate::unmarshal::{unmarshal_json_body, UnmarshalError};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use wireshape_json::deserialize::{json_token_iter, skip_value, Token};
use wireshape_types::shape::Shape;
use wireshape_types::Structure;
use wireshape_xml::decode::Document;

/// Maps sanitized wire error codes to the shape used to unmarshal that
/// error's typed fields. Built once per service; read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ErrorRegistry {
    shapes: Arc<HashMap<String, Arc<Shape>>>,
}

impl ErrorRegistry {
    pub fn builder() -> ErrorRegistryBuilder {
        ErrorRegistryBuilder {
            shapes: HashMap::new(),
        }
    }

    pub fn get(&self, code: &str) -> Option<&Arc<Shape>> {
        self.shapes.get(code)
    }
}

pub struct ErrorRegistryBuilder {
    shapes: HashMap<String, Arc<Shape>>,
}

impl ErrorRegistryBuilder {
    pub fn register(mut self, code: impl Into<String>, shape: Arc<Shape>) -> Self {
        self.shapes.insert(code.into(), shape);
        self
    }

    pub fn build(self) -> ErrorRegistry {
        ErrorRegistry {
            shapes: Arc::new(self.shapes),
        }
    }
}

/// A service-reported failure, as one tagged value rather than a type per
/// error code. `fields` carries the typed members of registered codes and
/// is empty for unrecognized ones.
#[derive(Debug)]
pub struct ServiceError {
    code: Option<String>,
    message: Option<String>,
    request_id: Option<String>,
    status: u16,
    fields: Structure,
    registered: bool,
}

impl ServiceError {
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn fields(&self) -> &Structure {
        &self.fields
    }

    /// Whether the code matched a registered error shape.
    pub fn is_registered(&self) -> bool {
        self.registered
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service error (status {})", self.status)?;
        if let Some(code) = &self.code {
            write!(f, ": {}", code)?;
        }
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ServiceError {}

/// What a response handler can fail with: the service answered with an
/// error, or the response could not be decoded at all.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("failed to decode response: {0}")]
    Unparseable(#[from] UnmarshalError),
}

/// Error codes arrive decorated: `namespace#Code` from JSON services and
/// occasionally `Code:https://...` with a documentation URI. Both
/// decorations are stripped before registry lookup.
pub(crate) fn sanitize_error_code(raw: &str) -> &str {
    let after_hash = raw.rsplit('#').next().unwrap_or(raw);
    after_hash.split(':').next().unwrap_or(after_hash).trim()
}

const REQUEST_ID_HEADER: &str = "x-amzn-requestid";

/// Dispatches a failed JSON-protocol response.
pub fn dispatch_json_error(
    registry: &ErrorRegistry,
    status: u16,
    headers: &http::HeaderMap,
    body: &[u8],
) -> ServiceError {
    let (raw_code, message) = scan_json_error_fields(body);
    let request_id = header_request_id(headers);
    let mut fields = Structure::default();
    let mut registered = false;
    let code = raw_code.as_deref().map(sanitize_error_code);
    if let Some(code) = code {
        if let Some(shape) = registry.get(code) {
            registered = true;
            fields = unmarshal_json_body(shape, body)
                .ok()
                .flatten()
                .unwrap_or_default();
        } else {
            tracing::debug!(code, "no error shape registered, using generic service error");
        }
    }
    ServiceError {
        code: code.map(str::to_string),
        message,
        request_id,
        status,
        fields,
        registered,
    }
}

/// Scans the top level of a JSON error body for the code and message fields
/// without assuming anything else about its shape. Unparseable bodies yield
/// nothing rather than an error.
fn scan_json_error_fields(body: &[u8]) -> (Option<String>, Option<String>) {
    let mut code = None;
    let mut message = None;
    let mut tokens = json_token_iter(body).peekable();
    if !matches!(tokens.next(), Some(Ok(Token::StartObject { .. }))) {
        return (None, None);
    }
    loop {
        match tokens.next() {
            Some(Ok(Token::ObjectKey { key, .. })) => {
                let key = match key.to_unescaped() {
                    Ok(key) => key,
                    Err(_) => return (code, message),
                };
                let target = match key.as_ref() {
                    "__type" | "code" | "Code" => Some(&mut code),
                    "message" | "Message" | "errorMessage" => Some(&mut message),
                    _ => None,
                };
                // only a string value is interesting; anything else is
                // skipped as a whole subtree
                match (target, tokens.peek()) {
                    (Some(slot), Some(Ok(Token::ValueString { value, .. }))) => {
                        if let Ok(text) = value.to_unescaped() {
                            *slot = Some(text.to_string());
                        }
                        tokens.next();
                    }
                    _ => {
                        if skip_value(&mut tokens).is_err() {
                            return (code, message);
                        }
                    }
                }
            }
            Some(Ok(Token::EndObject { .. })) | None => return (code, message),
            _ => return (code, message),
        }
    }
}

/// Dispatches a failed query/XML-protocol response
/// (`<ErrorResponse><Error><Code>...`).
pub fn dispatch_xml_error(
    registry: &ErrorRegistry,
    status: u16,
    headers: &http::HeaderMap,
    body: &[u8],
) -> ServiceError {
    let mut code = None;
    let mut message = None;
    let mut request_id = header_request_id(headers);

    if let Ok(text) = std::str::from_utf8(body) {
        let _ = scan_xml_error_fields(text, &mut code, &mut message, &mut request_id);
    }

    let code = code.as_deref().map(sanitize_error_code).map(str::to_string);
    let mut fields = Structure::default();
    let mut registered = false;
    if let Some(code) = &code {
        if let Some(shape) = registry.get(code) {
            registered = true;
            // second pass over the in-memory body to pull the typed fields
            if let Ok(text) = std::str::from_utf8(body) {
                fields = read_xml_error_fields(text, shape).unwrap_or_default();
            }
        } else {
            tracing::debug!(code = code.as_str(), "no error shape registered, using generic service error");
        }
    }
    ServiceError {
        code,
        message,
        request_id,
        status,
        fields,
        registered,
    }
}

fn scan_xml_error_fields(
    text: &str,
    code: &mut Option<String>,
    message: &mut Option<String>,
    request_id: &mut Option<String>,
) -> Result<(), UnmarshalError> {
    let mut doc = Document::new(text);
    let mut root = doc.root()?;
    if root.start_el().matches("Error") {
        read_code_and_message(&mut root, code, message)?;
        return Ok(());
    }
    while let Some(mut child) = root.next_tag()? {
        if child.start_el().matches("Error") {
            read_code_and_message(&mut child, code, message)?;
        } else if child.start_el().matches("RequestId") {
            *request_id = Some(child.try_data()?.to_string());
        }
    }
    Ok(())
}

fn read_code_and_message(
    error_el: &mut wireshape_xml::decode::ScopedDecoder<'_, '_>,
    code: &mut Option<String>,
    message: &mut Option<String>,
) -> Result<(), UnmarshalError> {
    while let Some(mut field) = error_el.next_tag()? {
        if field.start_el().matches("Code") {
            *code = Some(field.try_data()?.to_string());
        } else if field.start_el().matches("Message") {
            *message = Some(field.try_data()?.to_string());
        }
    }
    Ok(())
}

fn read_xml_error_fields(text: &str, shape: &Shape) -> Option<Structure> {
    let mut doc = Document::new(text);
    let mut root = doc.root().ok()?;
    if root.start_el().matches("Error") {
        return crate::unmarshal::read_xml_error_structure(&mut root, shape).ok();
    }
    while let Ok(Some(mut child)) = root.next_tag() {
        if child.start_el().matches("Error") {
            return crate::unmarshal::read_xml_error_structure(&mut child, shape).ok();
        }
    }
    None
}

fn header_request_id(headers: &http::HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
