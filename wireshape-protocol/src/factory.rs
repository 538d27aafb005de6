/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Per-service protocol configuration.
//!
//! A [`ProtocolFactory`] is constructed once per service and never mutated,
//! so it can be shared freely across concurrent invocations. It knows the
//! wire flavour, the API version, the JSON target prefix, and the service's
//! [`ErrorRegistry`], and it hands out marshalled requests and response
//! handlers.

use crate::error::{dispatch_json_error, dispatch_xml_error, ErrorRegistry, ResponseError};
use crate::marshal::{self, MarshalError};
use crate::operation::OperationShape;
use crate::unmarshal::{
    read_header_members, unmarshal_json_body, unmarshal_query_response, unmarshal_xml_body,
};
use bytes::Bytes;
use std::borrow::Cow;
use std::sync::Arc;
use wireshape_http::operation::Request;
use wireshape_http::response::ParseStrictResponse;
use wireshape_types::shape::Shape;
use wireshape_types::Structure;

/// The wire protocol flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// `Action`/`Version` form body, XML responses.
    AwsQuery,
    /// `x-amz-target` header, JSON 1.0 body.
    AwsJson10,
    /// `x-amz-target` header, JSON 1.1 body.
    AwsJson11,
    /// URI templates, JSON bodies.
    RestJson,
    /// URI templates, XML bodies.
    RestXml,
}

impl Protocol {
    pub fn content_type(&self) -> &'static str {
        match self {
            Protocol::AwsQuery => "application/x-www-form-urlencoded",
            Protocol::AwsJson10 => "application/x-amz-json-1.0",
            Protocol::AwsJson11 => "application/x-amz-json-1.1",
            Protocol::RestJson => "application/json",
            Protocol::RestXml => "application/xml",
        }
    }

    fn body_is_json(&self) -> bool {
        matches!(
            self,
            Protocol::AwsJson10 | Protocol::AwsJson11 | Protocol::RestJson
        )
    }
}

#[derive(Debug, Clone)]
pub struct ProtocolFactory {
    service: Cow<'static, str>,
    api_version: Cow<'static, str>,
    target_prefix: Option<Cow<'static, str>>,
    protocol: Protocol,
    errors: ErrorRegistry,
}

impl ProtocolFactory {
    pub fn new(
        protocol: Protocol,
        service: impl Into<Cow<'static, str>>,
        api_version: impl Into<Cow<'static, str>>,
    ) -> Self {
        ProtocolFactory {
            service: service.into(),
            api_version: api_version.into(),
            target_prefix: None,
            protocol,
            errors: ErrorRegistry::default(),
        }
    }

    /// Sets the prefix for the `x-amz-target` header used by the JSON
    /// protocols. Defaults to the service name.
    pub fn with_target_prefix(mut self, prefix: impl Into<Cow<'static, str>>) -> Self {
        self.target_prefix = Some(prefix.into());
        self
    }

    pub fn with_errors(mut self, errors: ErrorRegistry) -> Self {
        self.errors = errors;
        self
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn errors(&self) -> &ErrorRegistry {
        &self.errors
    }

    pub(crate) fn target(&self, operation: &str) -> String {
        let prefix = self.target_prefix.as_deref().unwrap_or(&self.service);
        format!("{}.{}", prefix, operation)
    }

    /// Marshals `input` into the wire request for `op`.
    pub fn marshal(&self, op: &OperationShape, input: &Structure) -> Result<Request, MarshalError> {
        marshal::marshal(self, op, input)
    }

    /// Creates the handler that parses `op`'s response, or dispatches its
    /// error on a non-2xx status.
    pub fn response_handler(&self, op: &OperationShape) -> ResponseHandler {
        ResponseHandler {
            protocol: self.protocol,
            operation: op.name().to_string(),
            output: op.output().clone(),
            errors: self.errors.clone(),
        }
    }
}

/// Parses one operation's wire response.
///
/// State machine: a 2xx status runs the result unmarshaller; anything else
/// extracts the error code, consults the registry, and produces a
/// [`ServiceError`](crate::error::ServiceError). Terminal either way — retry
/// classification belongs to the caller.
pub struct ResponseHandler {
    protocol: Protocol,
    operation: String,
    output: Arc<Shape>,
    errors: ErrorRegistry,
}

impl ParseStrictResponse for ResponseHandler {
    type Output = Result<Option<Structure>, ResponseError>;

    fn parse(&self, response: &http::Response<Bytes>) -> Self::Output {
        let status = response.status();
        if !status.is_success() {
            let err = if self.protocol.body_is_json() {
                dispatch_json_error(
                    &self.errors,
                    status.as_u16(),
                    response.headers(),
                    response.body(),
                )
            } else {
                dispatch_xml_error(
                    &self.errors,
                    status.as_u16(),
                    response.headers(),
                    response.body(),
                )
            };
            return Err(ResponseError::Service(err));
        }

        let body = response.body().as_ref();
        let decoded = match self.protocol {
            Protocol::AwsJson10 | Protocol::AwsJson11 | Protocol::RestJson => {
                unmarshal_json_body(&self.output, body)?
            }
            Protocol::AwsQuery => {
                let (structure, _request_id) =
                    unmarshal_query_response(&self.output, &self.operation, body)?;
                Some(structure)
            }
            Protocol::RestXml => unmarshal_xml_body(&self.output, body)?,
        };
        match decoded {
            // an explicit null body produces no result object at all
            None => Ok(None),
            Some(structure) => {
                let builder =
                    read_header_members(&self.output, response.headers(), structure.into_builder())?;
                Ok(Some(builder.build()))
            }
        }
    }
}
