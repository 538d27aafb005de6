/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

use std::borrow::Cow;
use std::sync::Arc;
use wireshape_types::shape::Shape;

/// Static description of one service operation: the HTTP binding plus the
/// input and output shapes. Built once per service alongside its shapes.
#[derive(Debug, Clone)]
pub struct OperationShape {
    name: Cow<'static, str>,
    method: http::Method,
    request_uri: Cow<'static, str>,
    input: Arc<Shape>,
    output: Arc<Shape>,
}

impl OperationShape {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        method: http::Method,
        request_uri: impl Into<Cow<'static, str>>,
        input: Arc<Shape>,
        output: Arc<Shape>,
    ) -> Self {
        OperationShape {
            name: name.into(),
            method,
            request_uri: request_uri.into(),
            input,
            output,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> &http::Method {
        &self.method
    }

    /// The URI template, with `{name}` placeholders for `UriPath` members.
    pub fn request_uri(&self) -> &str {
        &self.request_uri
    }

    pub fn input(&self) -> &Arc<Shape> {
        &self.input
    }

    pub fn output(&self) -> &Arc<Shape> {
        &self.output
    }
}
