/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::body::WireBody;
use std::borrow::Cow;

/// Names the operation and service an envelope belongs to, for logging and
/// request-line decisions made by the dispatcher.
pub struct Metadata {
    operation: Cow<'static, str>,
    service: Cow<'static, str>,
}

impl Metadata {
    pub fn new(
        operation: impl Into<Cow<'static, str>>,
        service: impl Into<Cow<'static, str>>,
    ) -> Self {
        Metadata {
            operation: operation.into(),
            service: service.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.operation
    }

    pub fn service(&self) -> &str {
        &self.service
    }
}

#[non_exhaustive]
pub struct Parts<H> {
    pub response_handler: H,
    pub metadata: Option<Metadata>,
}

/// A marshalled request paired with the handler that will parse its
/// response. This is the unit of work handed to a dispatcher.
pub struct Operation<H> {
    request: Request,
    parts: Parts<H>,
}

impl<H> Operation<H> {
    pub fn new(request: Request, response_handler: H) -> Self {
        Operation {
            request,
            parts: Parts {
                response_handler,
                metadata: None,
            },
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.parts.metadata = Some(metadata);
        self
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.parts.metadata.as_ref()
    }

    pub fn into_request_response(self) -> (Request, Parts<H>) {
        (self.request, self.parts)
    }
}

/// The HTTP request produced by a marshaller.
#[derive(Debug)]
pub struct Request {
    inner: http::Request<WireBody>,
}

impl Request {
    pub fn new(base: http::Request<WireBody>) -> Self {
        Request { inner: base }
    }

    /// Transforms the underlying HTTP request, e.g. to set a host or an
    /// extra header before dispatch.
    pub fn augment<T>(
        self,
        f: impl FnOnce(http::Request<WireBody>) -> Result<http::Request<WireBody>, T>,
    ) -> Result<Request, T> {
        Ok(Request {
            inner: f(self.inner)?,
        })
    }

    pub fn http(&self) -> &http::Request<WireBody> {
        &self.inner
    }

    pub fn http_mut(&mut self) -> &mut http::Request<WireBody> {
        &mut self.inner
    }

    pub fn try_clone(&self) -> Option<Request> {
        let cloned_body = self.inner.body().try_clone()?;
        let mut cloned_request = http::Request::builder()
            .uri(self.inner.uri().clone())
            .method(self.inner.method());
        *cloned_request
            .headers_mut()
            .expect("builder has not been modified, headers must be valid") =
            self.inner.headers().clone();
        let inner = cloned_request
            .body(cloned_body)
            .expect("a clone of a valid request should be a valid request");
        Some(Request { inner })
    }

    pub fn into_http(self) -> http::Request<WireBody> {
        self.inner
    }
}
