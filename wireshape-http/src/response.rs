/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

use bytes::Bytes;
use http::Response;

/// `ParseHttpResponse` is a generic trait for parsing structured data from
/// HTTP responses.
///
/// The split between `parse_unloaded` and `parse_loaded` keeps the parsing
/// code pure and synchronous: reading the body to completion is the caller's
/// job, and only happens when `parse_unloaded` declines by returning `None`.
pub trait ParseHttpResponse<B> {
    /// Output type of the HttpResponse.
    ///
    /// For request/response style operations, this is typically something like:
    /// `Result<Option<Structure>, ResponseError>`
    type Output;

    /// Parse an HTTP response without reading the body. If the body must be
    /// provided to proceed, return `None`.
    ///
    /// This exists for operations whose output is carried entirely in the
    /// status line and headers, or that hand the body stream through to the
    /// caller unparsed.
    fn parse_unloaded(&self, response: &mut http::Response<B>) -> Option<Self::Output>;

    /// Parse an HTTP response from a fully loaded body.
    fn parse_loaded(&self, response: &http::Response<Bytes>) -> Self::Output;
}

/// Convenience trait for handlers that always need the full body.
pub trait ParseStrictResponse {
    type Output;
    fn parse(&self, response: &Response<Bytes>) -> Self::Output;
}

impl<B, T> ParseHttpResponse<B> for T
where
    T: ParseStrictResponse,
{
    type Output = T::Output;

    fn parse_unloaded(&self, _response: &mut Response<B>) -> Option<Self::Output> {
        None
    }

    fn parse_loaded(&self, response: &Response<Bytes>) -> Self::Output {
        self.parse(response)
    }
}
