/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! A canned-response connector for tests.

use bytes::Bytes;
use http::header::HeaderName;
use http::Request;
use std::future::Ready;
use std::ops::Deref;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use wireshape_http::body::WireBody;

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type ConnectVec = Vec<(http::Request<WireBody>, http::Response<Bytes>)>;

pub struct ValidateRequest {
    pub expected: http::Request<WireBody>,
    pub actual: http::Request<WireBody>,
}

impl ValidateRequest {
    pub fn assert_matches(&self, ignore_headers: &[HeaderName]) {
        let (actual, expected) = (&self.actual, &self.expected);
        for (name, value) in expected.headers() {
            if !ignore_headers.contains(name) {
                let actual_header = actual
                    .headers()
                    .get(name)
                    .unwrap_or_else(|| panic!("header {:?} missing", name));
                assert_eq!(actual_header, value, "header mismatch for {:?}", name);
            }
        }
        let actual_str = std::str::from_utf8(actual.body().bytes().unwrap_or(&[]));
        let expected_str = std::str::from_utf8(expected.body().bytes().unwrap_or(&[]));
        match (actual_str, expected_str) {
            (Ok(actual), Ok(expected)) => assert_eq!(actual, expected),
            _ => assert_eq!(actual.body().bytes(), expected.body().bytes()),
        };
        assert_eq!(actual.uri(), expected.uri());
        assert_eq!(actual.method(), expected.method());
    }
}

/// A connector that:
/// - responds to requests with a preloaded series of responses
/// - records requests for later examination
///
/// Usage:
/// ```
/// use wireshape_client::test_connection::TestConnection;
/// use wireshape_client::Client;
/// use wireshape_http::body::WireBody;
/// use bytes::Bytes;
///
/// let events = vec![(
///     http::Request::builder()
///         .uri("https://example.com/")
///         .body(WireBody::from("request body"))
///         .unwrap(),
///     http::Response::builder()
///         .status(200)
///         .body(Bytes::from_static(b"response body"))
///         .unwrap(),
/// )];
/// let conn = TestConnection::new(events);
/// let client = Client::new(conn);
/// ```
#[derive(Clone)]
pub struct TestConnection {
    data: Arc<Mutex<ConnectVec>>,
    requests: Arc<Mutex<Vec<ValidateRequest>>>,
}

impl TestConnection {
    pub fn new(mut data: ConnectVec) -> Self {
        data.reverse();
        TestConnection {
            data: Arc::new(Mutex::new(data)),
            requests: Default::default(),
        }
    }

    pub fn requests(&self) -> impl Deref<Target = Vec<ValidateRequest>> + '_ {
        self.requests.lock().unwrap()
    }
}

impl tower::Service<http::Request<WireBody>> for TestConnection {
    type Response = http::Response<WireBody>;
    type Error = BoxError;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, actual: Request<WireBody>) -> Self::Future {
        if let Some((expected, response)) = self.data.lock().unwrap().pop() {
            self.requests
                .lock()
                .unwrap()
                .push(ValidateRequest { actual, expected });
            std::future::ready(Ok(response.map(WireBody::from)))
        } else {
            std::future::ready(Err("no more canned responses".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TestConnection;
    use wireshape_http::body::WireBody;

    /// Validate that the `TestConnection` meets the trait bounds required by
    /// `Client`.
    #[test]
    fn meets_trait_bounds() {
        fn check() -> impl tower::Service<
            http::Request<WireBody>,
            Response = http::Response<WireBody>,
            Error = super::BoxError,
            Future = impl Send,
        > + Clone {
            TestConnection::new(vec![])
        }
        let _ = check();
    }
}
