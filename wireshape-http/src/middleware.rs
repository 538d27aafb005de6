/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Response-side glue between a dispatcher and a response handler.

use crate::response::ParseHttpResponse;
use crate::result::{InvokeError, InvokeSuccess};
use bytes::{Buf, Bytes};
use http_body::Body;
use std::error::Error;

type BoxError = Box<dyn Error + Send + Sync>;

/// Load a response using `handler` to parse the results.
///
/// Success and failure are split and mapped into `InvokeSuccess` and
/// `InvokeError`; the raw response travels along either way so callers can
/// always inspect what actually arrived.
pub async fn load_response<B, T, E, O>(
    mut response: http::Response<B>,
    handler: &O,
) -> Result<InvokeSuccess<T>, InvokeError<E>>
where
    B: Body + Unpin,
    B::Error: Into<BoxError>,
    O: ParseHttpResponse<B, Output = Result<T, E>>,
{
    if let Some(parsed_response) = handler.parse_unloaded(&mut response) {
        let response = response.map(|_| Bytes::new());
        return sdk_result(parsed_response, response);
    }

    let body = match read_body(response.body_mut()).await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!("failed to read response body");
            return Err(InvokeError::ResponseError {
                raw: response.map(|_| Bytes::new()),
                err: e.into(),
            });
        }
    };

    let response = response.map(|_| Bytes::from(body));
    let parsed = handler.parse_loaded(&response);
    sdk_result(parsed, response)
}

async fn read_body<B: Body + Unpin>(body: &mut B) -> Result<Vec<u8>, B::Error> {
    let mut output = Vec::new();
    while let Some(buf) = body.data().await {
        let mut buf = buf?;
        while buf.has_remaining() {
            output.extend_from_slice(buf.chunk());
            buf.advance(buf.chunk().len())
        }
    }
    Ok(output)
}

/// Convert a `Result<T, E>` into an invoke result that includes the raw HTTP response
fn sdk_result<T, E>(
    parsed: Result<T, E>,
    raw: http::Response<Bytes>,
) -> Result<InvokeSuccess<T>, InvokeError<E>> {
    match parsed {
        Ok(parsed) => Ok(InvokeSuccess { raw, parsed }),
        Err(err) => Err(InvokeError::ServiceError { raw, err }),
    }
}

#[cfg(test)]
mod test {
    use super::load_response;
    use crate::body::WireBody;
    use crate::response::ParseStrictResponse;
    use crate::result::InvokeError;
    use bytes::Bytes;

    struct BodyEcho;

    impl ParseStrictResponse for BodyEcho {
        type Output = Result<String, String>;

        fn parse(&self, response: &http::Response<Bytes>) -> Self::Output {
            if response.status().is_success() {
                Ok(String::from_utf8_lossy(response.body()).to_string())
            } else {
                Err(String::from_utf8_lossy(response.body()).to_string())
            }
        }
    }

    #[tokio::test]
    async fn success_path_loads_body() {
        let response = http::Response::builder()
            .status(200)
            .body(WireBody::from("hello"))
            .unwrap();
        let success = load_response(response, &BodyEcho).await.expect("2xx");
        assert_eq!(success.parsed, "hello");
        assert_eq!(&success.raw.into_body()[..], b"hello");
    }

    #[tokio::test]
    async fn error_path_preserves_raw_response() {
        let response = http::Response::builder()
            .status(500)
            .body(WireBody::from("broken"))
            .unwrap();
        let err = load_response(response, &BodyEcho).await.err().expect("5xx");
        match err {
            InvokeError::ServiceError { raw, err } => {
                assert_eq!(err, "broken");
                assert_eq!(raw.status(), 500);
            }
            other => panic!("unexpected error variant: {:?}", other),
        }
    }
}
