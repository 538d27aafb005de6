/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

use bytes::Bytes;
use http::{HeaderMap, HeaderValue};
use std::error::Error;
use std::pin::Pin;
use std::task::{Context, Poll};

type BodyError = Box<dyn Error + Send + Sync>;

/// The request body handed to the HTTP dispatcher.
///
/// Marshallers always produce a loaded body — an empty request still carries
/// an explicit zero-length body so `Content-Length` is computable and stable
/// if the transport replays the request.
#[derive(Debug)]
pub enum WireBody {
    Once(Option<Bytes>),
}

impl WireBody {
    /// The bytes of this body, if they are still available.
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            WireBody::Once(Some(bytes)) => Some(bytes),
            WireBody::Once(None) => Some(&[]),
        }
    }

    /// Clones the body for transport-level reuse. Returns `None` once the
    /// body has been consumed.
    pub fn try_clone(&self) -> Option<WireBody> {
        match self {
            WireBody::Once(bytes) => bytes.clone().map(|b| WireBody::Once(Some(b))),
        }
    }

    fn poll_inner(&mut self) -> Poll<Option<Result<Bytes, BodyError>>> {
        match self {
            WireBody::Once(ref mut opt) => {
                let data = opt.take();
                match data {
                    Some(bytes) if bytes.is_empty() => Poll::Ready(None),
                    Some(bytes) => Poll::Ready(Some(Ok(bytes))),
                    None => Poll::Ready(None),
                }
            }
        }
    }
}

impl From<&str> for WireBody {
    fn from(s: &str) -> Self {
        WireBody::Once(Some(Bytes::copy_from_slice(s.as_bytes())))
    }
}

impl From<String> for WireBody {
    fn from(s: String) -> Self {
        WireBody::Once(Some(Bytes::from(s.into_bytes())))
    }
}

impl From<Bytes> for WireBody {
    fn from(bytes: Bytes) -> Self {
        WireBody::Once(Some(bytes))
    }
}

impl From<Vec<u8>> for WireBody {
    fn from(data: Vec<u8>) -> WireBody {
        Self::from(Bytes::from(data))
    }
}

impl WireBody {
    /// An explicit empty body.
    pub fn empty() -> Self {
        WireBody::Once(Some(Bytes::new()))
    }
}

impl http_body::Body for WireBody {
    type Data = Bytes;
    type Error = BodyError;

    fn poll_data(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Self::Data, Self::Error>>> {
        self.poll_inner()
    }

    fn poll_trailers(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Result<Option<HeaderMap<HeaderValue>>, Self::Error>> {
        Poll::Ready(Ok(None))
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self.bytes() {
            Some(bytes) => http_body::SizeHint::with_exact(bytes.len() as u64),
            None => http_body::SizeHint::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::WireBody;

    #[test]
    fn empty_body_is_loaded() {
        let body = WireBody::empty();
        assert_eq!(body.bytes(), Some(&[][..]));
    }

    #[test]
    fn try_clone_preserves_bytes() {
        let body = WireBody::from("hello");
        let cloned = body.try_clone().expect("unconsumed body is cloneable");
        assert_eq!(cloned.bytes(), Some("hello".as_bytes()));
    }

    #[tokio::test]
    async fn streams_once() {
        use http_body::Body;
        let mut body = WireBody::from("payload");
        let first = body.data().await.transpose().unwrap();
        assert_eq!(first.as_deref(), Some("payload".as_bytes()));
        assert!(body.data().await.is_none());
    }
}
