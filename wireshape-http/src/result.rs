/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

use bytes::Bytes;
use std::error::Error;
use std::fmt;

type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Debug)]
pub struct InvokeSuccess<O> {
    pub raw: http::Response<Bytes>,
    pub parsed: O,
}

/// Failure taxonomy for a single invocation.
///
/// The first two variants are client-side and happen before or instead of a
/// response. `ResponseError` means the wire response could not be understood
/// (a parse failure, never retried); `ServiceError` means the service itself
/// answered with an error.
#[derive(Debug)]
pub enum InvokeError<E> {
    /// The request failed during construction. It was not dispatched over
    /// the network.
    ConstructionFailure(BoxError),

    /// The request failed during dispatch. An HTTP response was not
    /// received. The request MAY have been sent.
    DispatchFailure(BoxError),

    /// A response was received but it was not parseable according to the
    /// protocol.
    ResponseError {
        raw: http::Response<Bytes>,
        err: BoxError,
    },

    /// An error response was received from the service.
    ServiceError {
        raw: http::Response<Bytes>,
        err: E,
    },
}

impl<E> InvokeError<E> {
    pub fn construction(err: impl Into<BoxError>) -> Self {
        InvokeError::ConstructionFailure(err.into())
    }

    /// The service error, when the failure was one.
    pub fn as_service_error(&self) -> Option<&E> {
        match self {
            InvokeError::ServiceError { err, .. } => Some(err),
            _ => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for InvokeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvokeError::ConstructionFailure(err) => {
                write!(f, "failed to construct request: {}", err)
            }
            InvokeError::DispatchFailure(err) => write!(f, "failed to dispatch request: {}", err),
            InvokeError::ResponseError { err, .. } => {
                write!(f, "failed to parse response: {}", err)
            }
            InvokeError::ServiceError { err, .. } => write!(f, "service error: {}", err),
        }
    }
}

impl<E: Error + 'static> Error for InvokeError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InvokeError::ConstructionFailure(err) | InvokeError::DispatchFailure(err) => {
                Some(err.as_ref())
            }
            InvokeError::ResponseError { err, .. } => Some(err.as_ref()),
            InvokeError::ServiceError { err, .. } => Some(err),
        }
    }
}
