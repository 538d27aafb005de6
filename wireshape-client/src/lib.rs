/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! The wireshape service client.
//!
//! [`Client`] is generic over a `tower::Service` connector and does nothing
//! but dispatch a marshalled [`Operation`] and load its response.
//! [`ServiceClient`] binds a [`ProtocolFactory`] and an endpoint on top of
//! it: `invoke` marshals, dispatches, and unmarshals in one call, and
//! [`pool::TaskPool`] provides the bounded asynchronous facade.

pub mod pool;
pub mod test_connection;

use http::Uri;
use std::error::Error;
use tower::{Service, ServiceExt};
use wireshape_http::body::WireBody;
use wireshape_http::middleware::load_response;
use wireshape_http::operation::{Metadata, Operation, Request};
use wireshape_http::response::ParseHttpResponse;
use wireshape_http::result::InvokeError;
use wireshape_protocol::{
    OperationShape, ProtocolFactory, ResponseError, ServiceError,
};
use wireshape_types::Structure;

type BoxError = Box<dyn Error + Send + Sync>;

/// Dispatches operations over a connector service.
#[derive(Debug, Clone)]
pub struct Client<S> {
    inner: S,
}

impl Client<hyper::Client<hyper::client::HttpConnector, WireBody>> {
    /// A plain-HTTP hyper-backed client. TLS-capable connectors are the
    /// caller's to bring; the client is generic over them.
    pub fn http() -> Self {
        Client {
            inner: hyper::Client::builder().build_http(),
        }
    }
}

impl<S> Client<S> {
    pub fn new(connector: S) -> Self {
        Client { inner: connector }
    }
}

impl<S, B> Client<S>
where
    S: Service<http::Request<WireBody>, Response = http::Response<B>> + Clone,
    S::Error: Into<BoxError>,
    B: http_body::Body + Unpin,
    B::Error: Into<BoxError>,
{
    /// Dispatches one operation and parses its response.
    pub async fn call<H, T, E>(&self, operation: Operation<H>) -> Result<T, InvokeError<E>>
    where
        H: ParseHttpResponse<B, Output = Result<T, E>>,
    {
        let (request, parts) = operation.into_request_response();
        if let Some(metadata) = &parts.metadata {
            tracing::debug!(
                operation = metadata.name(),
                service = metadata.service(),
                "dispatching request"
            );
        }
        let mut svc = self.inner.clone();
        let response = svc
            .ready()
            .await
            .map_err(|err| InvokeError::DispatchFailure(err.into()))?
            .call(request.into_http())
            .await
            .map_err(|err| InvokeError::DispatchFailure(err.into()))?;
        let success = load_response(response, &parts.response_handler).await?;
        Ok(success.parsed)
    }
}

/// A protocol factory, an endpoint, and a dispatcher, bound together.
///
/// Both the factory and the client are immutable, so a `ServiceClient` is
/// freely shareable across threads and concurrent invocations.
#[derive(Debug, Clone)]
pub struct ServiceClient<S> {
    factory: ProtocolFactory,
    endpoint: Uri,
    client: Client<S>,
}

impl<S, B> ServiceClient<S>
where
    S: Service<http::Request<WireBody>, Response = http::Response<B>> + Clone,
    S::Error: Into<BoxError>,
    B: http_body::Body + Unpin,
    B::Error: Into<BoxError>,
{
    pub fn new(factory: ProtocolFactory, endpoint: Uri, connector: S) -> Self {
        ServiceClient {
            factory,
            endpoint,
            client: Client::new(connector),
        }
    }

    pub fn factory(&self) -> &ProtocolFactory {
        &self.factory
    }

    /// Marshal `input`, dispatch it, and unmarshal the result.
    ///
    /// `Ok(None)` means the service answered with an explicit null body.
    pub async fn invoke(
        &self,
        op: &OperationShape,
        input: &Structure,
    ) -> Result<Option<Structure>, InvokeError<ServiceError>> {
        let request = self
            .factory
            .marshal(op, input)
            .map_err(InvokeError::construction)?;
        let request = apply_endpoint(request, &self.endpoint)?;
        let handler = self.factory.response_handler(op);
        let operation = Operation::new(request, handler).with_metadata(Metadata::new(
            op.name().to_string(),
            self.factory.service().to_string(),
        ));
        match self.client.call(operation).await {
            Ok(parsed) => Ok(parsed),
            Err(err) => Err(split_response_error(err)),
        }
    }
}

/// Grafts the endpoint's scheme and authority onto the marshalled request's
/// path and query. Resolution of *which* endpoint is external; this client
/// only applies it.
fn apply_endpoint<E>(request: Request, endpoint: &Uri) -> Result<Request, InvokeError<E>> {
    let endpoint_parts = endpoint.clone().into_parts();
    request
        .augment(move |mut req| {
            let mut parts = req.uri().clone().into_parts();
            parts.scheme = endpoint_parts.scheme;
            parts.authority = endpoint_parts.authority;
            *req.uri_mut() = Uri::from_parts(parts).map_err(|err| Box::new(err) as BoxError)?;
            Ok(req)
        })
        .map_err(InvokeError::ConstructionFailure)
}

/// The response handler reports decode failures and service errors through
/// one error type; split them back into the invoke taxonomy so parse
/// failures are distinguishable from service failures.
fn split_response_error(err: InvokeError<ResponseError>) -> InvokeError<ServiceError> {
    match err {
        InvokeError::ConstructionFailure(e) => InvokeError::ConstructionFailure(e),
        InvokeError::DispatchFailure(e) => InvokeError::DispatchFailure(e),
        InvokeError::ResponseError { raw, err } => InvokeError::ResponseError { raw, err },
        InvokeError::ServiceError { raw, err } => match err {
            ResponseError::Service(err) => InvokeError::ServiceError { raw, err },
            ResponseError::Unparseable(err) => InvokeError::ResponseError {
                raw,
                err: Box::new(err),
            },
        },
    }
}
