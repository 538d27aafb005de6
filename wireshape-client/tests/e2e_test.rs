/*
 * Copyright Wireshape Contributors.
 * SPDX-License-Identifier: Apache-2.0.
 */

use bytes::Bytes;
use http::Uri;
use protocol_test_helpers::{assert_ok, validate_body, MediaType};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wireshape_client::pool::TaskPool;
use wireshape_client::test_connection::TestConnection;
use wireshape_client::ServiceClient;
use wireshape_http::body::WireBody;
use wireshape_http::result::InvokeError;
use wireshape_protocol::{ErrorRegistry, OperationShape, Protocol, ProtocolFactory};
use wireshape_types::shape::{Member, Shape, ShapeKind, WireLocation};
use wireshape_types::Structure;

fn create_interconnect_op() -> OperationShape {
    let build = |name: &str| {
        Shape::builder(name)
            .add(Member::new(
                "interconnectId",
                WireLocation::BodyField,
                ShapeKind::String,
            ))
            .add(Member::new(
                "bandwidth",
                WireLocation::BodyField,
                ShapeKind::String,
            ))
            .build()
    };
    OperationShape::new(
        "CreateInterconnect",
        http::Method::POST,
        "/",
        build("CreateInterconnectRequest"),
        build("CreateInterconnectResult"),
    )
}

fn json_factory() -> ProtocolFactory {
    let registry = ErrorRegistry::builder()
        .register(
            "ValidationException",
            Shape::builder("ValidationException")
                .add(Member::new(
                    "message",
                    WireLocation::BodyField,
                    ShapeKind::String,
                ))
                .build(),
        )
        .build();
    ProtocolFactory::new(Protocol::AwsJson11, "DirectConnect", "2012-10-25")
        .with_target_prefix("OvernightDirectConnect")
        .with_errors(registry)
}

fn endpoint() -> Uri {
    Uri::from_static("https://directconnect.us-east-1.example.com")
}

#[tokio::test]
async fn json_invoke_round_trip() {
    let conn = TestConnection::new(vec![(
        http::Request::builder()
            .method("POST")
            .uri("https://directconnect.us-east-1.example.com/")
            .header("x-amz-target", "OvernightDirectConnect.CreateInterconnect")
            .header("content-type", "application/x-amz-json-1.1")
            .body(WireBody::from(r#"{"bandwidth":"1Gbps"}"#))
            .unwrap(),
        http::Response::builder()
            .status(200)
            .body(Bytes::from_static(
                br#"{"interconnectId":"id1","bandwidth":"1Gbps"}"#,
            ))
            .unwrap(),
    )]);
    let client = ServiceClient::new(json_factory(), endpoint(), conn.clone());

    let input = Structure::builder().field("bandwidth", "1Gbps").build();
    let result = client
        .invoke(&create_interconnect_op(), &input)
        .await
        .expect("invoke succeeds")
        .expect("non-null result");

    assert_eq!(result.get_str("interconnectId"), Some("id1"));
    assert_eq!(result.get_str("bandwidth"), Some("1Gbps"));

    let requests = conn.requests();
    assert_eq!(requests.len(), 1);
    requests[0].assert_matches(&[]);
}

#[tokio::test]
async fn service_errors_are_typed() {
    let conn = TestConnection::new(vec![(
        http::Request::builder()
            .uri("https://directconnect.us-east-1.example.com/")
            .body(WireBody::empty())
            .unwrap(),
        http::Response::builder()
            .status(400)
            .header("x-amzn-requestid", "req-1")
            .body(Bytes::from_static(
                br#"{"__type":"com.example#ValidationException","message":"bandwidth is required"}"#,
            ))
            .unwrap(),
    )]);
    let client = ServiceClient::new(json_factory(), endpoint(), conn);

    let err = client
        .invoke(&create_interconnect_op(), &Structure::default())
        .await
        .expect_err("service reported an error");
    match err {
        InvokeError::ServiceError { err, raw } => {
            assert_eq!(err.code(), Some("ValidationException"));
            assert_eq!(err.message(), Some("bandwidth is required"));
            assert_eq!(err.request_id(), Some("req-1"));
            assert_eq!(raw.status(), 400);
        }
        other => panic!("expected service error, got: {}", other),
    }
}

#[tokio::test]
async fn malformed_success_body_is_a_response_error() {
    let conn = TestConnection::new(vec![(
        http::Request::builder()
            .uri("https://directconnect.us-east-1.example.com/")
            .body(WireBody::empty())
            .unwrap(),
        http::Response::builder()
            .status(200)
            .body(Bytes::from_static(b"{truncated"))
            .unwrap(),
    )]);
    let client = ServiceClient::new(json_factory(), endpoint(), conn);

    let err = client
        .invoke(&create_interconnect_op(), &Structure::default())
        .await
        .expect_err("body is not parseable");
    assert!(
        matches!(err, InvokeError::ResponseError { .. }),
        "expected response error, got: {}",
        err
    );
}

#[tokio::test]
async fn construction_failures_never_dispatch() {
    let conn = TestConnection::new(vec![]);
    let factory = ProtocolFactory::new(Protocol::AwsJson11, "DirectConnect", "2012-10-25");
    let op = OperationShape::new(
        "DeleteInterconnect",
        http::Method::POST,
        "/",
        Shape::builder("DeleteInterconnectRequest")
            .add(
                Member::new("interconnectId", WireLocation::BodyField, ShapeKind::String)
                    .required(),
            )
            .build(),
        Shape::empty("DeleteInterconnectResponse"),
    );
    let client = ServiceClient::new(factory, endpoint(), conn.clone());

    let err = client
        .invoke(&op, &Structure::default())
        .await
        .expect_err("required member missing");
    assert!(matches!(err, InvokeError::ConstructionFailure(_)));
    // nothing reached the wire
    assert_eq!(conn.requests().len(), 0);
}

#[tokio::test]
async fn query_protocol_end_to_end() {
    let op = OperationShape::new(
        "DeleteCertificate",
        http::Method::POST,
        "/",
        Shape::builder("DeleteCertificateRequest")
            .add(
                Member::new("certificateArn", WireLocation::BodyField, ShapeKind::String)
                    .renamed("CertificateArn")
                    .required(),
            )
            .build(),
        Shape::builder("DeleteCertificateResult")
            .add(Member::new("status", WireLocation::BodyField, ShapeKind::String).renamed("Status"))
            .build(),
    );
    let factory = ProtocolFactory::new(Protocol::AwsQuery, "CertificateManager", "2015-12-08");
    let conn = TestConnection::new(vec![(
        http::Request::builder()
            .method("POST")
            .uri("https://acm.us-east-1.example.com/")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(WireBody::from(
                "Action=DeleteCertificate&Version=2015-12-08\
                 &CertificateArn=arn%3Aaws%3Aacm%3A%3A1%3Acertificate%2Fabc",
            ))
            .unwrap(),
        http::Response::builder()
            .status(200)
            .body(Bytes::from_static(
                br#"<DeleteCertificateResponse>
                    <DeleteCertificateResult><Status>DELETED</Status></DeleteCertificateResult>
                    <ResponseMetadata><RequestId>req-2</RequestId></ResponseMetadata>
                </DeleteCertificateResponse>"#,
            ))
            .unwrap(),
    )]);
    let client = ServiceClient::new(
        factory,
        Uri::from_static("https://acm.us-east-1.example.com"),
        conn.clone(),
    );

    let input = Structure::builder()
        .field("certificateArn", "arn:aws:acm::1:certificate/abc")
        .build();
    let result = client.invoke(&op, &input).await.unwrap().unwrap();
    assert_eq!(result.get_str("status"), Some("DELETED"));

    let requests = conn.requests();
    requests[0].assert_matches(&[]);
    assert_ok(validate_body(
        requests[0].actual.body().bytes().unwrap(),
        "Action=DeleteCertificate&Version=2015-12-08\
         &CertificateArn=arn%3Aaws%3Aacm%3A%3A1%3Acertificate%2Fabc",
        MediaType::UrlEncodedForm,
    ));
}

#[tokio::test]
async fn invocations_through_the_task_pool() {
    let conn = TestConnection::new(vec![(
        http::Request::builder()
            .uri("https://directconnect.us-east-1.example.com/")
            .body(WireBody::empty())
            .unwrap(),
        http::Response::builder()
            .status(200)
            .body(Bytes::from_static(br#"{"interconnectId":"id9"}"#))
            .unwrap(),
    )]);
    let client = ServiceClient::new(json_factory(), endpoint(), conn);
    let pool = TaskPool::new(4);

    let callbacks = Arc::new(AtomicUsize::new(0));
    let seen = callbacks.clone();
    let op = create_interconnect_op();
    let task_client = client.clone();
    let handle = pool.submit(
        async move {
            let input = Structure::builder().field("bandwidth", "1Gbps").build();
            task_client.invoke(&op, &input).await
        },
        move |result| {
            let result = result.as_ref().expect("non-null result");
            assert_eq!(result.get_str("interconnectId"), Some("id9"));
            seen.fetch_add(1, Ordering::SeqCst);
        },
        |err| panic!("unexpected error: {}", err),
    );

    let result = handle.join().await.expect("task succeeded");
    assert_eq!(
        result.expect("non-null").get_str("interconnectId"),
        Some("id9")
    );
    pool.drain().await;
    assert_eq!(callbacks.load(Ordering::SeqCst), 1);
}
