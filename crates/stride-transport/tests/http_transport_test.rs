//! Integration tests for HTTP transport

use bytes::Bytes;
use http::{HeaderName, HeaderValue, Method};
use rstest::rstest;
use std::time::Duration;
use stride_transport::{HttpRequest, HttpTransport, Transport, TransportError};
use url::Url;
use wiremock::matchers::{body_bytes, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn url(server: &MockServer, suffix: &str) -> Url {
    format!("{}{}", server.uri(), suffix)
        .parse()
        .expect("mock server URL")
}

#[tokio::test]
async fn test_send_passes_headers_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/athlete"))
        .and(query_param("units", "metric"))
        .and(header("x-client-version", "1.2.3"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-request-id", "req-1")
                .set_body_string(r#"{"id":"ath_1"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new().expect("Failed to create HTTP transport");
    let request = HttpRequest::new(Method::GET, url(&server, "/v1/athlete?units=metric"))
        .with_header(
            HeaderName::from_static("x-client-version"),
            HeaderValue::from_static("1.2.3"),
        );

    let response = transport.send(request).await.expect("request should succeed");

    assert_eq!(response.status, 200);
    assert_eq!(response.header("x-request-id"), Some("req-1"));
    assert_eq!(response.body, Bytes::from_static(br#"{"id":"ath_1"}"#));
}

#[rstest]
#[case(Method::POST)]
#[case(Method::PUT)]
#[case(Method::PATCH)]
#[tokio::test]
async fn test_send_passes_body(#[case] verb: Method) {
    let server = MockServer::start().await;
    Mock::given(method(verb.as_str()))
        .and(path("/v1/workouts"))
        .and(body_bytes(b"{\"distance\":5000}".to_vec()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new().unwrap();
    let request = HttpRequest::new(verb, url(&server, "/v1/workouts"))
        .with_body(Bytes::from_static(b"{\"distance\":5000}"));

    let response = transport.send(request).await.unwrap();
    assert_eq!(response.status, 201);
}

#[tokio::test]
async fn test_error_statuses_are_responses_not_errors() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let transport = HttpTransport::new().unwrap();
    let response = transport
        .send(HttpRequest::new(Method::DELETE, url(&server, "/v1/workouts/1")))
        .await
        .unwrap();

    assert_eq!(response.status, 503);
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_per_attempt_timeout_is_reported_as_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let transport = HttpTransport::new().unwrap();
    let request = HttpRequest::new(Method::GET, url(&server, "/slow"))
        .with_timeout(Duration::from_millis(50));

    let err = transport.send(request).await.unwrap_err();
    assert!(matches!(err, TransportError::Timeout), "got {err:?}");
}

#[tokio::test]
async fn test_connection_refused_is_not_a_timeout() {
    // Port 9 (discard) is essentially never listening on test machines.
    let request = HttpRequest::new(Method::GET, "http://127.0.0.1:9/".parse().unwrap())
        .with_timeout(Duration::from_secs(2));

    let err = HttpTransport::new().unwrap().send(request).await.unwrap_err();
    assert!(!err.is_timeout(), "got {err:?}");
}
