//! Integration tests for the reqwest transport against a local axum server.

use std::net::SocketAddr;
use std::time::Duration;

use afrikunle_core::error::ClientError;
use afrikunle_core::transport::{HttpRequest, HttpTransport, Method};
use afrikunle_transport::ReqwestTransport;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

async fn serve() -> SocketAddr {
    let app = Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "late"
            }),
        )
        .route("/echo", post(|Json(body): Json<Value>| async move { Json(body) }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_get_returns_status_and_body() {
    // Arrange
    let addr = serve().await;
    let transport = ReqwestTransport::new().unwrap();

    // Act
    let response = transport
        .execute(
            HttpRequest::get(format!("http://{addr}/health")),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status, 200);
    assert_eq!(response.json().unwrap()["status"], "ok");
}

#[tokio::test]
async fn test_error_status_is_a_response_not_an_error() {
    let addr = serve().await;
    let transport = ReqwestTransport::new().unwrap();

    let response = transport
        .execute(
            HttpRequest::get(format!("http://{addr}/missing")),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 404);
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let addr = serve().await;
    let transport = ReqwestTransport::new().unwrap();
    let request = HttpRequest::post_json(format!("http://{addr}/echo"), json!({ "code": "print(1)" }));
    assert_eq!(request.method, Method::Post);

    let response = transport
        .execute(request, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.json().unwrap(), json!({ "code": "print(1)" }));
}

#[tokio::test]
async fn test_abort_signal_ends_in_flight_request() {
    // Arrange
    let addr = serve().await;
    let transport = ReqwestTransport::new().unwrap();
    let abort = CancellationToken::new();
    let trigger = abort.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    // Act
    let started = std::time::Instant::now();
    let result = transport
        .execute(HttpRequest::get(format!("http://{addr}/slow")), abort)
        .await;

    // Assert
    assert_eq!(result, Err(ClientError::Network("request aborted".to_owned())));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    // Arrange: bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let transport = ReqwestTransport::new().unwrap();

    // Act
    let result = transport
        .execute(
            HttpRequest::get(format!("http://{addr}/health")),
            CancellationToken::new(),
        )
        .await;

    // Assert
    assert!(matches!(result, Err(ClientError::Network(_))));
}
