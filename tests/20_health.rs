mod common;

use axum::http::{Method, StatusCode};

use common::{request, send, test_app, StubDirectory};

#[tokio::test]
async fn health_reports_unreachable_database() {
    let (status, body) = send(test_app(StubDirectory::default()), request(Method::GET, "/health", None, None)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["status"], "degraded");
}
