//! Error responses of the dataset endpoints.
//!
//! Every failure carries a stable `code`; rejected commands leave the
//! stored dataset untouched.

use axum::http::StatusCode;
use axum_test::{TestResponse, TestServer};
use integration_tests::{fixtures, setup::TestContext};
use portal_client::PortalError;

fn assert_error(response: &TestResponse, status: StatusCode, code: &str) -> serde_json::Value {
    response.assert_status(status);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], code, "unexpected body {}", body);
    assert!(body["error"].is_string());
    body
}

async fn with_mx1() -> (TestContext, TestServer) {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    server
        .post("/dataset")
        .json(&fixtures::create_body("MX1"))
        .await
        .assert_status(StatusCode::CREATED);
    (ctx, server)
}

#[tokio::test]
async fn test_duplicate_create() {
    let (_ctx, server) = with_mx1().await;
    let response = server.post("/dataset").json(&fixtures::create_body("MX1")).await;
    assert_error(&response, StatusCode::CONFLICT, "ALREADY_EXISTS");
}

#[tokio::test]
async fn test_create_without_policy() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server.post("/dataset").json(&fixtures::create_body("NOPOL1")).await;
    let body = assert_error(&response, StatusCode::UNPROCESSABLE_ENTITY, "POLICY_MISSING");
    assert!(body["error"].as_str().unwrap().contains("B21"));

    server.get("/dataset/NOPOL1").await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_with_invalid_epn() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server
        .post("/dataset")
        .json(&fixtures::create_body("not an epn!"))
        .await;
    let body = assert_error(&response, StatusCode::BAD_REQUEST, "VALIDATION");
    assert!(body["details"][0].as_str().unwrap().starts_with("epn"));
}

#[tokio::test]
async fn test_create_with_malformed_body() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server
        .post("/dataset")
        .json(&serde_json::json!({ "experiment": "MX1" }))
        .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "VALIDATION");
}

#[tokio::test]
async fn test_create_unknown_visit() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server.post("/dataset").json(&fixtures::create_body("MX999")).await;
    assert_error(&response, StatusCode::BAD_REQUEST, "PORTAL_ERROR");
}

#[tokio::test]
async fn test_portal_outage() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    ctx.portal
        .fail_with(PortalError::Authentication("401 Unauthorized".into()));

    let response = server.post("/dataset").json(&fixtures::create_body("MX1")).await;
    let body = assert_error(&response, StatusCode::BAD_REQUEST, "PORTAL_ERROR");
    assert!(body["error"].as_str().unwrap().contains("authentication"));

    ctx.portal.clear_outage();
    server
        .post("/dataset")
        .json(&fixtures::create_body("MX1"))
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_unknown_dataset() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    assert_error(&server.get("/dataset/MX1").await, StatusCode::NOT_FOUND, "NOT_FOUND");
    assert_error(&server.delete("/dataset/MX1").await, StatusCode::NOT_FOUND, "NOT_FOUND");
    assert_error(
        &server.put("/dataset/MX1/lifecycle").await,
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
    );
    assert_error(
        &server.get("/dataset/MX1/storage").await,
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
    );
    assert_error(
        &server
            .post("/dataset/MX1/storage")
            .json(&fixtures::storage_body("raw", Some(1), ""))
            .await,
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
    );
    assert_error(
        &server.put("/dataset/MX1/visit").await,
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
    );
}

#[tokio::test]
async fn test_delete_before_drop_is_rejected() {
    let (_ctx, server) = with_mx1().await;

    let response = server
        .delete("/dataset/MX1/lifecycle")
        .json(&fixtures::drop_body(true))
        .await;
    let body = assert_error(&response, StatusCode::CONFLICT, "INVALID_TRANSITION");
    assert!(body["error"].as_str().unwrap().contains("NORMAL"));

    let history: serde_json::Value = server.get("/dataset/MX1/lifecycle").await.json();
    assert_eq!(history["lifecycle"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_double_drop_is_rejected() {
    let (_ctx, server) = with_mx1().await;

    server
        .delete("/dataset/MX1/lifecycle")
        .json(&fixtures::drop_body(false))
        .await
        .assert_status_ok();
    let response = server
        .delete("/dataset/MX1/lifecycle")
        .json(&fixtures::drop_body(false))
        .await;
    assert_error(&response, StatusCode::CONFLICT, "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_renew_after_drop_is_rejected() {
    let (_ctx, server) = with_mx1().await;

    server
        .delete("/dataset/MX1/lifecycle")
        .json(&fixtures::drop_body(false))
        .await
        .assert_status_ok();
    let response = server
        .post("/dataset/MX1/lifecycle")
        .json(&fixtures::renew_body(Some(10)))
        .await;
    assert_error(&response, StatusCode::CONFLICT, "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_renew_excluded_is_rejected() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    server.post("/dataset").json(&fixtures::create_body("EXC1")).await;

    let response = server
        .post("/dataset/EXC1/lifecycle")
        .json(&fixtures::renew_body(Some(10)))
        .await;
    assert_error(&response, StatusCode::CONFLICT, "INVALID_TRANSITION");
}

#[tokio::test]
async fn test_renew_validation() {
    let (_ctx, server) = with_mx1().await;

    let response = server
        .post("/dataset/MX1/lifecycle")
        .json(&fixtures::renew_body(Some(40_000)))
        .await;
    let body = assert_error(&response, StatusCode::BAD_REQUEST, "VALIDATION");
    assert!(body["details"][0].as_str().unwrap().starts_with("days"));

    let response = server
        .post("/dataset/MX1/lifecycle")
        .json(&fixtures::renew_until_body("next tuesday"))
        .await;
    let body = assert_error(&response, StatusCode::BAD_REQUEST, "VALIDATION");
    assert!(body["details"][0].as_str().unwrap().starts_with("expiry_date"));

    let response = server
        .post("/dataset/MX1/lifecycle")
        .json(&serde_json::json!({ "days": 5, "user_id": "", "user_name": "x" }))
        .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "VALIDATION");

    let history: serde_json::Value = server.get("/dataset/MX1/lifecycle").await.json();
    assert_eq!(history["lifecycle"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_storage_validation() {
    let (_ctx, server) = with_mx1().await;

    let response = server
        .post("/dataset/MX1/storage")
        .json(&serde_json::json!({ "name": "", "host": "store01", "path": "/data" }))
        .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "VALIDATION");
}

#[tokio::test]
async fn test_search_rejects_unknown_status() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server.get("/dataset").add_query_param("status", "ARCHIVED").await;
    assert_error(&response, StatusCode::BAD_REQUEST, "VALIDATION");

    let response = server.get("/dataset").add_query_param("excluded", "maybe").await;
    assert_error(&response, StatusCode::BAD_REQUEST, "VALIDATION");
}
