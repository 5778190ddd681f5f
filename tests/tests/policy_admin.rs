//! Policy administration endpoints.

use axum::http::StatusCode;
use integration_tests::{fixtures, setup::TestContext};

#[tokio::test]
async fn test_policy_crud() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server.post("/policy").json(&fixtures::policy_body("B21", 30)).await;
    response.assert_status(StatusCode::CREATED);
    let created: serde_json::Value = response.json();
    assert_eq!(created["beamline"], "B21");
    assert!(created["id"].is_string());

    let response = server.get("/policy/B21").await;
    response.assert_status_ok();
    let policy: serde_json::Value = response.json();
    assert_eq!(policy["retention"], 30);
    assert_eq!(policy["quota"], 1000);
    assert_eq!(policy["exclude_type"], serde_json::json!([fixtures::COMMISSIONING_TYPE]));
    assert_eq!(policy["exclude_org"], serde_json::json!([]));
    assert_eq!(policy["id"], created["id"]);

    let listed: serde_json::Value = server.get("/policy").await.json();
    let beamlines: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["beamline"].as_str().unwrap())
        .collect();
    assert_eq!(beamlines, ["B21", "I03"]);

    let response = server
        .put("/policy/B21")
        .json(&serde_json::json!({ "retention": 90, "notes": "SAXS" }))
        .await;
    response.assert_status_ok();
    let updated: serde_json::Value = response.json();
    assert_eq!(updated["beamline"], "B21");
    assert_eq!(updated["id"], created["id"]);

    let policy: serde_json::Value = server.get("/policy/B21").await.json();
    assert_eq!(policy["retention"], 90);
    assert_eq!(policy["quota"], 1000);
    assert_eq!(policy["notes"], "SAXS");

    let response = server.delete("/policy/B21").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["beamline"], "B21");

    let response = server.get("/policy/B21").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_duplicate_policy() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server.post("/policy").json(&fixtures::policy_body("I03", 10)).await;
    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "ALREADY_EXISTS");
}

#[tokio::test]
async fn test_policy_validation() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server.post("/policy").json(&fixtures::policy_body("", 10)).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .put("/policy/I03")
        .json(&serde_json::json!({ "retention": 50_000 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .put("/policy/I99")
        .json(&serde_json::json!({ "retention": 5 }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

/// A policy in use by a dataset cannot be deleted
#[tokio::test]
async fn test_delete_referenced_policy() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    server
        .post("/policy")
        .json(&fixtures::policy_body("B21", 30))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/dataset")
        .json(&fixtures::create_body("NOPOL1"))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server.delete("/policy/B21").await;
    response.assert_status(StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "REFERENTIAL_CONFLICT");

    server.delete("/dataset/NOPOL1").await.assert_status_ok();
    server.delete("/policy/B21").await.assert_status_ok();

    let response = server.delete("/policy/B21").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

/// Datasets keep the policy values they were created with
#[tokio::test]
async fn test_policy_update_keeps_dataset_snapshot() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    server.post("/dataset").json(&fixtures::create_body("MX1")).await;

    server
        .put("/policy/I03")
        .json(&serde_json::json!({ "retention": 7 }))
        .await
        .assert_status_ok();

    let body: serde_json::Value = server.get("/dataset/MX1").await.json();
    assert_eq!(body["policy"]["retention"], 60);
    assert_eq!(body["expires_on"], "2024-03-01T10:00:00+10:00");

    // New datasets pick up the new retention
    let body: serde_json::Value = server
        .post("/dataset")
        .json(&fixtures::create_body("MX2"))
        .await
        .json();
    assert_eq!(body["policy"]["retention"], 7);
    assert_eq!(body["expires_on"], "2024-01-08T10:00:00+10:00");
}
