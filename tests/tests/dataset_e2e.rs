//! End-to-end tests for the dataset endpoints.
//!
//! Requests go through the real router and service; visits come from the
//! static provider unless a test starts the mock HTTP portal.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{TimeZone, Utc};
use dataset_store::Stores;
use integration_tests::{
    fixtures,
    mocks::MockPortal,
    setup::{self, TestContext},
};
use portal_client::{PortalClient, PortalConfig};
use retention_core::ManualClock;

/// Full lifecycle: create → renew → drop → delete (mark)
#[tokio::test]
async fn test_dataset_lifecycle_flow() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server.post("/dataset").json(&fixtures::create_body("MX1")).await;
    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["epn"], "MX1");
    assert_eq!(body["beamline"], "I03");
    assert_eq!(body["status"], "NORMAL");
    assert_eq!(body["excluded"], false);
    assert_eq!(body["expires_on"], "2024-03-01T10:00:00+10:00");
    assert_eq!(body["available"], false);
    assert_eq!(body["contact"], "rf@example.org");
    assert_eq!(body["visit"]["start"], "2024-01-01T10:00:00+10:00");
    assert_eq!(body["type"]["name_short"], "MX");
    assert_eq!(body["pi"]["org"]["name_short"], "KCL");
    assert_eq!(body["policy"]["retention"], 60);

    let response = server.get("/dataset/MX1").await;
    response.assert_status_ok();
    let fetched: serde_json::Value = response.json();
    assert_eq!(fetched, body);

    // Renewal stacks on the current expiry
    let response = server
        .post("/dataset/MX1/lifecycle")
        .json(&fixtures::renew_body(Some(30)))
        .await;
    response.assert_status_ok();
    let renewed: serde_json::Value = response.json();
    assert_eq!(renewed["type"], "RENEWED");
    assert_eq!(renewed["expires_on"], "2024-03-31T10:00:00+10:00");
    assert_eq!(renewed["created_at"], "2024-01-15T10:00:00+10:00");
    assert_eq!(renewed["user_id"], "u42");
    assert_eq!(renewed["notes"], "still processing");

    let response = server
        .delete("/dataset/MX1/lifecycle")
        .json(&fixtures::drop_body(false))
        .await;
    response.assert_status_ok();
    let dropped: serde_json::Value = response.json();
    assert_eq!(dropped["type"], "DROPPED");
    assert_eq!(dropped["expires_on"], "2024-03-31T10:00:00+10:00");

    let response = server
        .delete("/dataset/MX1/lifecycle")
        .json(&fixtures::drop_body(true))
        .await;
    response.assert_status_ok();
    let deleted: serde_json::Value = response.json();
    assert_eq!(deleted["type"], "DELETED");
    assert!(deleted["expires_on"].is_null());

    let response = server.get("/dataset/MX1/lifecycle").await;
    response.assert_status_ok();
    let history: serde_json::Value = response.json();
    assert_eq!(history["epn"], "MX1");
    let entries = history["lifecycle"].as_array().unwrap();
    let types: Vec<&str> = entries.iter().map(|e| e["type"].as_str().unwrap()).collect();
    assert_eq!(types, ["NORMAL", "RENEWED", "DROPPED", "DELETED"]);
    assert_eq!(entries[0]["user_name"], "auto");
    assert!(entries[0]["user_id"].is_null());

    let response = server.get("/dataset/MX1/lifecycle/last").await;
    response.assert_status_ok();
    let last: serde_json::Value = response.json();
    assert_eq!(last["type"], "DELETED");

    let response = server.get("/dataset/MX1").await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "DELETED");
    assert!(body["expires_on"].is_null());
}

/// An explicit expiry date is read in the configured zone
#[tokio::test]
async fn test_renew_with_local_expiry_date() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    server.post("/dataset").json(&fixtures::create_body("MX1")).await;

    let response = server
        .post("/dataset/MX1/lifecycle")
        .json(&fixtures::renew_until_body("2024-06-30T00:00:00"))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["expires_on"], "2024-06-30T00:00:00+10:00");
    assert_eq!(
        ctx.service.get_dataset("MX1").await.unwrap().current_expiry(),
        Some(Utc.with_ymd_and_hms(2024, 6, 29, 14, 0, 0).unwrap())
    );
}

/// Date-only and offset-qualified expiry dates are accepted
#[tokio::test]
async fn test_renew_with_date_only_and_offset_expiry() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    server.post("/dataset").json(&fixtures::create_body("MX1")).await;

    let response = server
        .post("/dataset/MX1/lifecycle")
        .json(&fixtures::renew_until_body("2024-06-30"))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["expires_on"], "2024-06-30T00:00:00+10:00");

    let response = server
        .post("/dataset/MX1/lifecycle")
        .json(&fixtures::renew_until_body("2024-07-31T12:00:00+00:00"))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["expires_on"], "2024-07-31T22:00:00+10:00");
}

/// PUT lifecycle expires a due dataset exactly once
#[tokio::test]
async fn test_expiry_check_is_idempotent() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    server.post("/dataset").json(&fixtures::create_body("MX1")).await;

    let response = server.put("/dataset/MX1/lifecycle").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["type"], "NORMAL");
    assert_eq!(body["changed"], false);

    ctx.clock.set(fixtures::ts(2024, 3, 2));
    let response = server.put("/dataset/MX1/lifecycle").await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["type"], "EXPIRED");
    assert_eq!(body["changed"], true);
    assert_eq!(body["user_name"], "auto");
    assert_eq!(body["expires_on"], "2024-03-01T10:00:00+10:00");

    let response = server.put("/dataset/MX1/lifecycle").await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["type"], "EXPIRED");
    assert_eq!(body["changed"], false);

    let history: serde_json::Value = server.get("/dataset/MX1/lifecycle").await.json();
    assert_eq!(history["lifecycle"].as_array().unwrap().len(), 2);

    // An expired dataset can still be renewed
    let response = server
        .post("/dataset/MX1/lifecycle")
        .json(&fixtures::renew_body(None))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["type"], "RENEWED");
    assert_eq!(body["expires_on"], "2024-04-30T10:00:00+10:00");
}

/// Excluded datasets have no expiry and ignore the expiry check
#[tokio::test]
async fn test_excluded_dataset() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    let response = server.post("/dataset").json(&fixtures::create_body("EXC1")).await;
    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["excluded"], true);
    assert!(body["expires_on"].is_null());

    ctx.clock.set(fixtures::ts(2090, 1, 1));
    let body: serde_json::Value = server.put("/dataset/EXC1/lifecycle").await.json();
    assert_eq!(body["type"], "NORMAL");
    assert_eq!(body["changed"], false);
}

/// Storage events feed the dataset's availability and totals
#[tokio::test]
async fn test_storage_events() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    server.post("/dataset").json(&fixtures::create_body("MX1")).await;

    let response = server
        .post("/dataset/MX1/storage")
        .json(&fixtures::storage_body("raw", Some(1_024), ""))
        .await;
    response.assert_status(StatusCode::CREATED);
    let event: serde_json::Value = response.json();
    assert_eq!(event["host"], "store01");
    assert_eq!(event["path"], "/data/raw");
    assert_eq!(event["size"], 1_024);
    assert_eq!(event["created_at"], "2024-01-15T10:00:00+10:00");

    let body: serde_json::Value = server.get("/dataset/MX1").await.json();
    assert_eq!(body["available"], true);
    assert_eq!(body["size"], 1_024);
    assert_eq!(body["count"], 3);

    ctx.clock.set(fixtures::ts(2024, 1, 16));
    server
        .post("/dataset/MX1/storage")
        .json(&fixtures::storage_body("processed", None, "mount lost"))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/dataset/MX1/storage")
        .json(&fixtures::storage_body("raw", Some(2_048), ""))
        .await
        .assert_status(StatusCode::CREATED);

    let body: serde_json::Value = server.get("/dataset/MX1").await.json();
    assert_eq!(body["available"], false);
    assert_eq!(body["size"], 2_048);

    let history: serde_json::Value = server.get("/dataset/MX1/storage").await.json();
    assert_eq!(history["storage"]["raw"].as_array().unwrap().len(), 2);
    assert_eq!(history["storage"]["processed"].as_array().unwrap().len(), 1);
    assert_eq!(history["storage"]["processed"][0]["error"], "mount lost");

    let latest: serde_json::Value = server.get("/dataset/MX1/storage/last").await.json();
    assert_eq!(latest["storage"]["raw"]["size"], 2_048);
    assert_eq!(latest["storage"]["raw"]["created_at"], "2024-01-16T10:00:00+10:00");
    assert!(latest["storage"]["processed"]["size"].is_null());
}

/// Search criteria combine with AND
#[tokio::test]
async fn test_search_datasets() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    for epn in ["MX2", "MX1", "EXC1"] {
        server
            .post("/dataset")
            .json(&fixtures::create_body(epn))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let epns = |body: serde_json::Value| -> Vec<String> {
        body["datasets"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["epn"].as_str().unwrap().to_string())
            .collect()
    };

    let all = server.get("/dataset").await.json();
    assert_eq!(epns(all), ["EXC1", "MX1", "MX2"]);

    let body = server.get("/dataset").add_query_param("epn", "mx").await.json();
    assert_eq!(epns(body), ["MX1", "MX2"]);

    let body = server.get("/dataset").add_query_param("beamline", "i03").await.json();
    assert_eq!(epns(body).len(), 3);

    let body = server.get("/dataset").add_query_param("excluded", "true").await.json();
    assert_eq!(epns(body), ["EXC1"]);

    let body = server.get("/dataset").add_query_param("type", "commission").await.json();
    assert_eq!(epns(body), ["EXC1"]);

    let body = server
        .get("/dataset")
        .add_query_param("pi_name", "frank")
        .add_query_param("excluded", "no")
        .await
        .json();
    assert_eq!(epns(body), ["MX1", "MX2"]);

    server
        .delete("/dataset/MX2/lifecycle")
        .json(&fixtures::drop_body(false))
        .await
        .assert_status_ok();
    let body = server.get("/dataset").add_query_param("status", "dropped").await.json();
    assert_eq!(epns(body), ["MX2"]);

    let body = server.get("/dataset").add_query_param("beamline", "I04").await.json();
    assert!(epns(body).is_empty());
}

/// PUT visit re-reads the portal
#[tokio::test]
async fn test_refresh_visit() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    server.post("/dataset").json(&fixtures::create_body("MX1")).await;

    let mut visit = fixtures::visit("I03");
    visit.title = "Lysozyme soak, second shift".into();
    ctx.portal.insert("MX1", visit);

    let response = server.put("/dataset/MX1/visit").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["visit"]["title"], "Lysozyme soak, second shift");
    assert_eq!(body["status"], "NORMAL");
}

/// DELETE removes the record entirely
#[tokio::test]
async fn test_delete_dataset() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    server.post("/dataset").json(&fixtures::create_body("MX1")).await;

    let response = server.delete("/dataset/MX1").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["deleted"], true);
    assert_eq!(body["epn"], "MX1");

    server.get("/dataset/MX1").await.assert_status(StatusCode::NOT_FOUND);

    // The EPN can be registered again
    server
        .post("/dataset")
        .json(&fixtures::create_body("MX1"))
        .await
        .assert_status(StatusCode::CREATED);
}

/// Same flow on the SQLite store
#[tokio::test]
async fn test_lifecycle_on_sqlite_store() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = TestContext::sqlite(dir.path()).await;
    let server = ctx.server();

    server
        .post("/dataset")
        .json(&fixtures::create_body("MX1"))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/dataset/MX1/storage")
        .json(&fixtures::storage_body("raw", Some(10), ""))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/dataset/MX1/lifecycle")
        .json(&fixtures::renew_body(Some(5)))
        .await
        .assert_status_ok();

    let body: serde_json::Value = server.get("/dataset/MX1").await.json();
    assert_eq!(body["status"], "RENEWED");
    assert_eq!(body["expires_on"], "2024-03-06T10:00:00+10:00");
    assert_eq!(body["size"], 10);

    let history: serde_json::Value = server.get("/dataset/MX1/lifecycle").await.json();
    assert_eq!(history["lifecycle"].as_array().unwrap().len(), 2);
}

/// Visits resolved through the HTTP portal client
#[tokio::test]
async fn test_create_through_portal_client() {
    let portal = MockPortal::start("s3cret").await;
    portal.insert("MX1", fixtures::visit("I03"));
    portal.insert("MX2", fixtures::visit("I03"));

    let client = PortalClient::new(&PortalConfig {
        url: portal.url.clone(),
        client: "datastore".into(),
        password: "s3cret".into(),
        ..Default::default()
    })
    .unwrap();

    let clock = Arc::new(ManualClock::new(fixtures::ts(2024, 1, 15)));
    let (_, router) = setup::build(Stores::in_memory(), Arc::new(client), clock).await;
    let server = TestServer::new(router).unwrap();

    for epn in ["MX1", "MX2"] {
        let response = server.post("/dataset").json(&fixtures::create_body(epn)).await;
        response.assert_status(StatusCode::CREATED);
        let body: serde_json::Value = response.json();
        assert_eq!(body["beamline"], "I03");
        assert_eq!(body["pi"]["last_name"], "Franklin");
        assert_eq!(body["expires_on"], "2024-03-01T10:00:00+10:00");
    }
    assert_eq!(portal.login_count(), 1);

    let response = server.post("/dataset").json(&fixtures::create_body("MX404")).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "PORTAL_ERROR");
}
