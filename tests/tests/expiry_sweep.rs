//! Background expiry sweep against the HTTP surface.

use axum::http::StatusCode;
use integration_tests::{fixtures, setup::TestContext};
use worker::ExpiryWorker;

#[tokio::test]
async fn test_sweep_expires_due_datasets() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    for epn in ["MX1", "EXC1"] {
        server
            .post("/dataset")
            .json(&fixtures::create_body(epn))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let worker = ExpiryWorker::new(ctx.service.clone());

    let report = worker.run().await.unwrap();
    assert_eq!(report.checked, 2);
    assert!(report.expired.is_empty());

    ctx.clock.set(fixtures::ts(2024, 3, 2));
    let report = worker.run().await.unwrap();
    assert_eq!(report.checked, 2);
    assert_eq!(report.expired, ["MX1"]);
    assert!(report.failed.is_empty());

    let last: serde_json::Value = server.get("/dataset/MX1/lifecycle/last").await.json();
    assert_eq!(last["state"], "EXPIRED");
    let last: serde_json::Value = server.get("/dataset/EXC1/lifecycle/last").await.json();
    assert_eq!(last["state"], "NORMAL");

    // Already expired datasets are left alone
    let report = worker.run().await.unwrap();
    assert!(report.expired.is_empty());
    let history: serde_json::Value = server.get("/dataset/MX1/lifecycle").await.json();
    assert_eq!(history["lifecycle"].as_array().unwrap().len(), 2);
}
