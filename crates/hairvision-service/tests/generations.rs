//! Guarded image generation integration tests (Gemini mocked with wiremock).

mod common;

use axum::http::StatusCode;
use common::{gemini_image_response, generation_body, test_config, TestHarness, TEST_GEMINI_KEY};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use hairvision_store::Store;

const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash-image:generateContent";

async fn mock_success(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", TEST_GEMINI_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_image_response()))
        .mount(server)
        .await;
}

// ============================================================================
// Success
// ============================================================================

#[tokio::test]
async fn generation_charges_credits_by_resolution() {
    let gemini = MockServer::start().await;
    mock_success(&gemini).await;
    let harness = TestHarness::with_gemini(&gemini.uri());

    let response = harness
        .server
        .post(&harness.salon_path("/generations"))
        .json(&generation_body("2k"))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["mime_type"], "image/png");
    assert_eq!(body["text"], "Here is the new look");
    assert_eq!(body["credits_charged"], 2);
    assert_eq!(body["cost_cents"], 8);
    assert_eq!(body["resolution"], "2k");
    assert_eq!(body["balance"]["used_credits"], 2);
    assert_eq!(body["stats"]["available"], 98);

    let history = harness
        .store
        .list_usage(&harness.salon_id, 10, 0)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].credits_used, 2);
    assert_eq!(history[0].model, "gemini-2.5-flash-image");

    let status = harness.breaker.status();
    assert_eq!(status.failure_count, 0);
}

#[tokio::test]
async fn generation_into_overage_is_allowed_by_default() {
    let gemini = MockServer::start().await;
    mock_success(&gemini).await;
    let harness = TestHarness::with_gemini(&gemini.uri());

    harness
        .server
        .post(&harness.salon_path("/credits/usage"))
        .json(&json!({ "credits_used": 100 }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post(&harness.salon_path("/generations"))
        .json(&generation_body("4k"))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["stats"]["overage"], 4);
    assert_eq!(body["stats"]["is_overage"], true);
}

// ============================================================================
// Validation and gating
// ============================================================================

#[tokio::test]
async fn invalid_requests_never_reach_gemini() {
    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_image_response()))
        .expect(0)
        .mount(&gemini)
        .await;
    let harness = TestHarness::with_gemini(&gemini.uri());

    let mut empty_prompt = generation_body("1k");
    empty_prompt["prompt"] = json!("   ");
    let mut bad_image = generation_body("1k");
    bad_image["image_base64"] = json!("%%% not base64 %%%");
    let mut bad_mime = generation_body("1k");
    bad_mime["mime_type"] = json!("application/pdf");

    for body in [empty_prompt, bad_image, bad_mime] {
        let response = harness
            .server
            .post(&harness.salon_path("/generations"))
            .json(&body)
            .await;
        response.assert_status_bad_request();
        let error: serde_json::Value = response.json();
        assert_eq!(error["error"]["code"], "invalid_argument");
    }
}

#[tokio::test]
async fn insufficient_credits_when_overage_disabled() {
    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_image_response()))
        .expect(0)
        .mount(&gemini)
        .await;

    let mut config = test_config();
    config.gemini_api_url = gemini.uri();
    config.gemini_api_key = Some(TEST_GEMINI_KEY.into());
    config.allow_overage = false;
    let harness = TestHarness::with_config(config);

    harness
        .server
        .post(&harness.salon_path("/credits/usage"))
        .json(&json!({ "credits_used": 99 }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post(&harness.salon_path("/generations"))
        .json(&generation_body("2k"))
        .await;

    response.assert_status(StatusCode::PAYMENT_REQUIRED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_credits");
    assert_eq!(body["error"]["details"]["available"], 1);
    assert_eq!(body["error"]["details"]["required"], 2);
}

#[tokio::test]
async fn generation_unavailable_without_api_key() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post(&harness.salon_path("/generations"))
        .json(&generation_body("1k"))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "unavailable");
}

// ============================================================================
// Upstream failures and the breaker
// ============================================================================

#[tokio::test]
async fn upstream_failure_is_recorded_and_not_charged() {
    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "code": 500, "message": "Internal error", "status": "INTERNAL" }
        })))
        .mount(&gemini)
        .await;
    let harness = TestHarness::with_gemini(&gemini.uri());

    let response = harness
        .server
        .post(&harness.salon_path("/generations"))
        .json(&generation_body("1k"))
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "upstream_failure");

    assert_eq!(harness.breaker.status().failure_count, 1);
    let history = harness
        .store
        .list_usage(&harness.salon_id, 10, 0)
        .await
        .unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn breaker_opens_after_threshold_and_short_circuits() {
    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(5)
        .mount(&gemini)
        .await;
    let harness = TestHarness::with_gemini(&gemini.uri());

    for _ in 0..5 {
        harness
            .server
            .post(&harness.salon_path("/generations"))
            .json(&generation_body("1k"))
            .await
            .assert_status(StatusCode::BAD_GATEWAY);
    }

    // Sixth call is rejected without touching Gemini
    let response = harness
        .server
        .post(&harness.salon_path("/generations"))
        .json(&generation_body("1k"))
        .await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "circuit_open");

    let retry_after: u64 = response
        .headers()
        .get("retry-after")
        .expect("Retry-After header")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 60);

    gemini.verify().await;
}

#[tokio::test]
async fn reset_closes_breaker_and_generation_resumes() {
    let failing = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&failing)
        .await;
    let harness = TestHarness::with_gemini(&failing.uri());

    for _ in 0..5 {
        harness.breaker.record_failure();
    }
    harness
        .server
        .post(&harness.salon_path("/generations"))
        .json(&generation_body("1k"))
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    harness
        .server
        .post("/v1/admin/circuit-breaker/reset")
        .await
        .assert_status_ok();

    // Closed again, so the next call reaches the (still failing) upstream
    harness
        .server
        .post(&harness.salon_path("/generations"))
        .json(&generation_body("1k"))
        .await
        .assert_status(StatusCode::BAD_GATEWAY);
    assert_eq!(harness.breaker.status().failure_count, 1);
}
