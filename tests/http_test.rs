// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP surface tests: public submission endpoint and admin routes.

mod harness;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use harness::fixtures::{
    app_state, app_state_with_store, test_config, StalledFollowUpStore, ADMIN_EMAIL,
    ADMIN_PASSWORD,
};
use lead_intake::{handlers::router, models::EmailStatus, store::LeadStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn post_raw(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn quote(company: &str) -> Value {
    json!({
        "companyName": company,
        "fleetSize": "10-50",
        "fuelType": "Diesel",
        "email": "ops@acme.com",
        "phone": "",
        "captchaToken": "ignored"
    })
}

/// Log in and return the `name=value` cookie pair.
async fn login(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/admin/auth/login",
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (_, state) = app_state(test_config());
    let response = router(state).oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_submit_lead_success() {
    let (store, state) = app_state(test_config());
    let app = router(state);

    let response = app
        .oneshot(post_json("/api/leads", quote("Acme Co")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Quote request submitted successfully!");
    let lead_id = body["leadId"].as_str().unwrap();

    let lead = store.find(lead_id).await.unwrap().unwrap();
    assert_eq!(lead.company_name, "Acme Co");
    assert_eq!(lead.email_status, EmailStatus::Error);
}

#[tokio::test]
async fn test_submit_lead_validation_errors() {
    let (store, state) = app_state(test_config());
    let app = router(state);

    let response = app
        .oneshot(post_json("/api/leads", json!({ "email": "bad" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(body["errors"]["companyName"].is_array());
    assert!(body["errors"]["email"].is_array());
    assert!(body.get("leadId").is_none());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_submit_lead_unreadable_body() {
    let (store, state) = app_state(test_config());
    let app = router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/api/leads")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_submit_lead_reports_mistyped_fields() {
    let (store, state) = app_state(test_config());
    let app = router(state);

    let response = app
        .oneshot(post_raw(
            "/api/leads",
            r#"{"companyName":"A","fleetSize":10,"email":"bad"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"]["fleetSize"], json!(["Fleet size must be text"]));
    assert!(body["errors"]["companyName"].is_array());
    assert_eq!(body["errors"]["email"], json!(["Invalid email address"]));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_limited_client_gets_429_for_any_body() {
    let (store, state) = app_state(test_config());
    let app = router(state);

    for i in 0..5 {
        let response = app
            .clone()
            .oneshot(post_json("/api/leads", quote(&format!("Company {}", i))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    for body in ["{not json", r#"{"fleetSize":10}"#, "[]"] {
        let response = app.clone().oneshot(post_raw("/api/leads", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS, "{body}");
        assert!(response.headers().get(header::RETRY_AFTER).is_some());
    }
    assert_eq!(store.len().await, 5);
}

#[tokio::test]
async fn test_submit_lead_rate_limited() {
    let (store, state) = app_state(test_config());
    let app = router(state);

    for i in 0..5 {
        let response = app
            .clone()
            .oneshot(post_json("/api/leads", quote(&format!("Company {}", i))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(post_json("/api/leads", quote("Company 5")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = response
        .headers()
        .get(header::RETRY_AFTER)
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 900);

    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(store.len().await, 5);
}

#[tokio::test]
async fn test_forwarded_for_is_honored_behind_trusted_proxy() {
    let mut config = test_config();
    config.trust_proxy_headers = true;
    let (store, state) = app_state(config);
    let app = router(state);

    // Seven clients, one submission each: none is limited.
    for i in 0..7 {
        let request = Request::builder()
            .method("POST")
            .uri("/api/leads")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", format!("203.0.113.{}, 10.0.0.1", i))
            .body(Body::from(quote("Acme Co").to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(store.len().await, 7);
}

#[tokio::test]
async fn test_admin_requires_session() {
    let (_, state) = app_state(test_config());
    let app = router(state);

    let response = app
        .clone()
        .oneshot(get("/api/admin/leads", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(get("/api/admin/leads", Some("lead_admin_session=forged.00")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_login_rejects_bad_credentials() {
    let (_, state) = app_state(test_config());
    let app = router(state);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/admin/auth/login",
            json!({ "email": ADMIN_EMAIL, "password": "wrong" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let response = app
        .oneshot(post_json("/api/admin/auth/login", json!({ "email": ADMIN_EMAIL })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_login_then_list_and_fetch() {
    let (_, state) = app_state(test_config());
    let app = router(state);

    let mut ids = Vec::new();
    for i in 0..3 {
        let response = app
            .clone()
            .oneshot(post_json("/api/leads", quote(&format!("Company {}", i))))
            .await
            .unwrap();
        let body = json_body(response).await;
        ids.push(body["leadId"].as_str().unwrap().to_string());
    }

    let cookie = login(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/admin/leads", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let leads = json_body(response).await;
    let leads = leads.as_array().unwrap();
    assert_eq!(leads.len(), 3);
    assert_eq!(leads[0]["id"], ids[2].as_str());
    assert!(leads[0]["createdAt"].is_string());
    assert_eq!(leads[0]["emailStatus"], "error");

    let response = app
        .clone()
        .oneshot(get("/api/admin/leads?limit=1", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/admin/leads/{}", ids[0]), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["companyName"], "Company 0");

    let response = app
        .oneshot(get("/api/admin/leads/does-not-exist", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let (_, state) = app_state(test_config());
    let app = router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/api/admin/auth/logout")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("lead_admin_session=;"));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_open_access_only_outside_production() {
    let mut config = test_config();
    config.admin.open_access = true;
    let (_, state) = app_state(config.clone());
    let response = router(state)
        .oneshot(get("/api/admin/leads", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    config.environment = lead_intake::config::Environment::Production;
    let (_, state) = app_state(config);
    let response = router(state)
        .oneshot(get("/api/admin/leads", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unreadable_limit_does_not_mask_missing_session() {
    let (_, state) = app_state(test_config());
    let app = router(state);

    let response = app
        .clone()
        .oneshot(get("/api/admin/leads?limit=abc", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    app.clone()
        .oneshot(post_json("/api/leads", quote("Acme Co")))
        .await
        .unwrap();
    let cookie = login(&app).await;
    let response = app
        .oneshot(get("/api/admin/leads?limit=abc", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_stalled_store_degrades_admin_reads() {
    let mut config = test_config();
    config.intake.store_timeout_ms = 50;
    let store = Arc::new(StalledFollowUpStore::default());
    let app = router(app_state_with_store(config, store.clone()));

    let response = app
        .clone()
        .oneshot(post_json("/api/leads", quote("Acme Co")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let lead_id = json_body(response).await["leadId"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(store.inner.find(&lead_id).await.unwrap().is_some());

    let cookie = login(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/admin/leads", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!([]));

    let response = app
        .oneshot(get(&format!("/api/admin/leads/{}", lead_id), Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"], "Internal error");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (_, state) = app_state(test_config());
    let app = router(state);

    app.clone()
        .oneshot(post_json("/api/leads", quote("Acme Co")))
        .await
        .unwrap();

    let response = app.oneshot(get("/metrics", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("lead_submissions_total{outcome=\"accepted\"} 1"));
}
