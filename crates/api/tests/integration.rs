//! Integration tests for API routes.
//!
//! Uses `tower::ServiceExt` to test Axum routes without a real HTTP server;
//! the remote data store is a wiremock server.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use barbe_api::build_state;
use barbe_api::routes::create_router;
use barbe_common::config::AppConfig;

// ============================================================
// Helpers
// ============================================================

fn test_config(store_url: &str) -> AppConfig {
    AppConfig {
        store_url: store_url.to_string(),
        store_anon_key: "anon-key".to_string(),
        store_service_key: "service-key".to_string(),
        port: 0,
        notification_lead_minutes: 60,
        dispatch_interval_secs: 60,
        cleanup_interval_secs: 86400,
        store_max_attempts: 3,
        vapid_public_key: Some("test-public-key".to_string()),
        vapid_private_key: None,
        vapid_subject: "mailto:test@example.com".to_string(),
        telegram_bot_token: None,
        telegram_chat_id: None,
        broadcast_fallback: false,
    }
}

fn test_app(store_url: &str) -> axum::Router {
    create_router(build_state(test_config(store_url)))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_value(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn appointment_row(id: i64, user_id: Option<&str>, owner_token: &str) -> Value {
    json!({
        "id": id,
        "name": "Ana",
        "service": "Corte",
        "date": "2030-01-01",
        "time": "09:00:00",
        "user_id": user_id,
        "owner_token": owner_token,
        "notification_sent": false
    })
}

// ============================================================
// Health / services
// ============================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = MockServer::start().await;
    let app = test_app(&server.uri());

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_value(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "barbe-api");
}

#[tokio::test]
async fn test_list_services() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "title": "Corte", "description": "Classic cut", "price": 25.0 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(&server.uri());
    let response = app
        .oneshot(Request::get("/services").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_value(response).await;
    assert_eq!(body[0]["title"], "Corte");
}

// ============================================================
// Appointments
// ============================================================

#[tokio::test]
async fn test_create_appointment_persists_owner_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([appointment_row(1, None, "stored-token")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(&server.uri());
    let response = app
        .oneshot(json_request(
            "POST",
            "/appointments",
            json!({ "name": "Ana", "service": "Corte", "date": "2030-01-01", "time": "09:00" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_value(response).await;
    assert_eq!(body["owner_token"], "stored-token");

    // The insert payload carries a generated 32-char alphanumeric token and
    // an unset dispatch flag.
    let requests = server.received_requests().await.unwrap();
    let payload: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let row = &payload[0];
    let token = row["owner_token"].as_str().unwrap();
    assert_eq!(token.len(), 32);
    assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(row["notification_sent"], false);
    assert_eq!(row["time"], "09:00:00");
}

#[tokio::test]
async fn test_create_appointment_missing_service_issues_no_remote_call() {
    let server = MockServer::start().await;
    let app = test_app(&server.uri());

    let response = app
        .oneshot(json_request(
            "POST",
            "/appointments",
            json!({ "name": "Ana", "date": "2030-01-01", "time": "09:00" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_value(response).await;
    assert!(body["error"].as_str().unwrap().contains("service"));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_appointment_rejects_invalid_time() {
    let server = MockServer::start().await;
    let app = test_app(&server.uri());

    let response = app
        .oneshot(json_request(
            "POST",
            "/appointments",
            json!({ "name": "Ana", "service": "Corte", "date": "2030-01-01", "time": "9am" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_appointments_with_date_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("date", "eq.2030-01-01"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([appointment_row(1, None, "t")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(&server.uri());
    let response = app
        .oneshot(
            Request::get("/appointments?date=2030-01-01")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_value(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_unknown_appointment_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(&server.uri());
    let response = app
        .oneshot(
            Request::delete("/appointments/42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_anonymous_appointment_requires_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([appointment_row(7, None, "abc")])),
        )
        .mount(&server)
        .await;

    let app = test_app(&server.uri());

    // No header at all: unauthorized.
    let response = app
        .clone()
        .oneshot(
            Request::delete("/appointments/7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Wrong token: forbidden.
    let response = app
        .oneshot(
            Request::delete("/appointments/7")
                .header("x-owner-token", "wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Neither request reached the store's delete surface.
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.method.as_str() != "DELETE"));
}

#[tokio::test]
async fn test_delete_with_matching_token_deletes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([appointment_row(7, None, "abc")])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(&server.uri());
    let response = app
        .oneshot(
            Request::delete("/appointments/7")
                .header("x-owner-token", "abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_value(response).await;
    assert_eq!(body["deleted"], true);
}

#[tokio::test]
async fn test_delete_user_owned_appointment_checks_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.9"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([appointment_row(9, Some("u1"), "abc")])),
        )
        .mount(&server)
        .await;

    let app = test_app(&server.uri());
    let response = app
        .oneshot(
            Request::delete("/appointments/9")
                .header("x-user-id", "u2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ============================================================
// Subscriptions
// ============================================================

#[tokio::test]
async fn test_subscribe_persists_canonical_columns() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/push_subscriptions"))
        .and(body_json(json!([{
            "endpoint": "https://push.example/ep",
            "p256dh": "pk",
            "auth": "ak",
            "user_id": "u1"
        }])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": 1,
            "endpoint": "https://push.example/ep",
            "p256dh": "pk",
            "auth": "ak",
            "user_id": "u1"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(&server.uri());
    let response = app
        .oneshot(json_request(
            "POST",
            "/subscribe",
            json!({
                "subscription": {
                    "endpoint": "https://push.example/ep",
                    "keys": { "p256dh": "pk", "auth": "ak" }
                },
                "user_id": "u1"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_value(response).await;
    assert_eq!(body["id"], 1);
}

#[tokio::test]
async fn test_subscribe_without_endpoint_is_rejected() {
    let server = MockServer::start().await;
    let app = test_app(&server.uri());

    let response = app
        .oneshot(json_request(
            "POST",
            "/subscribe",
            json!({ "subscription": { "keys": { "p256dh": "p", "auth": "a" } } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_vapid_public_key_reports_enablement() {
    let server = MockServer::start().await;
    // Public key alone is not enough; delivery needs the private key too.
    let app = test_app(&server.uri());
    let response = app
        .oneshot(Request::get("/vapidPublicKey").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_value(response).await;
    assert_eq!(body["publicKey"], "test-public-key");
    assert_eq!(body["enabled"], false);
}

// ============================================================
// Manual sweep triggers
// ============================================================

#[tokio::test]
async fn test_process_notifications_returns_summary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("notification_sent", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(&server.uri());
    let response = app
        .oneshot(json_request("POST", "/processNotifications", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_value(response).await;
    assert_eq!(body["due"], 0);
    assert_eq!(body["delivered"], 0);
}

#[tokio::test]
async fn test_manual_cleanup_reports_deleted_count() {
    let server = MockServer::start().await;
    // One row far in the past: always stale regardless of the clock.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 3,
            "name": "Old",
            "service": "Corte",
            "date": "2000-01-02",
            "time": "09:00:00"
        }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.3"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(&server.uri());
    let response = app
        .oneshot(json_request("POST", "/cleanup", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_value(response).await;
    assert_eq!(body["deleted"], 1);
}
