//! Router-level tests: authentication, role checks and response layers.
//!
//! Every request here is rejected or answered before a query runs, so the
//! lazy pool never connects.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use serde_json::{Value, json};
use tower::ServiceExt;

use estate_desk_api::build_router;
use estate_desk_api::config::JwtConfig;
use estate_desk_api::services::TokenService;
use estate_desk_core::Role;
use estate_desk_integration_tests::{account, bearer, test_router, test_state};

async fn send(request: Request<Body>) -> Response {
    test_router().oneshot(request).await.unwrap()
}

async fn send_as(role: Role, method: Method, uri: &str, body: Option<Value>) -> Response {
    let state = test_state();
    let token = bearer(&state, role);

    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, token);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    build_router(state)
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let response = send(get("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let response = send(get("/health/ready")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = send(get("/api/v1/nope")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_missing_token_is_unauthenticated() {
    let response = send(get("/api/v1/properties")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    let body = json_body(response).await;
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn test_garbage_token_is_unauthenticated() {
    let request = Request::builder()
        .uri("/api/v1/auth/me")
        .header(header::AUTHORIZATION, "Bearer not.a.token")
        .body(Body::empty())
        .unwrap();

    let response = send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_bearer_scheme_is_unauthenticated() {
    let request = Request::builder()
        .uri("/api/v1/auth/me")
        .header(header::AUTHORIZATION, "Basic YnJva2VyOnB3")
        .body(Body::empty())
        .unwrap();

    let response = send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_from_another_secret_is_rejected() {
    let foreign = TokenService::new(&JwtConfig {
        secret: "some-other-deployment-secret-0123456789-xyz".to_owned().into(),
        access_ttl_minutes: 30,
        refresh_ttl_days: 7,
    });
    let pair = foreign.issue(&account(Role::Broker)).unwrap();

    let request = Request::builder()
        .uri("/api/v1/users")
        .header(header::AUTHORIZATION, format!("Bearer {}", pair.access_token))
        .body(Body::empty())
        .unwrap();

    let response = send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let state = test_state();
    let pair = state.tokens().issue(&account(Role::Broker)).unwrap();

    let request = Request::builder()
        .uri("/api/v1/employees")
        .header(header::AUTHORIZATION, format!("Bearer {}", pair.refresh_token))
        .body(Body::empty())
        .unwrap();

    let response = build_router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_login_body_is_rejected() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\":"))
        .unwrap();

    let response = send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "validation");
}

// ============================================================================
// Role checks
// ============================================================================

#[tokio::test]
async fn test_advisor_cannot_delete_property() {
    let response = send_as(Role::Advisor, Method::DELETE, "/api/v1/properties/1", None).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn test_secretary_cannot_manage_users() {
    let response = send_as(Role::Secretary, Method::GET, "/api/v1/users", None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send_as(
        Role::Secretary,
        Method::PATCH,
        "/api/v1/users/3/role",
        Some(json!({ "role": "broker" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_advisor_cannot_schedule_visits() {
    let response = send_as(
        Role::Advisor,
        Method::POST,
        "/api/v1/visits",
        Some(json!({
            "property_id": 1,
            "client_id": 1,
            "scheduled_at": "2030-01-15T15:00:00Z",
        })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_advisor_cannot_read_operations_or_clients() {
    let response = send_as(Role::Advisor, Method::GET, "/api/v1/operations", None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send_as(Role::Advisor, Method::GET, "/api/v1/clients", None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_advisor_report_limited_to_self() {
    let response = send_as(Role::Advisor, Method::GET, "/api/v1/reports/advisors/8", None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_inverted_report_range_is_rejected() {
    let response = send_as(
        Role::Broker,
        Method::GET,
        "/api/v1/reports/operations?from=2026-05-01&to=2026-04-01",
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Layers
// ============================================================================

#[tokio::test]
async fn test_request_id_generated_and_echoed() {
    let response = send(get("/health")).await;
    let generated = response.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(generated.len(), 36);

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "lb-7f3a")
        .body(Body::empty())
        .unwrap();
    let response = send(request).await;
    assert_eq!(response.headers()["x-request-id"], "lb-7f3a");
}

#[tokio::test]
async fn test_security_headers_present() {
    let response = send(get("/api/v1/auth/me")).await;
    let headers = response.headers();

    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
    assert_eq!(headers[header::CACHE_CONTROL], "no-store, max-age=0");
}

#[tokio::test]
async fn test_health_is_not_marked_no_store() {
    let response = send(get("/health")).await;
    assert!(!response.headers().contains_key(header::CACHE_CONTROL));
}

#[tokio::test]
async fn test_cors_preflight_for_configured_origin() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/visits")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,content-type")
        .body(Body::empty())
        .unwrap();

    let response = send(request).await;
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:5173"
    );
}

#[tokio::test]
async fn test_cors_ignores_unknown_origin() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/visits")
        .header(header::ORIGIN, "https://evil.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = send(request).await;
    assert!(
        !response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
    );
}
