//! Legacy transport modes: refresh token carried in the cookie itself and
//! the deprecated request-body fallback, both behind config flags.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use std::sync::Once;

use common::*;

static LEGACY_ENV: Once = Once::new();

/// Flip the legacy flags before the config singleton is built. This test
/// binary runs in its own process, so the flags apply to every test here
/// and nowhere else.
fn legacy_env() {
    LEGACY_ENV.call_once(|| {
        std::env::set_var("AUTH_ALLOW_REFRESH_IN_BODY", "true");
        std::env::set_var("AUTH_COOKIE_CARRIES_REFRESH", "true");
    });
}

async fn legacy_app() -> TestApp {
    legacy_env();
    test_app().await
}

#[tokio::test]
async fn login_exposes_refresh_token_in_legacy_mode() {
    let harness = legacy_app().await;

    let (data, cookie) = login(&harness.app, SCHOOL_ONE, TEACHER_ONE, PASSWORD).await;
    let refresh = data["refresh_token"].as_str().expect("refresh token");
    // The cookie carries the refresh token directly, not a session id
    assert_eq!(
        cookie.as_deref(),
        Some(format!("campus_session={}", refresh).as_str())
    );
}

#[tokio::test]
async fn cookie_is_not_a_session_reference_in_legacy_mode() {
    let harness = legacy_app().await;
    let (_, cookie) = login(&harness.app, SCHOOL_ONE, TEACHER_ONE, PASSWORD).await;

    // Session indirection is off: a cookie-only request is unauthenticated
    let (status, body, _) = send(
        &harness.app,
        "GET",
        "/api/auth/whoami",
        &[("cookie", &cookie.unwrap())],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Access token required");
}

#[tokio::test]
async fn refresh_accepts_the_legacy_cookie() {
    let harness = legacy_app().await;
    let (_, cookie) = login(&harness.app, SCHOOL_ONE, PARENT_ONE, PASSWORD).await;

    let (status, body, headers) = send(
        &harness.app,
        "POST",
        "/auth/refresh",
        &[("cookie", &cookie.unwrap())],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["data"]["access_token"].is_string());
    assert!(body["data"]["refresh_token"].is_string());
    // Rotation: the cookie is re-set with the new refresh token
    let new_cookie = cookie_pair(&headers).expect("rotated cookie");
    assert_eq!(
        new_cookie,
        format!(
            "campus_session={}",
            body["data"]["refresh_token"].as_str().unwrap()
        )
    );
}

#[tokio::test]
async fn refresh_accepts_the_deprecated_body_fallback() {
    let harness = legacy_app().await;
    let (data, _) = login(&harness.app, SCHOOL_ONE, TEACHER_ONE, PASSWORD).await;
    let refresh = data["refresh_token"].as_str().unwrap();

    let (status, body, _) = send(
        &harness.app,
        "POST",
        "/auth/refresh",
        &[],
        Some(json!({ "refresh_token": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let token = body["data"]["access_token"].as_str().unwrap();
    let (status, _, _) = send(
        &harness.app,
        "GET",
        "/api/auth/whoami",
        &[("authorization", &bearer(token))],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn tenant_refresh_token_never_passes_the_platform_endpoint() {
    let harness = legacy_app().await;
    let (data, _) = login(&harness.app, SCHOOL_ONE, TEACHER_ONE, PASSWORD).await;
    let refresh = data["refresh_token"].as_str().unwrap();

    let (status, body, _) = send(
        &harness.app,
        "POST",
        "/auth/platform/refresh",
        &[],
        Some(json!({ "refresh_token": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn garbage_refresh_token_is_rejected() {
    let harness = legacy_app().await;

    let (status, body, _) = send(
        &harness.app,
        "POST",
        "/auth/refresh",
        &[],
        Some(json!({ "refresh_token": "nonsense" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "INVALID_TOKEN");
}
