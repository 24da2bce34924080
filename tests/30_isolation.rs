mod common;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::{json, Value};

use campus_api_rust::app::{guard_pipeline, guarded};
use campus_api_rust::auth::claims::Identity;
use campus_api_rust::auth::role::Role;
use campus_api_rust::authz::{AuditContext, AuthMode, OwnershipDecision, ResourceKind};
use campus_api_rust::state::AppState;

use common::*;

/// Stand-in for a CRUD handler: reports what the pipeline decided.
async fn probe(
    Extension(identity): Extension<Identity>,
    ownership: Option<Extension<OwnershipDecision>>,
    audit: Option<Extension<AuditContext>>,
) -> Json<Value> {
    Json(json!({
        "subject": identity.subject_id(),
        "role": identity.role().as_str(),
        "ownership": ownership.map(|Extension(d)| format!("{:?}", d)),
        "cross_tenant": audit.map(|Extension(a)| a.cross_tenant),
    }))
}

/// Resource routes mounted the way the CRUD layer mounts them: behind
/// pipelines built by `guard_pipeline`.
fn resource_app(state: &AppState) -> Router {
    let students = guarded(
        Router::new()
            .route("/api/schools/:school_id/students", get(probe).post(probe))
            .route("/api/students/:id", get(probe)),
        guard_pipeline(state, AuthMode::Tenant, None, Some(ResourceKind::Student)),
    )
    .with_state(state.clone());

    let platform_students = guarded(
        Router::new().route("/platform/schools/:school_id/students", get(probe)),
        guard_pipeline(state, AuthMode::Platform, None, Some(ResourceKind::Student)),
    )
    .with_state(state.clone());

    let admin_reports = guarded(
        Router::new().route("/api/admin/reports", get(probe)),
        guard_pipeline(
            state,
            AuthMode::Tenant,
            Some(vec![Role::SchoolAdmin]),
            None,
        ),
    )
    .with_state(state.clone());

    Router::new()
        .merge(students)
        .merge(platform_students)
        .merge(admin_reports)
}

#[tokio::test]
async fn cross_tenant_path_is_denied_with_echoed_schools() {
    let harness = test_app().await;
    let resources = resource_app(&harness.state);

    let (data, _) = login(&harness.app, SCHOOL_ONE, ADMIN_ONE, PASSWORD).await;
    let token = bearer(data["access_token"].as_str().unwrap());

    // Own school admits
    let (status, _, _) = send(
        &resources,
        "GET",
        &format!("/api/schools/{}/students", SCHOOL_ONE),
        &[("authorization", &token)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Foreign school denies with both sides echoed
    let (status, body, _) = send(
        &resources,
        "GET",
        &format!("/api/schools/{}/students", SCHOOL_TWO),
        &[("authorization", &token)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "CROSS_TENANT_DENIED");
    assert_eq!(body["caller_school"], SCHOOL_ONE);
    assert_eq!(body["requested_schools"][0], SCHOOL_TWO);
}

#[tokio::test]
async fn every_carrier_is_checked() {
    let harness = test_app().await;
    let resources = resource_app(&harness.state);

    let (data, _) = login(&harness.app, SCHOOL_ONE, TEACHER_ONE, PASSWORD).await;
    let token = bearer(data["access_token"].as_str().unwrap());
    let own_id = data["user"]["id"].as_str().unwrap().to_string();

    // Body: path says own school, body smuggles a foreign one
    let (status, body, _) = send(
        &resources,
        "POST",
        &format!("/api/schools/{}/students", SCHOOL_ONE),
        &[("authorization", &token)],
        Some(json!({ "name": "New Student", "school_id": SCHOOL_TWO })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{}", body);
    assert_eq!(body["code"], "CROSS_TENANT_DENIED");

    // Query
    let (status, body, _) = send(
        &resources,
        "GET",
        &format!("/api/students/{}?school_id={}", own_id, SCHOOL_TWO),
        &[("authorization", &token)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{}", body);
    assert_eq!(body["code"], "CROSS_TENANT_DENIED");

    // Header
    let (status, body, _) = send(
        &resources,
        "GET",
        &format!("/api/students/{}", own_id),
        &[("authorization", &token), ("x-school-id", SCHOOL_TWO)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{}", body);
    assert_eq!(body["code"], "CROSS_TENANT_DENIED");

    // Matching carriers all admit
    let (status, _, _) = send(
        &resources,
        "GET",
        &format!("/api/students/{}?school_id={}", own_id, SCHOOL_ONE),
        &[("authorization", &token), ("x-school-id", SCHOOL_ONE)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn isolation_also_covers_the_session_routes() {
    let harness = test_app().await;
    let (data, _) = login(&harness.app, SCHOOL_ONE, TEACHER_ONE, PASSWORD).await;
    let token = bearer(data["access_token"].as_str().unwrap());

    let (status, body, _) = send(
        &harness.app,
        "GET",
        "/api/auth/sessions",
        &[("authorization", &token), ("x-school-id", SCHOOL_TWO)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "CROSS_TENANT_DENIED");
}

#[tokio::test]
async fn operator_crosses_tenants_and_is_audited() {
    let harness = test_app().await;
    let resources = resource_app(&harness.state);

    let (data, _) = platform_login(&harness.app).await;
    let token = bearer(data["access_token"].as_str().unwrap());

    let (status, body, _) = send(
        &resources,
        "GET",
        &format!("/platform/schools/{}/students", SCHOOL_TWO),
        &[("authorization", &token)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["cross_tenant"], true);
    assert_eq!(body["role"], "platform-operator");
}

#[tokio::test]
async fn role_guard_names_caller_and_requirement() {
    let harness = test_app().await;
    let resources = resource_app(&harness.state);

    let (teacher, _) = login(&harness.app, SCHOOL_ONE, TEACHER_ONE, PASSWORD).await;
    let (status, body, _) = send(
        &resources,
        "GET",
        "/api/admin/reports",
        &[(
            "authorization",
            &bearer(teacher["access_token"].as_str().unwrap()),
        )],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "INSUFFICIENT_ROLE");
    assert_eq!(body["caller_role"], "teacher");
    assert_eq!(body["required_roles"][0], "school-admin");

    let (admin, _) = login(&harness.app, SCHOOL_ONE, ADMIN_ONE, PASSWORD).await;
    let (status, _, _) = send(
        &resources,
        "GET",
        "/api/admin/reports",
        &[(
            "authorization",
            &bearer(admin["access_token"].as_str().unwrap()),
        )],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn ownership_decisions_follow_role_capabilities() {
    let harness = test_app().await;
    let resources = resource_app(&harness.state);

    let (teacher, _) = login(&harness.app, SCHOOL_ONE, TEACHER_ONE, PASSWORD).await;
    let teacher_token = bearer(teacher["access_token"].as_str().unwrap());
    let teacher_id = teacher["user"]["id"].as_str().unwrap().to_string();

    // Own record: self-accessible
    let (_, body, _) = send(
        &resources,
        "GET",
        &format!("/api/students/{}", teacher_id),
        &[("authorization", &teacher_token)],
        None,
    )
    .await;
    assert_eq!(body["ownership"], "SelfRecord");

    // Someone else's record: delegated to the CRUD layer
    let (_, body, _) = send(
        &resources,
        "GET",
        &format!("/api/students/{}", uuid::Uuid::new_v4()),
        &[("authorization", &teacher_token)],
        None,
    )
    .await;
    assert_eq!(body["ownership"], "Delegated(Student)");

    // Admin gets tenant scope
    let (admin, _) = login(&harness.app, SCHOOL_ONE, ADMIN_ONE, PASSWORD).await;
    let (_, body, _) = send(
        &resources,
        "GET",
        &format!("/api/students/{}", uuid::Uuid::new_v4()),
        &[(
            "authorization",
            &bearer(admin["access_token"].as_str().unwrap()),
        )],
        None,
    )
    .await;
    assert_eq!(body["ownership"], "AdminScope");
}

#[tokio::test]
async fn admin_force_logout_is_tenant_bound() {
    let harness = test_app().await;

    let (teacher, teacher_cookie) = login(&harness.app, SCHOOL_ONE, TEACHER_ONE, PASSWORD).await;
    let teacher_id = teacher["user"]["id"].as_str().unwrap().to_string();
    let (admin, _) = login(&harness.app, SCHOOL_ONE, ADMIN_ONE, PASSWORD).await;
    let admin_token = bearer(admin["access_token"].as_str().unwrap());

    // Parent lacks the role
    let (parent, _) = login(&harness.app, SCHOOL_ONE, PARENT_ONE, PASSWORD).await;
    let (status, body, _) = send(
        &harness.app,
        "DELETE",
        &format!("/api/auth/subjects/{}/sessions", teacher_id),
        &[(
            "authorization",
            &bearer(parent["access_token"].as_str().unwrap()),
        )],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "INSUFFICIENT_ROLE");

    // Admin of the other school is isolated
    let (admin_two, _) = login(&harness.app, SCHOOL_TWO, ADMIN_TWO, PASSWORD).await;
    let (status, body, _) = send(
        &harness.app,
        "DELETE",
        &format!("/api/auth/subjects/{}/sessions", teacher_id),
        &[(
            "authorization",
            &bearer(admin_two["access_token"].as_str().unwrap()),
        )],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "CROSS_TENANT_DENIED");

    // Same-school admin succeeds; the teacher's session dies
    let (status, body, _) = send(
        &harness.app,
        "DELETE",
        &format!("/api/auth/subjects/{}/sessions", teacher_id),
        &[("authorization", &admin_token)],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["revoked"], 1);

    let (status, body, _) = send(
        &harness.app,
        "GET",
        "/api/auth/whoami",
        &[("cookie", &teacher_cookie.unwrap())],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn operator_force_logout_reaches_any_tenant() {
    let harness = test_app().await;

    let (teacher, teacher_cookie) = login(&harness.app, SCHOOL_ONE, TEACHER_ONE, PASSWORD).await;
    let teacher_id = teacher["user"]["id"].as_str().unwrap().to_string();

    let (operator, _) = platform_login(&harness.app).await;
    let (status, body, _) = send(
        &harness.app,
        "DELETE",
        &format!("/platform/subjects/{}/sessions", teacher_id),
        &[(
            "authorization",
            &bearer(operator["access_token"].as_str().unwrap()),
        )],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["revoked"], 1);

    let (status, _, _) = send(
        &harness.app,
        "GET",
        "/api/auth/whoami",
        &[("cookie", &teacher_cookie.unwrap())],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
