use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::Router;
use serde_json::{json, Value};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::role::Role;
use crate::authz::{
    AuditContextGuard, AuthMode, AuthenticateGuard, Guard, Pipeline, ResourceKind,
    ResourceOwnershipGuard, RoleHierarchyGuard, TenantIsolationGuard,
};
use crate::handlers::{protected, public};
use crate::state::AppState;

/// Build the full router. Route groups bind their token class (and role
/// requirements) at registration time; only `/api/auth/whoami` uses the
/// dual-mode resolver.
pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Public auth routes (token acquisition)
        .merge(public_auth_routes(state.clone()))
        // Protected session management
        .merge(whoami_routes(state.clone()))
        .merge(tenant_session_routes(state.clone()))
        .merge(tenant_admin_routes(state.clone()))
        .merge(platform_session_routes(state))
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
}

/// Boundary for anything unexpected inside a guard or handler: a generic
/// 500 with the stable envelope, internals never leaked.
fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> axum::response::Response {
    let detail = err
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| err.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!("request handler panicked: {}", detail);

    crate::error::ApiError::internal_server_error(
        "An error occurred while processing your request",
    )
    .into_response()
}

/// Assemble a guard pipeline in the required order: authentication, role
/// hierarchy, tenant isolation, resource ownership, audit annotation.
///
/// The CRUD layer mounts its own routers behind pipelines built here, so
/// this constructor is the only place guard ordering is spelled out.
pub fn guard_pipeline(
    state: &AppState,
    mode: AuthMode,
    allowed_roles: Option<Vec<Role>>,
    resource: Option<ResourceKind>,
) -> Arc<Pipeline> {
    let mut guards: Vec<Box<dyn Guard>> = vec![Box::new(AuthenticateGuard::new(
        mode,
        state.tokens.clone(),
        state.registry.clone(),
        state.session_cookie_enabled,
    ))];
    if let Some(allowed) = allowed_roles {
        guards.push(Box::new(RoleHierarchyGuard::new(allowed)));
    }
    guards.push(Box::new(TenantIsolationGuard));
    if let Some(kind) = resource {
        guards.push(Box::new(ResourceOwnershipGuard::new(kind)));
    }
    guards.push(Box::new(AuditContextGuard));
    Pipeline::new(guards)
}

/// Attach a pipeline to a route group.
pub fn guarded(router: Router<AppState>, pipeline: Arc<Pipeline>) -> Router<AppState> {
    router.route_layer(middleware::from_fn(move |req: Request, next: Next| {
        let pipeline = pipeline.clone();
        async move { pipeline.handle(req, next).await }
    }))
}

fn public_auth_routes(state: AppState) -> Router {
    use public::auth;

    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/platform/login", post(auth::platform_login))
        .route("/auth/platform/refresh", post(auth::platform_refresh))
        .with_state(state)
}

fn whoami_routes(state: AppState) -> Router {
    use protected::auth;

    let pipeline = guard_pipeline(&state, AuthMode::Dual, None, None);
    guarded(
        Router::new().route("/api/auth/whoami", get(auth::whoami)),
        pipeline,
    )
    .with_state(state)
}

fn tenant_session_routes(state: AppState) -> Router {
    use protected::auth;

    let pipeline = guard_pipeline(&state, AuthMode::Tenant, None, None);
    guarded(
        Router::new()
            .route("/api/auth/session", delete(auth::logout))
            .route(
                "/api/auth/sessions",
                get(auth::list_sessions).delete(auth::revoke_all_sessions),
            )
            .route("/api/auth/sessions/:id", delete(auth::revoke_session)),
        pipeline,
    )
    .with_state(state)
}

fn tenant_admin_routes(state: AppState) -> Router {
    use protected::auth;

    let pipeline = guard_pipeline(&state, AuthMode::Tenant, Some(vec![Role::SchoolAdmin]), None);
    guarded(
        Router::new().route(
            "/api/auth/subjects/:id/sessions",
            delete(auth::revoke_subject_sessions),
        ),
        pipeline,
    )
    .with_state(state)
}

fn platform_session_routes(state: AppState) -> Router {
    use protected::auth;

    let pipeline = guard_pipeline(&state, AuthMode::Platform, None, None);
    guarded(
        Router::new()
            .route("/platform/auth/session", delete(auth::logout))
            .route(
                "/platform/auth/sessions",
                get(auth::list_sessions).delete(auth::revoke_all_sessions),
            )
            .route(
                "/platform/subjects/:id/sessions",
                delete(auth::revoke_subject_sessions),
            ),
        pipeline,
    )
    .with_state(state)
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Campus API (Rust)",
            "version": version,
            "description": "Multi-tenant school management API",
            "endpoints": {
                "home": "/ (public)",
                "public_auth": "/auth/login, /auth/refresh, /auth/platform/* (public - token acquisition)",
                "whoami": "/api/auth/whoami (protected - tenant or platform)",
                "sessions": "/api/auth/session[s] (protected - session management)",
                "admin": "/api/auth/subjects/:id/sessions (protected - school admin)",
                "platform": "/platform/auth/*, /platform/subjects/:id/sessions (protected - operator)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    axum::response::Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "timestamp": now,
        }
    }))
}
