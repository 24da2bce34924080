use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Extension,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::claims::Identity;
use crate::auth::role::Role;
use crate::config;
use crate::error::ApiError;
use crate::response::{ApiResponse, ApiResult};
use crate::session::record::SessionRecord;
use crate::state::AppState;
use crate::transport::cookie::{clear_refresh_cookie, CookieAttributes};

fn clear_attrs(headers: &HeaderMap) -> CookieAttributes {
    let cfg = config::config();
    let origin = headers
        .get(axum::http::header::ORIGIN)
        .and_then(|v| v.to_str().ok());
    CookieAttributes::derive(cfg.environment, origin, &cfg.api.cors_origins)
}

/// DELETE /api/auth/session - log out the current login.
///
/// Revokes the session record when the request arrived session-bound and
/// clears the cookie either way; logout of an already-dead session is a
/// success, not an error.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    session: Option<Extension<SessionRecord>>,
) -> Result<Response, ApiError> {
    if let Some(Extension(record)) = session {
        state
            .registry
            .revoke(&record.session_id, record.subject_id)
            .await;
    }

    let mut response = ApiResponse::success(json!({ "logged_out": true })).into_response();
    clear_refresh_cookie(&mut response, clear_attrs(&headers));
    Ok(response)
}

/// GET /api/auth/sessions - list the caller's live sessions across
/// devices. Listing heals stale index entries as a side effect.
pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    current: Option<Extension<SessionRecord>>,
) -> ApiResult<Value> {
    let current_id = current.map(|Extension(record)| record.session_id);
    let sessions: Vec<Value> = state
        .registry
        .list(identity.subject_id())
        .await
        .into_iter()
        .map(|record| {
            json!({
                "session_id": record.session_id,
                "created_at": record.created_at,
                "last_activity": record.last_activity,
                "client_ip": record.client_ip,
                "user_agent": record.user_agent,
                "is_current": Some(&record.session_id) == current_id.as_ref(),
            })
        })
        .collect();

    Ok(ApiResponse::success(json!({ "sessions": sessions })))
}

/// DELETE /api/auth/sessions/:id - revoke one of the caller's own
/// sessions (log out a single device).
pub async fn revoke_session(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    // Ownership check first: someone else's session id reads as absent.
    let record = state
        .registry
        .validate(&session_id)
        .await
        .filter(|r| r.subject_id == identity.subject_id())
        .ok_or_else(|| ApiError::not_found("Session not found"))?;

    state
        .registry
        .revoke(&record.session_id, record.subject_id)
        .await;
    Ok(ApiResponse::success(json!({ "revoked": true })))
}

/// DELETE /api/auth/sessions - log out everywhere. Returns how many
/// sessions were removed and clears the caller's cookie.
pub async fn revoke_all_sessions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Extension(identity): Extension<Identity>,
) -> Result<Response, ApiError> {
    let revoked = state.registry.revoke_all(identity.subject_id()).await;

    let mut response = ApiResponse::success(json!({ "revoked": revoked })).into_response();
    clear_refresh_cookie(&mut response, clear_attrs(&headers));
    Ok(response)
}

/// DELETE /api/auth/subjects/:id/sessions - forced deactivation: an
/// administrator logs another subject out everywhere. School admins may
/// only target subjects of their own school; the platform operator may
/// target anyone.
pub async fn revoke_subject_sessions(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(subject_id): Path<Uuid>,
) -> ApiResult<Value> {
    if identity.role() == Role::SchoolAdmin {
        let caller_school = identity
            .school_id()
            .ok_or_else(|| {
                ApiError::internal_server_error("An error occurred while processing your request")
            })?
            .to_string();

        let target = state
            .directory
            .find_subject(subject_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Subject not found"))?;

        if target.school_id != caller_school {
            return Err(ApiError::CrossTenantDenied {
                caller_school,
                requested_schools: vec![target.school_id],
            });
        }
    }

    let revoked = state.registry.revoke_all(subject_id).await;
    Ok(ApiResponse::success(json!({ "revoked": revoked })))
}
