use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::claims::Identity;
use crate::config;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::transport::cookie::{clear_refresh_cookie, read_refresh_cookie, set_refresh_cookie};

use super::login::{cookie_attributes, identity_from_profile};

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /auth/refresh - mint a new token pair for a school-scoped login.
///
/// Preferred flow: the HttpOnly cookie carries an opaque session id and the
/// registry is authoritative; a dead reference is a 401 that also clears
/// the cookie. Legacy flows (refresh token in the cookie, or in the body
/// behind `auth.allow_refresh_in_body`) verify the token against the
/// tenant refresh secret and re-check the directory before re-issuing.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Result<Response, ApiError> {
    let cfg = config::config();
    let cookie = read_refresh_cookie(&headers);

    // Session-reference flow
    if state.session_cookie_enabled {
        if let Some(sid) = cookie {
            return refresh_via_session(&state, &headers, &sid, false).await;
        }
    } else if let Some(token) = cookie {
        // Legacy cookie: the value is the refresh token itself
        return refresh_via_token(&state, &headers, &token, false).await;
    }

    // Deprecated body fallback
    if cfg.auth.allow_refresh_in_body {
        if let Some(Json(payload)) = body {
            return refresh_via_token(&state, &headers, &payload.refresh_token, false).await;
        }
    }

    Err(ApiError::unauthorized("Refresh token required"))
}

/// POST /auth/platform/refresh - operator counterpart of `refresh`,
/// bound to the platform refresh secret.
pub async fn platform_refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> Result<Response, ApiError> {
    let cfg = config::config();
    let cookie = read_refresh_cookie(&headers);

    if state.session_cookie_enabled {
        if let Some(sid) = cookie {
            return refresh_via_session(&state, &headers, &sid, true).await;
        }
    } else if let Some(token) = cookie {
        return refresh_via_token(&state, &headers, &token, true).await;
    }

    if cfg.auth.allow_refresh_in_body {
        if let Some(Json(payload)) = body {
            return refresh_via_token(&state, &headers, &payload.refresh_token, true).await;
        }
    }

    Err(ApiError::unauthorized("Refresh token required"))
}

async fn refresh_via_session(
    state: &AppState,
    headers: &HeaderMap,
    session_id: &str,
    platform: bool,
) -> Result<Response, ApiError> {
    let cfg = config::config();

    let Some(record) = state.registry.validate(session_id).await else {
        // Dead reference: deny and stop the client from replaying it.
        let mut response = ApiError::SessionNotFound.into_response();
        clear_refresh_cookie(&mut response, cookie_attributes(headers));
        return Ok(response);
    };

    let identity = record.identity(state.registry.ttl_secs());
    if identity.is_platform_operator() != platform {
        return Err(ApiError::InvalidToken);
    }

    // The session proves the login, not the subject's standing; re-check
    // the directory (or the operator provisioning) before re-issuing.
    let identity = revalidate_subject(state, identity).await?;

    let pair = state.tokens.issue(&identity)?;
    state
        .registry
        .rotate_refresh(session_id, &pair.refresh_token)
        .await;

    let mut data = json!({
        "access_token": pair.access_token,
        "token_type": "Bearer",
        "expires_in": pair.expires_in,
        "session_id": session_id,
    });
    if cfg.auth.allow_refresh_in_body {
        data["refresh_token"] = json!(pair.refresh_token);
    }

    let mut response = ApiResponse::success(data).into_response();
    // Re-arm the cookie's Max-Age alongside the session TTL window
    set_refresh_cookie(
        &mut response,
        session_id,
        cfg.session.ttl_secs,
        cookie_attributes(headers),
    );
    Ok(response)
}

async fn refresh_via_token(
    state: &AppState,
    headers: &HeaderMap,
    refresh_token: &str,
    platform: bool,
) -> Result<Response, ApiError> {
    let cfg = config::config();

    let identity = if platform {
        Identity::Platform(state.tokens.verify_platform_refresh(refresh_token)?)
    } else {
        Identity::Tenant(state.tokens.verify_tenant_refresh(refresh_token)?)
    };
    let identity = revalidate_subject(state, identity).await?;

    let pair = state.tokens.issue(&identity)?;

    // Keep the login's session record live across legacy rotations: the
    // stored fingerprint identifies which session this token belongs to.
    for record in state.registry.list(identity.subject_id()).await {
        if record.matches_refresh_token(refresh_token) {
            state
                .registry
                .rotate_refresh(&record.session_id, &pair.refresh_token)
                .await;
            break;
        }
    }

    let mut data = json!({
        "access_token": pair.access_token,
        "token_type": "Bearer",
        "expires_in": pair.expires_in,
    });
    if cfg.auth.allow_refresh_in_body {
        data["refresh_token"] = json!(pair.refresh_token);
    }

    let mut response = ApiResponse::success(data).into_response();
    if cfg.auth.cookie_carries_refresh {
        let max_age = (cfg.auth.refresh_token_ttl_days as u64) * 24 * 60 * 60;
        set_refresh_cookie(
            &mut response,
            &pair.refresh_token,
            max_age,
            cookie_attributes(headers),
        );
    }
    Ok(response)
}

/// A refresh re-issues credentials, so the subject must still be in good
/// standing: active subject of an active school, or a still-provisioned
/// operator. Directory data wins over the stale claims.
async fn revalidate_subject(state: &AppState, identity: Identity) -> Result<Identity, ApiError> {
    match &identity {
        Identity::Tenant(claims) => {
            if !state.directory.school_active(&claims.school_id).await? {
                return Err(ApiError::unauthorized("Invalid credentials"));
            }
            let profile = state
                .directory
                .find_subject(claims.sub)
                .await?
                .filter(|p| p.active && p.school_id == claims.school_id)
                .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;
            Ok(identity_from_profile(&profile))
        }
        Identity::Platform(_) => {
            if !state.credentials.operator_configured() {
                return Err(ApiError::unauthorized("Invalid credentials"));
            }
            Ok(identity)
        }
    }
}
