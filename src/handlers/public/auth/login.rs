use axum::{
    extract::State,
    http::header::{ORIGIN, USER_AGENT},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::claims::{Identity, TenantClaims};
use crate::auth::credentials::CredentialError;
use crate::config;
use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::session::record::LoginContext;
use crate::state::AppState;
use crate::transport::cookie::{set_refresh_cookie, CookieAttributes};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub school_id: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PlatformLoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/login - authenticate a school-scoped user.
///
/// Issues a token pair, records the login in the session registry and
/// binds the session reference (or, in legacy deployments, the refresh
/// token) to the HttpOnly cookie. A down session store degrades to
/// token-only operation rather than failing the login.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let profile = state
        .credentials
        .verify_tenant(&payload.school_id, &payload.email, &payload.password)
        .await
        .map_err(map_credential_error)?;

    complete_login(&state, &headers, identity_from_profile(&profile)).await
}

/// POST /auth/platform/login - authenticate the platform operator.
///
/// The operator is provisioned through configuration; when none is
/// configured this endpoint denies everything.
pub async fn platform_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<PlatformLoginRequest>,
) -> Result<Response, ApiError> {
    let claims = state
        .credentials
        .verify_operator(&payload.email, &payload.password)
        .map_err(map_credential_error)?;

    complete_login(&state, &headers, Identity::Platform(claims)).await
}

pub(super) fn identity_from_profile(profile: &crate::directory::SubjectProfile) -> Identity {
    Identity::Tenant(TenantClaims {
        sub: profile.id,
        role: profile.role,
        school_id: profile.school_id.clone(),
        email: profile.email.clone(),
        name: profile.name.clone(),
        iat: 0,
        exp: 0,
    })
}

fn map_credential_error(err: CredentialError) -> ApiError {
    match err {
        CredentialError::InvalidCredentials => ApiError::unauthorized("Invalid credentials"),
        CredentialError::Directory(e) => e.into(),
    }
}

pub(super) fn client_meta(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    (ip, user_agent)
}

pub(super) fn cookie_attributes(headers: &HeaderMap) -> CookieAttributes {
    let cfg = config::config();
    let origin = headers.get(ORIGIN).and_then(|v| v.to_str().ok());
    CookieAttributes::derive(cfg.environment, origin, &cfg.api.cors_origins)
}

async fn complete_login(
    state: &AppState,
    headers: &HeaderMap,
    identity: Identity,
) -> Result<Response, ApiError> {
    let cfg = config::config();
    let pair = state.tokens.issue(&identity)?;

    let (client_ip, user_agent) = client_meta(headers);
    let login_ctx = LoginContext::from_identity(&identity)
        .with_client(client_ip, user_agent)
        .with_refresh_token(&pair.refresh_token);
    let session_id = state.registry.create(&login_ctx).await;

    let mut data = json!({
        "access_token": pair.access_token,
        "token_type": "Bearer",
        "expires_in": pair.expires_in,
        "user": {
            "id": identity.subject_id(),
            "email": identity.email(),
            "role": identity.role().as_str(),
            "school_id": identity.school_id(),
        },
    });
    if let Some(sid) = &session_id {
        data["session_id"] = json!(sid);
    }
    if cfg.auth.allow_refresh_in_body {
        // Deprecated transport; kept for older clients behind a flag.
        data["refresh_token"] = json!(pair.refresh_token);
    }

    let mut response = ApiResponse::success(data).into_response();
    let attrs = cookie_attributes(headers);

    if cfg.auth.cookie_carries_refresh {
        let max_age = (cfg.auth.refresh_token_ttl_days as u64) * 24 * 60 * 60;
        set_refresh_cookie(&mut response, &pair.refresh_token, max_age, attrs);
    } else if let Some(sid) = &session_id {
        set_refresh_cookie(&mut response, sid, cfg.session.ttl_secs, attrs);
    }

    Ok(response)
}
