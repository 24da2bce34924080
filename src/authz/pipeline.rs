use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{FromRequestParts, MatchedPath, RawPathParams, Request};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, ORIGIN, USER_AGENT};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::config;
use crate::error::ApiError;
use crate::transport::cookie::{clear_refresh_cookie, read_refresh_cookie, CookieAttributes};

use super::context::GuardContext;

/// Buffered-body ceiling for tenant-candidate extraction.
const BODY_LIMIT: usize = 1024 * 1024;

/// One stage of the authorization pipeline. Guards either return `Ok` and
/// record their decision on the context, or short-circuit with a
/// structured denial.
#[async_trait]
pub trait Guard: Send + Sync {
    fn name(&self) -> &'static str;
    async fn check(&self, ctx: &mut GuardContext) -> Result<(), ApiError>;
}

/// Ordered guard chain, composed by a single fold. Order is part of the
/// contract: authentication first, audit annotation last.
pub struct Pipeline {
    guards: Vec<Box<dyn Guard>>,
}

impl Pipeline {
    pub fn new(guards: Vec<Box<dyn Guard>>) -> Arc<Self> {
        Arc::new(Self { guards })
    }

    /// Run every guard in order against an already-built context. The
    /// first denial terminates the request; there is no retry.
    pub async fn run(&self, ctx: &mut GuardContext) -> Result<(), ApiError> {
        for guard in &self.guards {
            if let Err(denial) = guard.check(ctx).await {
                tracing::debug!(
                    guard = guard.name(),
                    operation = %ctx.operation,
                    code = denial.error_code(),
                    "request denied"
                );
                return Err(denial);
            }
        }
        Ok(())
    }

    /// Axum adapter: extract the request inputs once, run the fold, then
    /// either hand the request on with the decisions attached or convert
    /// the denial. A dead session reference additionally clears the
    /// client's cookie so it stops retrying.
    pub async fn handle(self: Arc<Self>, request: Request, next: Next) -> Response {
        let (mut parts, body) = request.into_parts();

        let mut path_school = None;
        let mut resource_id = None;
        if let Ok(params) = RawPathParams::from_request_parts(&mut parts, &()).await {
            for (key, value) in params.iter() {
                match key {
                    "school_id" => path_school = Some(value.to_string()),
                    "id" => resource_id = Some(value.to_string()),
                    _ => {}
                }
            }
        }

        let operation = match parts.extensions.get::<MatchedPath>() {
            Some(matched) => format!("{} {}", parts.method, matched.as_str()),
            None => format!("{} {}", parts.method, parts.uri.path()),
        };

        let header_str = |name: axum::http::HeaderName| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };

        let mut ctx = GuardContext {
            operation,
            method: parts.method.clone(),
            authorization: header_str(AUTHORIZATION),
            cookie_value: read_refresh_cookie(&parts.headers),
            origin: header_str(ORIGIN),
            client_ip: parts
                .headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(|v| v.trim().to_string()),
            user_agent: header_str(USER_AGENT),
            path_school,
            query_school: parts.uri.query().and_then(query_school_id),
            header_school: parts
                .headers
                .get("x-school-id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            resource_id,
            ..Default::default()
        };

        // Buffer JSON bodies so the isolation guard can see body-carried
        // school ids; the request is rebuilt from the same bytes.
        let is_json = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/json"))
            .unwrap_or(false);

        let request = if is_json {
            let bytes = match axum::body::to_bytes(body, BODY_LIMIT).await {
                Ok(bytes) => bytes,
                Err(_) => {
                    return ApiError::bad_request("Unable to read request body").into_response()
                }
            };
            ctx.body_schools = body_school_ids(&bytes);
            Request::from_parts(parts, Body::from(bytes))
        } else {
            Request::from_parts(parts, body)
        };

        match self.run(&mut ctx).await {
            Ok(()) => {
                let mut request = request;
                if let Some(identity) = ctx.identity.take() {
                    request.extensions_mut().insert(identity);
                }
                if let Some(session) = ctx.session.take() {
                    request.extensions_mut().insert(session);
                }
                if let Some(ownership) = ctx.ownership.take() {
                    request.extensions_mut().insert(ownership);
                }
                if let Some(audit) = ctx.audit.take() {
                    request.extensions_mut().insert(audit);
                }
                next.run(request).await
            }
            Err(denial) => {
                let dead_session = matches!(denial, ApiError::SessionNotFound);
                let mut response = denial.into_response();
                if dead_session {
                    let cfg = config::config();
                    let attrs = CookieAttributes::derive(
                        cfg.environment,
                        ctx.origin.as_deref(),
                        &cfg.api.cors_origins,
                    );
                    clear_refresh_cookie(&mut response, attrs);
                }
                response
            }
        }
    }
}

fn query_school_id(query: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == "school_id" && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

/// Top-level `school_id` / `schoolId` string fields of a JSON object body.
fn body_school_ids(bytes: &[u8]) -> Vec<String> {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(bytes) else {
        return Vec::new();
    };
    let Some(object) = value.as_object() else {
        return Vec::new();
    };

    ["school_id", "schoolId"]
        .iter()
        .filter_map(|key| object.get(*key))
        .filter_map(|v| v.as_str())
        .map(str::to_string)
        .collect()
}
