use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::claims::Identity;
use crate::auth::token::TokenService;
use crate::error::ApiError;
use crate::session::registry::SessionRegistry;

use super::context::GuardContext;
use super::pipeline::Guard;

/// Which token class a route group accepts. Fixed at route registration:
/// tenant routes can never be satisfied by a platform token and vice
/// versa; only the unified whoami surface resolves both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Tenant,
    Platform,
    Dual,
}

/// First guard in every pipeline: resolves the caller's identity from the
/// Authorization header or, for cookie-bound flows, from the session
/// registry indirection.
pub struct AuthenticateGuard {
    mode: AuthMode,
    tokens: Arc<TokenService>,
    registry: Arc<SessionRegistry>,
    /// Session indirection is disabled in legacy deployments where the
    /// cookie carries the refresh token itself.
    session_cookie_enabled: bool,
}

impl AuthenticateGuard {
    pub fn new(
        mode: AuthMode,
        tokens: Arc<TokenService>,
        registry: Arc<SessionRegistry>,
        session_cookie_enabled: bool,
    ) -> Self {
        Self {
            mode,
            tokens,
            registry,
            session_cookie_enabled,
        }
    }

    fn verify_bearer(&self, token: &str) -> Result<Identity, ApiError> {
        let identity = match self.mode {
            AuthMode::Tenant => Identity::Tenant(self.tokens.verify_tenant_access(token)?),
            AuthMode::Platform => Identity::Platform(self.tokens.verify_platform_access(token)?),
            AuthMode::Dual => self.tokens.resolve_any_access(token)?,
        };
        Ok(identity)
    }

    fn class_matches(&self, identity: &Identity) -> bool {
        match self.mode {
            AuthMode::Tenant => !identity.is_platform_operator(),
            AuthMode::Platform => identity.is_platform_operator(),
            AuthMode::Dual => true,
        }
    }
}

#[async_trait]
impl Guard for AuthenticateGuard {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    async fn check(&self, ctx: &mut GuardContext) -> Result<(), ApiError> {
        // Header-based flow wins when both credentials are present.
        if let Some(header) = ctx.authorization.clone() {
            let token = extract_bearer_token(&header)?;
            let identity = self.verify_bearer(&token)?;
            ctx.identity = Some(identity);

            // Cross-check the registry when the client also sent a session
            // reference. Absence is ambiguous (revoked, expired, store
            // down), so a valid token still admits; a live record is
            // touched and attached.
            if self.session_cookie_enabled {
                if let Some(sid) = ctx.cookie_value.clone() {
                    if let Some(record) = self.registry.validate(&sid).await {
                        if Some(record.subject_id)
                            == ctx.identity.as_ref().map(|i| i.subject_id())
                        {
                            self.registry.touch(&sid).await;
                            ctx.session = Some(record);
                        }
                    }
                }
            }
            return Ok(());
        }

        // Cookie-only flow: the cookie is an opaque session reference and
        // the registry is authoritative. A dead reference is a hard 401;
        // the pipeline clears the cookie on the way out.
        if self.session_cookie_enabled {
            if let Some(sid) = ctx.cookie_value.clone() {
                let record = self
                    .registry
                    .validate(&sid)
                    .await
                    .ok_or(ApiError::SessionNotFound)?;
                let identity = record.identity(self.registry.ttl_secs());

                if !self.class_matches(&identity) {
                    return Err(ApiError::InvalidToken);
                }

                self.registry.touch(&sid).await;
                ctx.session = Some(record);
                ctx.identity = Some(identity);
                return Ok(());
            }
        }

        Err(ApiError::unauthorized("Access token required"))
    }
}

/// Pull the token out of an Authorization header value. The `Bearer`
/// prefix is case-insensitive; a present-but-garbled header is reported
/// distinctly from an absent one.
pub fn extract_bearer_token(header: &str) -> Result<String, ApiError> {
    let header = header.trim();
    let (scheme, rest) = header
        .split_once(char::is_whitespace)
        .ok_or_else(|| ApiError::unauthorized("Invalid token format"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(ApiError::unauthorized("Invalid token format"));
    }

    let token = rest.trim();
    if token.is_empty() {
        return Err(ApiError::unauthorized("Invalid token format"));
    }
    Ok(token.to_string())
}
