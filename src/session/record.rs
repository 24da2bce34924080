use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::auth::claims::{Identity, PlatformClaims, TenantClaims};
use crate::auth::role::Role;

/// Server-side record of one login, independent of token validity.
///
/// The record never holds signing material: the refresh token is stored
/// only as a SHA-256 fingerprint so a leaked store dump cannot be replayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub subject_id: Uuid,
    pub role: Role,
    /// `None` only for platform-operator sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_id: Option<String>,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_sha256: Option<String>,
}

/// Everything the registry needs to record a successful login.
#[derive(Debug, Clone)]
pub struct LoginContext {
    pub subject_id: Uuid,
    pub role: Role,
    pub school_id: Option<String>,
    pub email: String,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub refresh_token: Option<String>,
}

impl LoginContext {
    pub fn from_identity(identity: &Identity) -> Self {
        Self {
            subject_id: identity.subject_id(),
            role: identity.role(),
            school_id: identity.school_id().map(str::to_string),
            email: identity.email().to_string(),
            client_ip: None,
            user_agent: None,
            refresh_token: None,
        }
    }

    pub fn with_client(mut self, ip: Option<String>, user_agent: Option<String>) -> Self {
        self.client_ip = ip;
        self.user_agent = user_agent;
        self
    }

    pub fn with_refresh_token(mut self, token: &str) -> Self {
        self.refresh_token = Some(token.to_string());
        self
    }
}

impl SessionRecord {
    /// Materialize a record for a new login. Session ids are random and
    /// opaque; they carry no claim information.
    pub fn new(ctx: &LoginContext) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4().simple().to_string(),
            subject_id: ctx.subject_id,
            role: ctx.role,
            school_id: ctx.school_id.clone(),
            email: ctx.email.clone(),
            client_ip: ctx.client_ip.clone(),
            user_agent: ctx.user_agent.clone(),
            created_at: now,
            last_activity: now,
            refresh_token_sha256: ctx.refresh_token.as_deref().map(fingerprint),
        }
    }

    /// Rebuild the caller identity for a session-authenticated request.
    /// Session existence is necessary but not sufficient: the pipeline
    /// still checks role and school on this reconstructed identity.
    pub fn identity(&self, ttl_secs: u64) -> Identity {
        let exp = (self.last_activity + chrono::Duration::seconds(ttl_secs as i64)).timestamp();
        match &self.school_id {
            Some(school) => Identity::Tenant(TenantClaims {
                sub: self.subject_id,
                role: self.role,
                school_id: school.clone(),
                email: self.email.clone(),
                name: None,
                iat: self.created_at.timestamp(),
                exp,
            }),
            None => Identity::Platform(PlatformClaims {
                sub: self.subject_id,
                email: self.email.clone(),
                cross_tenant: true,
                iat: self.created_at.timestamp(),
                exp,
            }),
        }
    }

    pub fn matches_refresh_token(&self, token: &str) -> bool {
        self.refresh_token_sha256.as_deref() == Some(fingerprint(token).as_str())
    }
}

/// SHA-256 fingerprint, hex-encoded.
pub fn fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
