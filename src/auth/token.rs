use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Serialize};

use crate::config::AuthConfig;

use super::claims::{Identity, PlatformClaims, TenantClaims};

/// Token verification/issuance failure.
///
/// `Expired` and `Malformed` are kept distinct all the way to the HTTP
/// layer: an expired token is a 401, a token with a wrong signature or
/// claim shape is a 403.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("token expired")]
    Expired,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("missing required claim: {0}")]
    MissingClaims(&'static str),
}

/// Access + refresh pair minted for one login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

struct KeyPair {
    enc: EncodingKey,
    dec: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            enc: EncodingKey::from_secret(secret.as_bytes()),
            dec: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Issues and verifies the two disjoint token families.
///
/// Tenant and platform tokens are signed with distinct secrets for both the
/// access and refresh families, so possession of one never implies validity
/// as the other; a single-class verifier rejects the foreign class on
/// signature alone. Stateless beyond the key material.
pub struct TokenService {
    tenant_access: KeyPair,
    tenant_refresh: KeyPair,
    platform_access: KeyPair,
    platform_refresh: KeyPair,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(auth: &AuthConfig) -> Self {
        Self {
            tenant_access: KeyPair::from_secret(&auth.tenant_access_secret),
            tenant_refresh: KeyPair::from_secret(&auth.tenant_refresh_secret),
            platform_access: KeyPair::from_secret(&auth.platform_access_secret),
            platform_refresh: KeyPair::from_secret(&auth.platform_refresh_secret),
            access_ttl: Duration::hours(auth.access_token_ttl_hours),
            refresh_ttl: Duration::days(auth.refresh_token_ttl_days),
        }
    }

    /// Mint an access + refresh pair for a verified identity. The two
    /// tokens share claims apart from their expiry stamps.
    pub fn issue(&self, identity: &Identity) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let access_exp = now + self.access_ttl;
        let refresh_exp = now + self.refresh_ttl;

        match identity {
            Identity::Tenant(claims) => {
                claims.validate_shape().map_err(AuthError::MissingClaims)?;
                let access = TenantClaims {
                    iat: now.timestamp(),
                    exp: access_exp.timestamp(),
                    ..claims.clone()
                };
                let refresh = TenantClaims {
                    iat: now.timestamp(),
                    exp: refresh_exp.timestamp(),
                    ..claims.clone()
                };
                Ok(TokenPair {
                    access_token: sign(&access, &self.tenant_access.enc)?,
                    refresh_token: sign(&refresh, &self.tenant_refresh.enc)?,
                    expires_in: self.access_ttl.num_seconds(),
                })
            }
            Identity::Platform(claims) => {
                let access = PlatformClaims {
                    iat: now.timestamp(),
                    exp: access_exp.timestamp(),
                    ..claims.clone()
                };
                let refresh = PlatformClaims {
                    iat: now.timestamp(),
                    exp: refresh_exp.timestamp(),
                    ..claims.clone()
                };
                Ok(TokenPair {
                    access_token: sign(&access, &self.platform_access.enc)?,
                    refresh_token: sign(&refresh, &self.platform_refresh.enc)?,
                    expires_in: self.access_ttl.num_seconds(),
                })
            }
        }
    }

    pub fn verify_tenant_access(&self, token: &str) -> Result<TenantClaims, AuthError> {
        verify::<TenantClaims>(token, &self.tenant_access.dec)
    }

    pub fn verify_tenant_refresh(&self, token: &str) -> Result<TenantClaims, AuthError> {
        verify::<TenantClaims>(token, &self.tenant_refresh.dec)
    }

    pub fn verify_platform_access(&self, token: &str) -> Result<PlatformClaims, AuthError> {
        verify::<PlatformClaims>(token, &self.platform_access.dec)
    }

    pub fn verify_platform_refresh(&self, token: &str) -> Result<PlatformClaims, AuthError> {
        verify::<PlatformClaims>(token, &self.platform_refresh.dec)
    }

    /// Dual-mode resolution for the one endpoint that legitimately serves
    /// both caller kinds. Platform class is attempted first; an expired
    /// platform token is reported as expired rather than falling through,
    /// since a signature match already identifies the class.
    pub fn resolve_any_access(&self, token: &str) -> Result<Identity, AuthError> {
        match self.verify_platform_access(token) {
            Ok(claims) => Ok(Identity::Platform(claims)),
            Err(AuthError::Expired) => Err(AuthError::Expired),
            Err(_) => self.verify_tenant_access(token).map(Identity::Tenant),
        }
    }
}

fn sign<T: Serialize>(claims: &T, key: &EncodingKey) -> Result<String, AuthError> {
    encode(&Header::default(), claims, key).map_err(|e| AuthError::Malformed(e.to_string()))
}

fn verify<T: DeserializeOwned>(token: &str, key: &DecodingKey) -> Result<T, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Zero leeway: an expired token must report as expired on the first
    // second past exp, never as a shape error.
    validation.leeway = 0;

    match decode::<T>(token, key, &validation) {
        Ok(data) => Ok(data.claims),
        Err(e) => match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(AuthError::Expired),
            _ => Err(AuthError::Malformed(e.to_string())),
        },
    }
}
