use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;

/// Claim set for a school-scoped user. `school_id` is always present and
/// non-empty; the role is never `PlatformOperator`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantClaims {
    pub sub: Uuid,
    pub role: Role,
    pub school_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Claim set for the platform operator. There is no `school_id` in this
/// shape; `cross_tenant` is an explicit flag rather than an inferred right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformClaims {
    pub sub: Uuid,
    pub email: String,
    pub cross_tenant: bool,
    pub iat: i64,
    pub exp: i64,
}

/// A verified caller identity. The two claim shapes stay distinct so that
/// route handlers binding one class can never accidentally accept the other.
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    Tenant(TenantClaims),
    Platform(PlatformClaims),
}

impl Identity {
    pub fn subject_id(&self) -> Uuid {
        match self {
            Identity::Tenant(c) => c.sub,
            Identity::Platform(c) => c.sub,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Identity::Tenant(c) => c.role,
            Identity::Platform(_) => Role::PlatformOperator,
        }
    }

    /// `None` only for the platform operator.
    pub fn school_id(&self) -> Option<&str> {
        match self {
            Identity::Tenant(c) => Some(c.school_id.as_str()),
            Identity::Platform(_) => None,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Identity::Tenant(c) => &c.email,
            Identity::Platform(c) => &c.email,
        }
    }

    pub fn is_platform_operator(&self) -> bool {
        matches!(self, Identity::Platform(_))
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        let iat = match self {
            Identity::Tenant(c) => c.iat,
            Identity::Platform(c) => c.iat,
        };
        Utc.timestamp_opt(iat, 0).single().unwrap_or_else(Utc::now)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        let exp = match self {
            Identity::Tenant(c) => c.exp,
            Identity::Platform(c) => c.exp,
        };
        Utc.timestamp_opt(exp, 0).single().unwrap_or_else(Utc::now)
    }
}

impl TenantClaims {
    /// Claim-shape invariant: a tenant identity carries a non-empty school
    /// and a tenant-level role.
    pub fn validate_shape(&self) -> Result<(), &'static str> {
        if self.school_id.trim().is_empty() {
            return Err("school_id");
        }
        if self.role == Role::PlatformOperator {
            return Err("role");
        }
        Ok(())
    }
}
