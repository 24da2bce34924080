use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::role::Role;
use crate::error::ApiError;

use super::context::GuardContext;
use super::pipeline::Guard;

/// Immutable snapshot handed to the audit-logging collaborator. Attached
/// to every authorized request; the sink's durability and format are not
/// this crate's concern.
#[derive(Debug, Clone, Serialize)]
pub struct AuditContext {
    pub operation: String,
    pub subject_id: Uuid,
    pub role: Role,
    pub school_id: Option<String>,
    pub cross_tenant: bool,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Final guard: annotates, never denies.
pub struct AuditContextGuard;

#[async_trait]
impl Guard for AuditContextGuard {
    fn name(&self) -> &'static str {
        "audit-context"
    }

    async fn check(&self, ctx: &mut GuardContext) -> Result<(), ApiError> {
        let Some(identity) = ctx.identity.as_ref() else {
            // Nothing to annotate; this guard has no opinion on admission.
            return Ok(());
        };

        let audit = AuditContext {
            operation: ctx.operation.clone(),
            subject_id: identity.subject_id(),
            role: identity.role(),
            school_id: identity.school_id().map(str::to_string),
            cross_tenant: ctx.cross_tenant,
            client_ip: ctx.client_ip.clone(),
            user_agent: ctx.user_agent.clone(),
            timestamp: Utc::now(),
        };

        tracing::info!(
            target: "audit",
            operation = %audit.operation,
            subject_id = %audit.subject_id,
            role = %audit.role,
            school_id = audit.school_id.as_deref().unwrap_or("-"),
            cross_tenant = audit.cross_tenant,
            "request authorized"
        );

        ctx.audit = Some(audit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::{Identity, PlatformClaims};

    #[tokio::test]
    async fn snapshot_carries_cross_tenant_mark() {
        let mut ctx = GuardContext {
            operation: "GET /platform/schools/SCH0002/students".to_string(),
            identity: Some(Identity::Platform(PlatformClaims {
                sub: Uuid::new_v4(),
                email: "ops@platform.example".to_string(),
                cross_tenant: true,
                iat: 0,
                exp: 0,
            })),
            cross_tenant: true,
            ..Default::default()
        };

        AuditContextGuard.check(&mut ctx).await.expect("annotate");
        let audit = ctx.audit.expect("audit context");
        assert!(audit.cross_tenant);
        assert_eq!(audit.role, Role::PlatformOperator);
        assert_eq!(audit.school_id, None);
    }

    #[tokio::test]
    async fn missing_identity_never_denies() {
        let mut ctx = GuardContext::default();
        assert!(AuditContextGuard.check(&mut ctx).await.is_ok());
        assert!(ctx.audit.is_none());
    }
}
