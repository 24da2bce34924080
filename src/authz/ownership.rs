use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::role::Role;
use crate::error::ApiError;

use super::context::GuardContext;
use super::pipeline::Guard;

/// Resource families the ownership guard can be parameterized with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    School,
    Student,
    Teacher,
    Parent,
    Invitation,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::School => "school",
            ResourceKind::Student => "student",
            ResourceKind::Teacher => "teacher",
            ResourceKind::Parent => "parent",
            ResourceKind::Invitation => "invitation",
        }
    }
}

/// Immutable capability decision handed to the CRUD layer. The guard
/// decides whether delegation is required; it never queries persistence
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnershipDecision {
    /// The addressed resource is the caller's own record.
    SelfRecord,
    /// Admin-level access within the already-isolated tenant scope.
    AdminScope,
    /// The CRUD layer must apply its own relationship check (teacher's
    /// class roster, parent's linked students) for this resource kind.
    Delegated(ResourceKind),
}

/// Optional fourth guard: applies capability rules by role for a single
/// addressed resource.
pub struct ResourceOwnershipGuard {
    resource: ResourceKind,
}

impl ResourceOwnershipGuard {
    pub fn new(resource: ResourceKind) -> Self {
        Self { resource }
    }
}

#[async_trait]
impl Guard for ResourceOwnershipGuard {
    fn name(&self) -> &'static str {
        "resource-ownership"
    }

    async fn check(&self, ctx: &mut GuardContext) -> Result<(), ApiError> {
        let identity = ctx.require_identity()?;

        let addressed_self = ctx
            .resource_id
            .as_deref()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .map(|id| id == identity.subject_id())
            .unwrap_or(false);

        let decision = if addressed_self {
            OwnershipDecision::SelfRecord
        } else {
            match identity.role() {
                Role::PlatformOperator | Role::SchoolAdmin => OwnershipDecision::AdminScope,
                Role::Teacher | Role::Parent => OwnershipDecision::Delegated(self.resource),
            }
        };

        ctx.ownership = Some(decision);
        Ok(())
    }
}
