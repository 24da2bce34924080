use async_trait::async_trait;

use crate::auth::role::Role;
use crate::error::ApiError;

use super::context::GuardContext;
use super::pipeline::Guard;

/// Admits callers whose role is in the allowed set or outranks every role
/// in it under the fixed total order.
pub struct RoleHierarchyGuard {
    allowed: Vec<Role>,
}

impl RoleHierarchyGuard {
    pub fn new(allowed: impl Into<Vec<Role>>) -> Self {
        Self {
            allowed: allowed.into(),
        }
    }
}

#[async_trait]
impl Guard for RoleHierarchyGuard {
    fn name(&self) -> &'static str {
        "role-hierarchy"
    }

    async fn check(&self, ctx: &mut GuardContext) -> Result<(), ApiError> {
        let caller = ctx.require_identity()?.role();
        if caller.satisfies(&self.allowed) {
            return Ok(());
        }
        Err(ApiError::InsufficientRole {
            caller,
            required: self.allowed.clone(),
        })
    }
}
