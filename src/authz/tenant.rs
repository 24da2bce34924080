use async_trait::async_trait;

use crate::error::ApiError;

use super::context::GuardContext;
use super::pipeline::Guard;

/// The single enforcement point for tenant isolation. No other code path
/// may reach tenant-scoped data without passing here.
///
/// Candidate school ids are taken from every carrier (path, body, query,
/// header, in that priority order) and each one must match the caller's
/// own school; checking only the highest-priority carrier would let a
/// request smuggle a second school in a lower one. The platform operator
/// is always admitted and the request is marked cross-tenant for audit.
pub struct TenantIsolationGuard;

#[async_trait]
impl Guard for TenantIsolationGuard {
    fn name(&self) -> &'static str {
        "tenant-isolation"
    }

    async fn check(&self, ctx: &mut GuardContext) -> Result<(), ApiError> {
        if ctx.require_identity()?.is_platform_operator() {
            ctx.cross_tenant = true;
            return Ok(());
        }

        let own_school = ctx
            .require_identity()?
            .school_id()
            .ok_or_else(|| {
                // A non-operator identity without a school cannot be
                // constructed through issuance; reject rather than guess.
                ApiError::internal_server_error(
                    "An error occurred while processing your request",
                )
            })?
            .to_string();

        let mismatched: Vec<String> = ctx
            .school_candidates()
            .into_iter()
            .filter(|candidate| *candidate != own_school)
            .map(str::to_string)
            .collect();

        if mismatched.is_empty() {
            return Ok(());
        }

        Err(ApiError::CrossTenantDenied {
            caller_school: own_school,
            requested_schools: mismatched,
        })
    }
}
