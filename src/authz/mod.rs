//! Authorization pipeline.
//!
//! An ordered list of guards with one uniform signature, folded over the
//! request by [`pipeline::Pipeline`]. Earlier guards are cheaper and run
//! first; the first denial wins and nothing after it executes.

pub mod audit;
pub mod authenticate;
pub mod context;
pub mod ownership;
pub mod pipeline;
pub mod role;
pub mod tenant;

pub use audit::{AuditContext, AuditContextGuard};
pub use authenticate::{AuthMode, AuthenticateGuard};
pub use context::GuardContext;
pub use ownership::{OwnershipDecision, ResourceKind, ResourceOwnershipGuard};
pub use pipeline::{Guard, Pipeline};
pub use role::RoleHierarchyGuard;
pub use tenant::TenantIsolationGuard;
