use axum::http::Method;

use crate::auth::claims::Identity;
use crate::error::ApiError;
use crate::session::record::SessionRecord;

use super::audit::AuditContext;
use super::ownership::OwnershipDecision;

/// Everything a guard may read or decide about one request.
///
/// Inputs are extracted once by the pipeline adapter before any guard
/// runs; guards communicate only through the decision fields below, never
/// by mutating the request itself.
#[derive(Debug, Default)]
pub struct GuardContext {
    // Request inputs
    pub operation: String,
    pub method: Method,
    pub authorization: Option<String>,
    pub cookie_value: Option<String>,
    pub origin: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    /// `:school_id` path segment, when the route has one.
    pub path_school: Option<String>,
    /// Top-level `school_id`/`schoolId` fields from a JSON body.
    pub body_schools: Vec<String>,
    pub query_school: Option<String>,
    /// `x-school-id` header.
    pub header_school: Option<String>,
    /// `:id` path segment, when the route addresses a single resource.
    pub resource_id: Option<String>,

    // Guard decisions
    pub identity: Option<Identity>,
    pub session: Option<SessionRecord>,
    pub cross_tenant: bool,
    pub ownership: Option<OwnershipDecision>,
    pub audit: Option<AuditContext>,
}

impl GuardContext {
    /// Candidate school ids in carrier priority order (path, body, query,
    /// header), deduplicated.
    pub fn school_candidates(&self) -> Vec<&str> {
        let ordered = self
            .path_school
            .as_deref()
            .into_iter()
            .chain(self.body_schools.iter().map(String::as_str))
            .chain(self.query_school.as_deref())
            .chain(self.header_school.as_deref());

        let mut out: Vec<&str> = Vec::new();
        for candidate in ordered {
            if !candidate.is_empty() && !out.contains(&candidate) {
                out.push(candidate);
            }
        }
        out
    }

    /// The verified caller. Guards after authentication may assume it; a
    /// missing identity is a pipeline-ordering bug, reported as a 500
    /// rather than a denial the client could reason about.
    pub fn require_identity(&self) -> Result<&Identity, ApiError> {
        self.identity.as_ref().ok_or_else(|| {
            ApiError::internal_server_error("An error occurred while processing your request")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_follow_carrier_priority() {
        let ctx = GuardContext {
            path_school: Some("SCH0001".to_string()),
            body_schools: vec!["SCH0002".to_string()],
            query_school: Some("SCH0003".to_string()),
            header_school: Some("SCH0004".to_string()),
            ..Default::default()
        };
        assert_eq!(
            ctx.school_candidates(),
            vec!["SCH0001", "SCH0002", "SCH0003", "SCH0004"]
        );
    }

    #[test]
    fn candidates_deduplicate_and_skip_empties() {
        let ctx = GuardContext {
            path_school: Some("SCH0001".to_string()),
            body_schools: vec!["SCH0001".to_string(), String::new()],
            header_school: Some("SCH0001".to_string()),
            ..Default::default()
        };
        assert_eq!(ctx.school_candidates(), vec!["SCH0001"]);
    }

    #[test]
    fn missing_identity_is_an_internal_error() {
        let ctx = GuardContext::default();
        let err = ctx.require_identity().unwrap_err();
        assert_eq!(err.status_code(), 500);
    }
}
