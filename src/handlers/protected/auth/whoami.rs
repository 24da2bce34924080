use axum::Extension;
use serde_json::{json, Value};

use crate::auth::claims::Identity;
use crate::response::{ApiResponse, ApiResult};
use crate::session::record::SessionRecord;

/// GET /api/auth/whoami - report the verified caller identity.
///
/// The one endpoint served by the dual-mode resolver: it answers for both
/// school-scoped users and the platform operator.
pub async fn whoami(
    Extension(identity): Extension<Identity>,
    session: Option<Extension<SessionRecord>>,
) -> ApiResult<Value> {
    let session_info = session.map(|Extension(record)| {
        json!({
            "session_id": record.session_id,
            "created_at": record.created_at,
            "last_activity": record.last_activity,
        })
    });

    Ok(ApiResponse::success(json!({
        "id": identity.subject_id(),
        "email": identity.email(),
        "role": identity.role().as_str(),
        "school_id": identity.school_id(),
        "platform_operator": identity.is_platform_operator(),
        "token": {
            "issued_at": identity.issued_at(),
            "expires_at": identity.expires_at(),
        },
        "session": session_info,
    })))
}
