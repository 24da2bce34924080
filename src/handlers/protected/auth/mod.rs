// Session-management handlers. Every route here sits behind the
// authorization pipeline; handlers read the verified identity (and, for
// cookie flows, the live session record) from request extensions.

pub mod session;
pub mod whoami;

pub use session::{
    list_sessions, logout, revoke_all_sessions, revoke_session, revoke_subject_sessions,
};
pub use whoami::whoami;
