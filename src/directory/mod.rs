//! Persistence collaborator interface.
//!
//! The auth core asks exactly two questions of the school/user store:
//! "does school X exist and is it active" and "does subject Y exist, is it
//! active, what is its role/school". Schema and storage for those entities
//! belong to the CRUD layer; this module only owns the seam.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::role::Role;

pub use memory::MemoryDirectory;
pub use pg::PgDirectory;

/// A subject as the directory knows it. `password_hash` is an Argon2 PHC
/// string and never leaves the server.
#[derive(Debug, Clone)]
pub struct SubjectProfile {
    pub id: Uuid,
    pub role: Role,
    pub school_id: String,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub active: bool,
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Directory unavailable: {0}")]
    Unavailable(String),
    #[error("Directory query failed: {0}")]
    Query(String),
}

#[async_trait]
pub trait Directory: Send + Sync {
    /// Does the school exist and is it active (not suspended or deleted)?
    async fn school_active(&self, school_id: &str) -> Result<bool, DirectoryError>;

    /// Look up a subject within one school by login email.
    async fn find_subject_by_email(
        &self,
        school_id: &str,
        email: &str,
    ) -> Result<Option<SubjectProfile>, DirectoryError>;

    /// Look up a subject by id, across schools.
    async fn find_subject(&self, subject_id: Uuid) -> Result<Option<SubjectProfile>, DirectoryError>;
}
