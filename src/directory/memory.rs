use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Directory, DirectoryError, SubjectProfile};

/// In-memory directory for development and tests.
#[derive(Default)]
pub struct MemoryDirectory {
    schools: RwLock<HashSet<String>>,
    subjects: RwLock<Vec<SubjectProfile>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_school(&self, school_id: impl Into<String>) {
        self.schools.write().await.insert(school_id.into());
    }

    pub async fn add_subject(&self, subject: SubjectProfile) {
        self.subjects.write().await.push(subject);
    }

    pub async fn deactivate_school(&self, school_id: &str) {
        self.schools.write().await.remove(school_id);
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn school_active(&self, school_id: &str) -> Result<bool, DirectoryError> {
        Ok(self.schools.read().await.contains(school_id))
    }

    async fn find_subject_by_email(
        &self,
        school_id: &str,
        email: &str,
    ) -> Result<Option<SubjectProfile>, DirectoryError> {
        Ok(self
            .subjects
            .read()
            .await
            .iter()
            .find(|s| s.school_id == school_id && s.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_subject(&self, subject_id: Uuid) -> Result<Option<SubjectProfile>, DirectoryError> {
        Ok(self
            .subjects
            .read()
            .await
            .iter()
            .find(|s| s.id == subject_id)
            .cloned())
    }
}
