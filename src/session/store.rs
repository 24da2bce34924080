use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::record::SessionRecord;

/// Key-value store failure. Callers above the registry never see this
/// type; the registry converts every failure into its degraded contract.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection refused, network timeout, or the store client's own
    /// deadline elapsed. All three read the same from the outside.
    #[error("session store unreachable: {0}")]
    Unavailable(String),
    #[error("session record corrupt: {0}")]
    Corrupt(String),
}

/// Contract for the session key-value store.
///
/// Each method is a single atomic store operation (one key write, one
/// command sequence); cross-operation transactions are deliberately not
/// offered. Implementations must bound every call with their own timeout.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Write the record with the given TTL and add it to the subject index.
    async fn create(&self, record: &SessionRecord, ttl: Duration) -> Result<(), StoreError>;

    /// Fetch a live record. `None` means missing or expired.
    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Rewrite the record and reset its TTL window.
    async fn update(&self, record: &SessionRecord, ttl: Duration) -> Result<(), StoreError>;

    /// Remove the record and its index entry. Returns whether a record
    /// actually existed (removal of an absent session is not an error).
    async fn delete(&self, session_id: &str, subject_id: Uuid) -> Result<bool, StoreError>;

    /// Session ids currently indexed for the subject. May contain ids whose
    /// records have already expired; callers prune via `prune_index`.
    async fn subject_sessions(&self, subject_id: Uuid) -> Result<Vec<String>, StoreError>;

    /// Drop a stale id from the subject index.
    async fn prune_index(&self, subject_id: Uuid, session_id: &str) -> Result<(), StoreError>;
}
