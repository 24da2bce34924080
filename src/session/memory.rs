use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::record::SessionRecord;
use super::store::{SessionStore, StoreError};

struct Entry {
    record: SessionRecord,
    expires_at: Instant,
}

/// In-memory session store. Development backend and test double; honors
/// the same TTL semantics as the Redis store, with an outage switch so
/// degraded-mode behavior can be exercised.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Entry>>,
    index: RwLock<HashMap<Uuid, HashSet<String>>>,
    unavailable: AtomicBool,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the store going down (or coming back).
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    fn check_up(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is down".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, record: &SessionRecord, ttl: Duration) -> Result<(), StoreError> {
        self.check_up()?;
        self.sessions.write().await.insert(
            record.session_id.clone(),
            Entry {
                record: record.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        self.index
            .write()
            .await
            .entry(record.subject_id)
            .or_default()
            .insert(record.session_id.clone());
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        self.check_up()?;
        let mut sessions = self.sessions.write().await;
        match sessions.get(session_id) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.record.clone())),
            Some(_) => {
                // Expired entries vanish on read, like a lapsed Redis TTL.
                sessions.remove(session_id);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn update(&self, record: &SessionRecord, ttl: Duration) -> Result<(), StoreError> {
        self.check_up()?;
        self.sessions.write().await.insert(
            record.session_id.clone(),
            Entry {
                record: record.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, session_id: &str, subject_id: Uuid) -> Result<bool, StoreError> {
        self.check_up()?;
        let existed = self.sessions.write().await.remove(session_id).is_some();
        if let Some(ids) = self.index.write().await.get_mut(&subject_id) {
            ids.remove(session_id);
        }
        Ok(existed)
    }

    async fn subject_sessions(&self, subject_id: Uuid) -> Result<Vec<String>, StoreError> {
        self.check_up()?;
        Ok(self
            .index
            .read()
            .await
            .get(&subject_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn prune_index(&self, subject_id: Uuid, session_id: &str) -> Result<(), StoreError> {
        self.check_up()?;
        if let Some(ids) = self.index.write().await.get_mut(&subject_id) {
            ids.remove(session_id);
        }
        Ok(())
    }
}
