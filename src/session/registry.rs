use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use super::record::{LoginContext, SessionRecord};
use super::store::SessionStore;

/// Durable, TTL-bound registry of live logins.
///
/// This is the single degradation point for session storage: every store
/// failure is absorbed here and surfaced to callers as absence (`None`,
/// empty list, zero count), never as an error. Tenant authentication must
/// keep working on token verification alone when the store is down, so no
/// caller gets to branch on infrastructure health.
pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs()
    }

    /// Record a login. `None` means the store was unreachable and the
    /// caller should operate in store-less mode.
    pub async fn create(&self, ctx: &LoginContext) -> Option<String> {
        let record = SessionRecord::new(ctx);
        match self.store.create(&record, self.ttl).await {
            Ok(()) => Some(record.session_id),
            Err(e) => {
                tracing::warn!("session create failed, continuing store-less: {}", e);
                None
            }
        }
    }

    /// Resolve a live session. `None` is deliberately ambiguous between
    /// "never existed", "expired" and "store unreachable"; the caller takes
    /// the same degraded path in all three cases.
    pub async fn validate(&self, session_id: &str) -> Option<SessionRecord> {
        match self.store.get(session_id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("session lookup failed: {}", e);
                None
            }
        }
    }

    /// Refresh the liveness window. Best-effort: a race with a concurrent
    /// revoke may rewrite a record that is about to disappear or no-op on
    /// one already gone; both outcomes are fine.
    pub async fn touch(&self, session_id: &str) {
        let mut record = match self.store.get(session_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("session touch skipped: {}", e);
                return;
            }
        };

        record.last_activity = Utc::now();
        if let Err(e) = self.store.update(&record, self.ttl).await {
            tracing::warn!("session touch failed: {}", e);
        }
    }

    /// Re-stamp the refresh-token fingerprint after a rotation. Best-effort
    /// like `touch`; a session that disappeared mid-rotation is simply not
    /// updated.
    pub async fn rotate_refresh(&self, session_id: &str, refresh_token: &str) {
        let mut record = match self.store.get(session_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("session rotation skipped: {}", e);
                return;
            }
        };

        record.refresh_token_sha256 = Some(super::record::fingerprint(refresh_token));
        record.last_activity = Utc::now();
        if let Err(e) = self.store.update(&record, self.ttl).await {
            tracing::warn!("session rotation failed: {}", e);
        }
    }

    /// Remove one session. Idempotent; revoking an absent session is not
    /// an error.
    pub async fn revoke(&self, session_id: &str, subject_id: Uuid) {
        if let Err(e) = self.store.delete(session_id, subject_id).await {
            tracing::warn!("session revoke failed: {}", e);
        }
    }

    /// Remove every session for the subject. Point-in-time: a concurrent
    /// login racing this call may survive, which is acceptable. Returns
    /// the number of records actually removed.
    pub async fn revoke_all(&self, subject_id: Uuid) -> u64 {
        let ids = match self.store.subject_sessions(subject_id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!("session revoke_all failed: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        for id in ids {
            match self.store.delete(&id, subject_id).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!("session revoke_all: delete {} failed: {}", id, e),
            }
        }
        removed
    }

    /// List the subject's live sessions. Self-healing: ids left in the
    /// index by expired records are pruned as a side effect, so the index
    /// cannot grow stale without bound.
    pub async fn list(&self, subject_id: Uuid) -> Vec<SessionRecord> {
        let ids = match self.store.subject_sessions(subject_id).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!("session list failed: {}", e);
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for id in ids {
            match self.store.get(&id).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {
                    if let Err(e) = self.store.prune_index(subject_id, &id).await {
                        tracing::debug!("index prune for {} failed: {}", id, e);
                    }
                }
                Err(e) => {
                    tracing::warn!("session list: lookup {} failed: {}", id, e);
                }
            }
        }
        records.sort_by_key(|r| r.created_at);
        records
    }
}
