use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use uuid::Uuid;

use super::record::SessionRecord;
use super::store::{SessionStore, StoreError};

fn record_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

fn index_key(subject_id: Uuid) -> String {
    format!("sessions:subject:{}", subject_id)
}

/// Redis-backed session store.
///
/// The client is constructed from the URL without connecting; every call
/// acquires a multiplexed connection and is bounded by the configured
/// command timeout. A timeout and a refused connection are reported
/// identically as `StoreError::Unavailable`.
pub struct RedisSessionStore {
    client: redis::Client,
    timeout: Duration,
}

impl RedisSessionStore {
    pub fn new(redis_url: &str, command_timeout: Duration) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(redis_url).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            timeout: command_timeout,
        })
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StoreError::Unavailable(e.to_string())),
            Err(_) => Err(StoreError::Unavailable("command timed out".to_string())),
        }
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        self.bounded(self.client.get_multiplexed_async_connection())
            .await
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, record: &SessionRecord, ttl: Duration) -> Result<(), StoreError> {
        let payload =
            serde_json::to_string(record).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let mut con = self.connection().await?;

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("SET")
            .arg(record_key(&record.session_id))
            .arg(payload)
            .arg("EX")
            .arg(ttl.as_secs())
            .ignore()
            .cmd("SADD")
            .arg(index_key(record.subject_id))
            .arg(&record.session_id)
            .ignore();

        self.bounded(pipe.query_async::<_, ()>(&mut con)).await
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, StoreError> {
        let mut con = self.connection().await?;
        let raw: Option<String> = self.bounded(con.get(record_key(session_id))).await?;

        match raw {
            None => Ok(None),
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| StoreError::Corrupt(e.to_string())),
        }
    }

    async fn update(&self, record: &SessionRecord, ttl: Duration) -> Result<(), StoreError> {
        let payload =
            serde_json::to_string(record).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let mut con = self.connection().await?;
        self.bounded(con.set_ex(record_key(&record.session_id), payload, ttl.as_secs()))
            .await
    }

    async fn delete(&self, session_id: &str, subject_id: Uuid) -> Result<bool, StoreError> {
        let mut con = self.connection().await?;

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("DEL")
            .arg(record_key(session_id))
            .cmd("SREM")
            .arg(index_key(subject_id))
            .arg(session_id)
            .ignore();

        let (removed,): (i64,) = self.bounded(pipe.query_async(&mut con)).await?;
        Ok(removed > 0)
    }

    async fn subject_sessions(&self, subject_id: Uuid) -> Result<Vec<String>, StoreError> {
        let mut con = self.connection().await?;
        self.bounded(con.smembers(index_key(subject_id))).await
    }

    async fn prune_index(&self, subject_id: Uuid, session_id: &str) -> Result<(), StoreError> {
        let mut con = self.connection().await?;
        self.bounded(con.srem(index_key(subject_id), session_id))
            .await
    }
}
