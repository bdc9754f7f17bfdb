use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use crate::{
    error::{AppError, Result},
    models::session::Session,
    repositories::session::SessionStore,
};

fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

/// Sessions kept as `session:{id}` JSON values in Redis.
///
/// Keys carry a Redis TTL matching `expires_at`, so expired rows are evicted
/// by Redis itself; reads still check `expires_at` against the caller's clock.
#[derive(Clone)]
pub struct RedisSessionStore {
    redis: ConnectionManager,
}

impl RedisSessionStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn insert_session(&self, session: &Session) -> Result<()> {
        let session_json = sonic_rs::to_string(session)
            .map_err(|e| AppError::Internal(format!("Session serialization failed: {}", e)))?;
        let ttl_secs = (session.expires_at - session.created_at).num_seconds().max(1);

        let mut conn = self.redis.clone();
        let stored: Option<String> = redis::cmd("SET")
            .arg(session_key(&session.session_id))
            .arg(&session_json)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await?;

        if stored.is_none() {
            return Err(AppError::Internal("Session token collision".to_string()));
        }
        Ok(())
    }

    async fn find_active_session(&self, session_id: &str, now: DateTime<Utc>) -> Result<Option<Session>> {
        let mut conn = self.redis.clone();
        let session_json: Option<String> = redis::cmd("GET")
            .arg(session_key(session_id))
            .query_async(&mut conn)
            .await?;

        let Some(session_json) = session_json else {
            return Ok(None);
        };

        let session: Session = sonic_rs::from_str(&session_json)
            .map_err(|e| AppError::Internal(format!("Invalid session JSON: {}", e)))?;

        Ok(session.is_active_at(now).then_some(session))
    }

    async fn delete_session(&self, session_id: &str) -> Result<bool> {
        let mut conn = self.redis.clone();
        let deleted: i64 = redis::cmd("DEL")
            .arg(session_key(session_id))
            .query_async(&mut conn)
            .await?;
        Ok(deleted > 0)
    }

    async fn delete_expired(&self, _now: DateTime<Utc>) -> Result<u64> {
        Ok(0)
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.redis.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
