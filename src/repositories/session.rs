use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use crate::{
    error::{AppError, Result},
    models::session::Session,
};

/// Persistence of session rows.
///
/// Implementations must make `insert_session` atomic and must reject a
/// `session_id` that already exists instead of overwriting it.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists a new session.
    async fn insert_session(&self, session: &Session) -> Result<()>;

    /// Finds the session with this ID whose `expires_at` is after `now`.
    async fn find_active_session(&self, session_id: &str, now: DateTime<Utc>) -> Result<Option<Session>>;

    /// Deletes a session. Returns whether a row was removed.
    async fn delete_session(&self, session_id: &str) -> Result<bool>;

    /// Deletes every session with `expires_at <= now`. Returns how many went.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<()>;
}

fn row_to_session(row: &Row) -> Result<Session> {
    Ok(Session {
        session_id: row.try_get("session_id").map_err(|_| AppError::MissingData("session_id".to_string()))?,
        user_id: row.try_get("user_id").map_err(|_| AppError::MissingData("user_id".to_string()))?,
        created_at: row.try_get("created_at").map_err(|_| AppError::MissingData("created_at".to_string()))?,
        expires_at: row.try_get("expires_at").map_err(|_| AppError::MissingData("expires_at".to_string()))?,
    })
}

/// `sessions` table in PostgreSQL.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: Pool,
}

impl PgSessionStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert_session(&self, session: &Session) -> Result<()> {
        let mut client = self.pool.get().await?;
        let transaction = client.transaction().await?;
        let statement = transaction
            .prepare_cached(
                r#"
                INSERT INTO sessions (session_id, user_id, created_at, expires_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .await?;
        transaction
            .execute(
                &statement,
                &[&session.session_id, &session.user_id, &session.created_at, &session.expires_at],
            )
            .await?;
        transaction.commit().await?;
        Ok(())
    }

    async fn find_active_session(&self, session_id: &str, now: DateTime<Utc>) -> Result<Option<Session>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                SELECT session_id, user_id, created_at, expires_at
                FROM sessions
                WHERE session_id = $1 AND expires_at > $2
                "#,
            )
            .await?;
        let row = client.query_opt(&statement, &[&session_id, &now]).await?;
        row.map(|r| row_to_session(&r)).transpose()
    }

    async fn delete_session(&self, session_id: &str) -> Result<bool> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached("DELETE FROM sessions WHERE session_id = $1")
            .await?;
        let deleted = client.execute(&statement, &[&session_id]).await?;
        Ok(deleted > 0)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached("DELETE FROM sessions WHERE expires_at <= $1")
            .await?;
        Ok(client.execute(&statement, &[&now]).await?)
    }

    async fn ping(&self) -> Result<()> {
        let client = self.pool.get().await?;
        client.execute("SELECT 1", &[]).await?;
        Ok(())
    }
}
