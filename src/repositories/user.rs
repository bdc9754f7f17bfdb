use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;
use crate::{
    error::{AppError, Result},
    models::user::User,
};

/// Read access to user records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Finds a user by exact, case-sensitive login.
    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>>;

    /// Finds a user by their ID.
    async fn find_user_by_id(&self, user_id: &Uuid) -> Result<Option<User>>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<()>;
}

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    Ok(User {
        id: row.try_get("id").map_err(|_| AppError::MissingData("id".to_string()))?,
        login: row.try_get("login").map_err(|_| AppError::MissingData("login".to_string()))?,
        name: row.try_get("name").map_err(|_| AppError::MissingData("name".to_string()))?,
        password_hash: row.try_get("password_hash").map_err(|_| AppError::MissingData("password_hash".to_string()))?,
    })
}

/// `users` table in PostgreSQL.
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: Pool,
}

impl PgCredentialStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                SELECT id, login, name, password_hash
                FROM users
                WHERE login = $1
                "#,
            )
            .await?;
        let row = client.query_opt(&statement, &[&login]).await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn find_user_by_id(&self, user_id: &Uuid) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let statement = client
            .prepare_cached(
                r#"
                SELECT id, login, name, password_hash
                FROM users
                WHERE id = $1
                "#,
            )
            .await?;
        let row = client.query_opt(&statement, &[user_id]).await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn ping(&self) -> Result<()> {
        let client = self.pool.get().await?;
        client.execute("SELECT 1", &[]).await?;
        Ok(())
    }
}
