use std::sync::Arc;

use redis::aio::ConnectionManager;

use crate::config::{Config, SessionBackend};
use crate::error::{AppError, Result};
use crate::repositories::{
    redis_session::RedisSessionStore,
    session::{PgSessionStore, SessionStore},
    user::{CredentialStore, PgCredentialStore},
};
use crate::services::{auth::Authenticator, sessions::SessionManager};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Config,
    /// Read access to users, for profile lookups.
    pub users: Arc<dyn CredentialStore>,
    /// Credential checks for login.
    pub authenticator: Authenticator,
    /// Session lifecycle.
    pub sessions: SessionManager,
}

impl AppState {
    /// Creates a new `AppState` backed by PostgreSQL and, if configured, Redis.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let db = crate::db::create_pool(config)?;
        tracing::info!("✅ PostgreSQL pool initialized (max {} connections)", config.db_pool_max_size);

        match crate::db::ensure_schema(&db).await {
            Ok(()) => {}
            Err(AppError::StoreUnavailable(e)) => {
                tracing::warn!("⚠️ Database unreachable at startup, schema setup continues in the background: {}", e);
                let pool = db.clone();
                tokio::spawn(async move {
                    match crate::db::ensure_schema_eventually(&pool).await {
                        Ok(()) => tracing::info!("✅ Deferred schema setup completed"),
                        Err(e) => tracing::error!("❌ Deferred schema setup failed: {}", e),
                    }
                });
            }
            Err(e) => return Err(e),
        }

        let users: Arc<dyn CredentialStore> = Arc::new(PgCredentialStore::new(db.clone()));

        let sessions: Arc<dyn SessionStore> = match config.session_backend {
            SessionBackend::Postgres => {
                tracing::info!("✅ Sessions stored in PostgreSQL");
                Arc::new(PgSessionStore::new(db))
            }
            SessionBackend::Redis => {
                let redis_client = redis::Client::open(config.redis_url.as_str())?;
                let redis = ConnectionManager::new(redis_client).await?;
                tracing::info!("✅ Sessions stored in Redis (connection manager)");
                Arc::new(RedisSessionStore::new(redis))
            }
        };

        Ok(Self::from_stores(config.clone(), users, sessions))
    }

    /// Creates an `AppState` over already-built stores.
    pub fn from_stores(
        config: Config,
        users: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let authenticator = Authenticator::new(users.clone());
        let sessions = SessionManager::new(sessions, config.session_ttl);

        Self {
            config,
            users,
            authenticator,
            sessions,
        }
    }
}
