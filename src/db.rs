use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;
use crate::config::Config as AppConfig;
use crate::error::{AppError, Result};
use std::future::Future;
use std::time::Duration;

/// Schema applied at startup. Every statement is idempotent.
const SCHEMA: &str = include_str!("../migrations/001_sessions.sql");

/// Creates a new database connection pool.
///
/// # Arguments
///
/// * `config` - The application's configuration.
///
/// # Returns
///
/// A `Result` containing the `Pool`. No connection is opened yet.
pub fn create_pool(config: &AppConfig) -> Result<Pool> {
    let mut cfg = Config::new();
    let pg_config: tokio_postgres::Config = config.database_url.parse()?;

    if let Some(host) = pg_config.get_hosts().first() {
        match host {
            tokio_postgres::config::Host::Tcp(hostname) => cfg.host = Some(hostname.clone()),
            #[cfg(unix)]
            tokio_postgres::config::Host::Unix(path) => {
                cfg.host = Some(path.to_string_lossy().into_owned())
            }
        }
    }

    if let Some(port) = pg_config.get_ports().first() {
        cfg.port = Some(*port);
    }

    if let Some(dbname) = pg_config.get_dbname() {
        cfg.dbname = Some(dbname.to_string());
    }

    if let Some(user) = pg_config.get_user() {
        cfg.user = Some(user.to_string());
    }

    if let Some(password) = pg_config.get_password() {
        cfg.password = Some(String::from_utf8_lossy(password).to_string());
    }

    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    cfg.pool = Some(PoolConfig {
        max_size: config.db_pool_max_size,
        timeouts: deadpool_postgres::Timeouts {
            wait: Some(config.db_pool_timeout),
            create: Some(Duration::from_secs(2)),
            recycle: Some(Duration::from_secs(1)),
        },
        ..Default::default()
    });

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| AppError::Internal(format!("Failed to create pool: {}", e)))
}

/// Creates the `users` and `sessions` tables if they do not exist.
pub async fn ensure_schema(pool: &Pool) -> Result<()> {
    let client = pool.get().await?;
    client.batch_execute(SCHEMA).await?;
    tracing::info!("✅ Database schema verified");
    Ok(())
}

/// Applies the schema, retrying until the database accepts connections.
pub async fn ensure_schema_eventually(pool: &Pool) -> Result<()> {
    retry_while_unavailable(
        || ensure_schema(pool),
        Duration::from_secs(1),
        Duration::from_secs(30),
    )
    .await
}

/// Runs `op` until it stops failing with `StoreUnavailable`.
///
/// The delay between attempts starts at `initial_delay` and doubles up to
/// `max_delay`. Any other error ends the loop and is returned.
pub async fn retry_while_unavailable<F, Fut>(
    mut op: F,
    initial_delay: Duration,
    max_delay: Duration,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut delay = initial_delay;
    let mut attempt: u32 = 1;

    loop {
        match op().await {
            Err(AppError::StoreUnavailable(e)) => {
                tracing::warn!(
                    "⚠️ Database unreachable (attempt {}), retrying in {:?}: {}",
                    attempt,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(max_delay);
                attempt += 1;
            }
            other => return other,
        }
    }
}
