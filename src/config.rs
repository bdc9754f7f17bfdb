use std::{env, net::SocketAddr, time::Duration};
use anyhow::{Context, Result};

/// Default lifetime of a session, in seconds.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 3600;
/// Default interval between sweeps of expired sessions, in seconds.
pub const DEFAULT_REAPER_INTERVAL_SECS: u64 = 3600;

/// Where session rows are kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionBackend {
    Postgres,
    Redis,
}

/// The application's configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// PostgreSQL connection string (URL or key/value form).
    pub database_url: String,
    /// Maximum number of pooled database connections.
    pub db_pool_max_size: usize,
    /// How long an operation waits for a pooled connection.
    pub db_pool_timeout: Duration,
    /// Which store holds sessions.
    pub session_backend: SessionBackend,
    /// The URL of the Redis server.
    pub redis_url: String,
    /// Lifetime of a session from creation.
    pub session_ttl: chrono::Duration,
    /// Interval of the expired-session sweeper. `None` disables it.
    pub reaper_interval: Option<Duration>,
    /// Whether cookies carry the `Secure` attribute.
    pub secure_cookies: bool,
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Name this instance reports in profile and health responses.
    pub server_name: String,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Creates a new `Config` from an arbitrary key lookup.
    ///
    /// # Arguments
    ///
    /// * `lookup` - Returns the value of a configuration key, if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = match lookup("DATABASE_URL") {
            Some(url) => url,
            None => database_url_from_parts(&lookup)?,
        };

        let session_backend = match lookup("SESSION_BACKEND").as_deref() {
            None | Some("postgres") => SessionBackend::Postgres,
            Some("redis") => SessionBackend::Redis,
            Some(other) => anyhow::bail!("Unknown SESSION_BACKEND: {} (expected postgres or redis)", other),
        };

        let ttl_secs = lookup("SESSION_TTL_SECS")
            .map(|v| v.parse::<i64>())
            .transpose()
            .context("Invalid SESSION_TTL_SECS")?
            .unwrap_or(DEFAULT_SESSION_TTL_SECS);
        if ttl_secs <= 0 {
            anyhow::bail!("SESSION_TTL_SECS must be greater than zero");
        }

        let reaper_secs = lookup("SESSION_REAPER_INTERVAL_SECS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("Invalid SESSION_REAPER_INTERVAL_SECS")?
            .unwrap_or(DEFAULT_REAPER_INTERVAL_SECS);

        let server_name = match lookup("SERVER_NAME") {
            Some(name) => name,
            None => hostname::get()
                .context("Failed to read the system hostname")?
                .to_string_lossy()
                .into_owned(),
        };

        Ok(Self {
            database_url,
            db_pool_max_size: lookup("DB_POOL_MAX_SIZE")
                .unwrap_or_else(|| "16".to_string())
                .parse::<usize>()
                .context("Invalid DB_POOL_MAX_SIZE")?,
            db_pool_timeout: Duration::from_secs(
                lookup("DB_POOL_TIMEOUT_SECS")
                    .unwrap_or_else(|| "5".to_string())
                    .parse::<u64>()
                    .context("Invalid DB_POOL_TIMEOUT_SECS")?,
            ),
            session_backend,
            redis_url: lookup("REDIS_URL")
                .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            session_ttl: chrono::Duration::seconds(ttl_secs),
            reaper_interval: (reaper_secs > 0).then(|| Duration::from_secs(reaper_secs)),
            secure_cookies: lookup("APP_ENV").as_deref() == Some("production"),
            bind_addr: lookup("BIND_ADDR")
                .unwrap_or_else(|| "0.0.0.0:5000".to_string())
                .parse::<SocketAddr>()
                .context("Invalid BIND_ADDR")?,
            server_name,
        })
    }
}

/// Builds a key/value connection string from the individual `DB_*` variables.
fn database_url_from_parts<F>(lookup: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let host = lookup("DB_HOST").context("DATABASE_URL or DB_HOST must be set")?;
    let port = lookup("DB_PORT").unwrap_or_else(|| "5432".to_string());
    port.parse::<u16>().context("Invalid DB_PORT")?;
    let dbname = lookup("DB_NAME").context("DB_NAME must be set when DATABASE_URL is not")?;
    let user = lookup("DB_USER").context("DB_USER must be set when DATABASE_URL is not")?;

    let mut url = format!(
        "host={} port={} dbname={} user={}",
        quote(&host),
        port,
        quote(&dbname),
        quote(&user)
    );
    if let Some(password) = lookup("DB_PASSWORD") {
        url.push_str(" password=");
        url.push_str(&quote(&password));
    }
    Ok(url)
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}
