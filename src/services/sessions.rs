use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::crypto::token::{generate_session_token, token_prefix};
use crate::error::{AppError, Result};
use crate::models::session::Session;
use crate::repositories::session::SessionStore;
use crate::validation::auth::presented_token;

/// Creates, validates and revokes sessions. The only writer of the session store.
///
/// Expiry is passive: a session past `expires_at` stops validating but its
/// row stays until [`SessionManager::purge_expired`] or a revoke removes it.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl SessionManager {
    /// Creates a new `SessionManager`.
    ///
    /// # Arguments
    ///
    /// * `store` - Where session rows live.
    /// * `ttl` - Lifetime of each session. Must be positive.
    pub fn new(store: Arc<dyn SessionStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Lifetime of each session.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Starts a session for `user_id` and returns its token.
    pub async fn create(&self, user_id: Uuid) -> Result<String> {
        Ok(self.create_at(user_id, Utc::now()).await?.session_id)
    }

    /// Starts a session for `user_id` as of `now`.
    ///
    /// A token collision surfaces as a storage error; it is never retried.
    pub async fn create_at(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<Session> {
        let session = Session {
            session_id: generate_session_token(),
            user_id,
            created_at: now,
            expires_at: now + self.ttl,
        };

        self.store.insert_session(&session).await.map_err(|e| {
            tracing::error!("❌ Failed to persist session for user {}: {}", user_id, e);
            e
        })?;

        tracing::info!(
            "✅ Session created for user {}: {}...",
            user_id,
            token_prefix(&session.session_id)
        );
        Ok(session)
    }

    /// Resolves a presented token to its live session.
    pub async fn validate(&self, token: Option<&str>) -> Result<Session> {
        self.validate_at(token, Utc::now()).await
    }

    /// Resolves a presented token to a session live at `now`.
    ///
    /// Missing, unknown, revoked and expired tokens all yield
    /// `AppError::Unauthenticated`. Empty tokens never reach the store.
    pub async fn validate_at(&self, token: Option<&str>, now: DateTime<Utc>) -> Result<Session> {
        let Some(token) = presented_token(token) else {
            tracing::debug!("No session token presented");
            return Err(AppError::Unauthenticated);
        };

        match self.store.find_active_session(token, now).await? {
            Some(session) => {
                tracing::debug!("✅ Session valid for user: {}", session.user_id);
                Ok(session)
            }
            None => {
                tracing::debug!("❌ No live session for token {}...", token_prefix(token));
                Err(AppError::Unauthenticated)
            }
        }
    }

    /// Ends a session. Absent or already expired sessions are a no-op.
    pub async fn revoke(&self, token: Option<&str>) -> Result<()> {
        let Some(token) = presented_token(token) else {
            return Ok(());
        };

        if self.store.delete_session(token).await? {
            tracing::info!("✅ Session revoked: {}...", token_prefix(token));
        } else {
            tracing::debug!("Revoke of absent session {}...", token_prefix(token));
        }
        Ok(())
    }

    /// Deletes rows whose lifetime has passed. Returns how many were removed.
    pub async fn purge_expired(&self) -> Result<u64> {
        self.store.delete_expired(Utc::now()).await
    }

    /// Checks that the session store is reachable.
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::MemorySessionStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Forwards to a memory store and counts every call.
    #[derive(Default)]
    struct CountingStore {
        inner: MemorySessionStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SessionStore for CountingStore {
        async fn insert_session(&self, session: &Session) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.insert_session(session).await
        }

        async fn find_active_session(&self, session_id: &str, now: DateTime<Utc>) -> Result<Option<Session>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.find_active_session(session_id, now).await
        }

        async fn delete_session(&self, session_id: &str) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.delete_session(session_id).await
        }

        async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.delete_expired(now).await
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }
    }

    /// Fails every operation as if the database were down.
    struct DownStore;

    #[async_trait]
    impl SessionStore for DownStore {
        async fn insert_session(&self, _: &Session) -> Result<()> {
            Err(AppError::StoreUnavailable("connection refused".into()))
        }

        async fn find_active_session(&self, _: &str, _: DateTime<Utc>) -> Result<Option<Session>> {
            Err(AppError::StoreUnavailable("connection refused".into()))
        }

        async fn delete_session(&self, _: &str) -> Result<bool> {
            Err(AppError::StoreUnavailable("connection refused".into()))
        }

        async fn delete_expired(&self, _: DateTime<Utc>) -> Result<u64> {
            Err(AppError::StoreUnavailable("connection refused".into()))
        }

        async fn ping(&self) -> Result<()> {
            Err(AppError::StoreUnavailable("connection refused".into()))
        }
    }

    fn manager() -> (SessionManager, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new());
        (SessionManager::new(store.clone(), Duration::hours(1)), store)
    }

    #[tokio::test]
    async fn created_session_validates_for_its_owner() {
        let (sessions, _) = manager();
        let user_id = Uuid::new_v4();

        let token = sessions.create(user_id).await.unwrap();
        let session = sessions.validate(Some(&token)).await.unwrap();

        assert_eq!(session.user_id, user_id);
        assert_eq!(session.session_id, token);
        assert_eq!(session.expires_at - session.created_at, Duration::hours(1));
    }

    #[tokio::test]
    async fn expired_session_is_invalid_but_row_remains() {
        let (sessions, store) = manager();
        let now = Utc::now();
        let old = sessions.create_at(Uuid::new_v4(), now - Duration::hours(2)).await.unwrap();

        let err = sessions.validate_at(Some(&old.session_id), now).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
        assert!(store.contains(&old.session_id).await);
    }

    #[tokio::test]
    async fn validation_does_not_extend_lifetime() {
        let (sessions, _) = manager();
        let start = Utc::now();
        let session = sessions.create_at(Uuid::new_v4(), start).await.unwrap();

        let seen = sessions
            .validate_at(Some(&session.session_id), start + Duration::minutes(59))
            .await
            .unwrap();
        assert_eq!(seen.expires_at, session.expires_at);

        assert!(sessions
            .validate_at(Some(&session.session_id), session.expires_at)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn revoked_session_is_invalid_and_revoke_is_idempotent() {
        let (sessions, _) = manager();
        let token = sessions.create(Uuid::new_v4()).await.unwrap();

        sessions.revoke(Some(&token)).await.unwrap();
        assert!(matches!(
            sessions.validate(Some(&token)).await,
            Err(AppError::Unauthenticated)
        ));
        sessions.revoke(Some(&token)).await.unwrap();
    }

    #[tokio::test]
    async fn revoking_an_expired_session_is_a_no_op() {
        let (sessions, store) = manager();
        let old = sessions
            .create_at(Uuid::new_v4(), Utc::now() - Duration::hours(3))
            .await
            .unwrap();

        sessions.revoke(Some(&old.session_id)).await.unwrap();
        assert!(!store.contains(&old.session_id).await);
    }

    #[tokio::test]
    async fn unknown_and_expired_tokens_fail_identically() {
        let (sessions, _) = manager();
        let now = Utc::now();
        let old = sessions.create_at(Uuid::new_v4(), now - Duration::hours(2)).await.unwrap();

        let expired = sessions.validate_at(Some(&old.session_id), now).await.unwrap_err();
        let unknown = sessions.validate_at(Some("no-such-token"), now).await.unwrap_err();
        assert_eq!(expired.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn empty_tokens_never_reach_the_store() {
        let store = Arc::new(CountingStore::default());
        let sessions = SessionManager::new(store.clone(), Duration::hours(1));

        assert!(matches!(sessions.validate(Some("")).await, Err(AppError::Unauthenticated)));
        assert!(matches!(sessions.validate(None).await, Err(AppError::Unauthenticated)));
        sessions.revoke(None).await.unwrap();
        sessions.revoke(Some("")).await.unwrap();

        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn store_outage_is_not_reported_as_unauthenticated() {
        let sessions = SessionManager::new(Arc::new(DownStore), Duration::hours(1));

        assert!(matches!(
            sessions.validate(Some("token")).await,
            Err(AppError::StoreUnavailable(_))
        ));
        assert!(matches!(
            sessions.create(Uuid::new_v4()).await,
            Err(AppError::StoreUnavailable(_))
        ));
        assert!(matches!(
            sessions.revoke(Some("token")).await,
            Err(AppError::StoreUnavailable(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_yield_distinct_valid_tokens() {
        let (sessions, _) = manager();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

        let (a, b) = tokio::join!(sessions.create(alice), sessions.create(bob));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a, b);
        assert_eq!(sessions.validate(Some(&a)).await.unwrap().user_id, alice);
        assert_eq!(sessions.validate(Some(&b)).await.unwrap().user_id, bob);
    }

    #[tokio::test]
    async fn purge_removes_only_expired_rows() {
        let (sessions, store) = manager();
        let live = sessions.create(Uuid::new_v4()).await.unwrap();
        let old = sessions
            .create_at(Uuid::new_v4(), Utc::now() - Duration::hours(2))
            .await
            .unwrap();

        assert_eq!(sessions.purge_expired().await.unwrap(), 1);
        assert!(store.contains(&live).await);
        assert!(!store.contains(&old.session_id).await);
    }
}
