//! In-process stores backed by `RwLock`ed maps.
//!
//! They honor the same contracts as the Postgres stores, including
//! rejecting duplicate logins and session IDs, and are used for tests and
//! local wiring.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{session::Session, user::User},
    repositories::{session::SessionStore, user::CredentialStore},
};

/// Users held in memory.
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user. Logins are unique across users.
    pub async fn insert_user(&self, user: User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.login == user.login && u.id != user.id) {
            return Err(AppError::Internal(format!("Login already taken: {}", user.login)));
        }
        users.insert(user.id, user);
        Ok(())
    }

    /// Removes a user, returning it if present.
    pub async fn remove_user(&self, user_id: &Uuid) -> Option<User> {
        self.users.write().await.remove(user_id)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.login == login).cloned())
    }

    async fn find_user_by_id(&self, user_id: &Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Sessions held in memory.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored, expired ones included.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Number of rows owned by `user_id`, expired ones included.
    pub async fn count_for_user(&self, user_id: &Uuid) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.user_id == *user_id)
            .count()
    }

    /// Whether a row with this ID exists, regardless of expiry.
    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert_session(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.session_id) {
            return Err(AppError::Internal("Session token collision".to_string()));
        }
        sessions.insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn find_active_session(&self, session_id: &str, now: DateTime<Utc>) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .filter(|s| s.is_active_at(now))
            .cloned())
    }

    async fn delete_session(&self, session_id: &str) -> Result<bool> {
        Ok(self.sessions.write().await.remove(session_id).is_some())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.is_active_at(now));
        Ok((before - sessions.len()) as u64)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
