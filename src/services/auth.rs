use std::sync::Arc;

use once_cell::sync::Lazy;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::crypto::password::{hash_password, verify_password};
use crate::error::{AppError, Result};
use crate::repositories::user::CredentialStore;
use crate::validation::auth::validate_credentials;

/// Hash verified for unknown logins so they cost as much as a wrong password.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_password("keystone-dummy-password").ok());

/// Checks submitted credentials against the credential store.
#[derive(Clone)]
pub struct Authenticator {
    users: Arc<dyn CredentialStore>,
}

impl Authenticator {
    /// Creates a new `Authenticator` over the given store.
    pub fn new(users: Arc<dyn CredentialStore>) -> Self {
        Self { users }
    }

    /// Authenticates a user.
    ///
    /// # Arguments
    ///
    /// * `login` - The user's login name, matched exactly.
    /// * `password` - The user's password.
    ///
    /// # Returns
    ///
    /// The user's ID. Unknown logins and wrong passwords both fail with
    /// `AppError::InvalidCredentials`; empty input fails with
    /// `AppError::Validation` before the store is consulted.
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<Uuid> {
        validate_credentials(login, password)?;
        tracing::debug!("🔐 Authenticating user: {}", login);

        let user = self.users.find_user_by_login(login).await?;
        let password = Zeroizing::new(password.to_owned());

        let Some(user) = user else {
            tokio::task::spawn_blocking(move || {
                if let Some(dummy) = DUMMY_HASH.as_deref() {
                    let _ = verify_password(&password, dummy);
                }
            })
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?;

            tracing::warn!("❌ Login rejected for {}", login);
            return Err(AppError::InvalidCredentials);
        };

        let hash = user.password_hash.clone();
        let matched = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))??;

        if !matched {
            tracing::warn!("❌ Login rejected for {}", login);
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!("✅ User authenticated: {}", user.id);
        Ok(user.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::password::{cheap_params, hash_password_with};
    use crate::models::user::User;
    use crate::repositories::memory::MemoryCredentialStore;

    async fn authenticator_with_alice() -> (Authenticator, Uuid) {
        let store = MemoryCredentialStore::new();
        let id = Uuid::new_v4();
        store
            .insert_user(User {
                id,
                login: "alice".into(),
                name: "Alice".into(),
                password_hash: hash_password_with("correct", cheap_params()).unwrap(),
            })
            .await
            .unwrap();
        (Authenticator::new(Arc::new(store)), id)
    }

    #[tokio::test]
    async fn correct_password_yields_user_id() {
        let (auth, id) = authenticator_with_alice().await;
        assert_eq!(auth.authenticate("alice", "correct").await.unwrap(), id);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_login_look_the_same() {
        let (auth, _) = authenticator_with_alice().await;

        let wrong = auth.authenticate("alice", "incorrect").await.unwrap_err();
        let unknown = auth.authenticate("mallory", "correct").await.unwrap_err();

        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn login_match_is_case_sensitive() {
        let (auth, _) = authenticator_with_alice().await;
        assert!(matches!(
            auth.authenticate("Alice", "correct").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn empty_input_is_a_validation_error() {
        let (auth, _) = authenticator_with_alice().await;
        assert!(matches!(auth.authenticate("", "correct").await, Err(AppError::Validation(_))));
        assert!(matches!(auth.authenticate("alice", "").await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn corrupt_stored_hash_is_internal_not_a_match() {
        let store = MemoryCredentialStore::new();
        store
            .insert_user(User {
                id: Uuid::new_v4(),
                login: "bob".into(),
                name: "Bob".into(),
                password_hash: "not-a-phc-string".into(),
            })
            .await
            .unwrap();
        let auth = Authenticator::new(Arc::new(store));

        assert!(matches!(auth.authenticate("bob", "anything").await, Err(AppError::Internal(_))));
    }
}
