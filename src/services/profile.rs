use crate::error::{AppError, Result};
use crate::models::{profile::Profile, session::Session};
use crate::repositories::user::CredentialStore;

/// Resolves the owner of a validated session.
///
/// A session whose user has since disappeared is `AppError::ProfileNotFound`,
/// not `Unauthenticated`: the caller did authenticate.
pub async fn load_profile(users: &dyn CredentialStore, session: &Session) -> Result<Profile> {
    let user = users
        .find_user_by_id(&session.user_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!("❌ Session owner {} no longer exists", session.user_id);
            AppError::ProfileNotFound
        })?;

    Ok(Profile {
        name: user.name,
        login: user.login,
        logged_in_at: session.created_at,
        session_id: session.session_id.clone(),
    })
}
