use chrono::{DateTime, Utc};
use serde::Serialize;

/// What a logged-in user sees about themselves and their session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub name: String,
    pub login: String,
    /// When the current session was created.
    pub logged_in_at: DateTime<Utc>,
    pub session_id: String,
}
