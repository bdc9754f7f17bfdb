use uuid::Uuid;

/// Represents a user in the system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    /// The unique identifier for the user.
    pub id: Uuid,
    /// The user's login name, unique and matched case-sensitively.
    pub login: String,
    /// The user's display name.
    pub name: String,
    /// The user's Argon2id hash in PHC string format.
    pub password_hash: String,
}
