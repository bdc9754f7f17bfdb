use crate::error::{AppError, Result};

/// Upper bound on a login name, in bytes.
pub const MAX_LOGIN_LEN: usize = 255;
/// Upper bound on a password, in bytes. Keeps Argon2 input bounded.
pub const MAX_PASSWORD_LEN: usize = 1024;
/// Upper bound on a presented session token, in bytes.
pub const MAX_SESSION_TOKEN_LEN: usize = 256;

/// Validates a login/password pair before any lookup happens.
///
/// # Arguments
///
/// * `login` - The submitted login name.
/// * `password` - The submitted password.
///
/// # Returns
///
/// A `Result<()>`; empty or oversized input is a `Validation` error.
pub fn validate_credentials(login: &str, password: &str) -> Result<()> {
    if login.is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Login and password are required".to_string(),
        ));
    }

    if login.len() > MAX_LOGIN_LEN {
        return Err(AppError::Validation(format!(
            "Login must be at most {} characters",
            MAX_LOGIN_LEN
        )));
    }

    if password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at most {} characters",
            MAX_PASSWORD_LEN
        )));
    }

    Ok(())
}

/// Normalizes a presented session token.
///
/// Returns `None` for anything that cannot possibly be a session token, so
/// callers can reject it without a store round trip.
pub fn presented_token(token: Option<&str>) -> Option<&str> {
    token.filter(|t| !t.is_empty() && t.len() <= MAX_SESSION_TOKEN_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fields_are_rejected() {
        assert!(matches!(validate_credentials("", "pw"), Err(AppError::Validation(_))));
        assert!(matches!(validate_credentials("alice", ""), Err(AppError::Validation(_))));
        assert!(validate_credentials("alice", "pw").is_ok());
    }

    #[test]
    fn oversized_fields_are_rejected() {
        let long = "a".repeat(MAX_PASSWORD_LEN + 1);
        assert!(validate_credentials(&long[..MAX_LOGIN_LEN + 1], "pw").is_err());
        assert!(validate_credentials("alice", &long).is_err());
    }

    #[test]
    fn presented_token_filters_impossible_values() {
        assert_eq!(presented_token(None), None);
        assert_eq!(presented_token(Some("")), None);
        assert_eq!(presented_token(Some(&"x".repeat(MAX_SESSION_TOKEN_LEN + 1))), None);
        assert_eq!(presented_token(Some("abc")), Some("abc"));
    }
}
