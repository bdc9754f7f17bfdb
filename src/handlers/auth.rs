use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use tower_cookies::cookie::{time::Duration, SameSite};
use tower_cookies::{Cookie, Cookies};
use zeroize::ZeroizeOnDrop;

use crate::{
    config::Config,
    error::{AppError, Result},
    middleware_layer::auth::{extract_session_token, SESSION_COOKIE},
    models::session::Session,
    services::profile::load_profile,
    state::AppState,
};

/// The request payload for user login.
///
/// Fields are optional so that a missing field is reported as a validation
/// error rather than a deserialization failure. Emptiness and length bounds
/// are checked by `Authenticator::authenticate`.
#[derive(Deserialize, Validate, ZeroizeOnDrop)]
pub struct LoginRequest {
    #[garde(required)]
    pub login: Option<String>,
    #[garde(required)]
    pub password: Option<String>,
}

/// The response payload for a successful login.
#[derive(Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub session_id: String,
}

/// The response payload for a logout.
#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

/// The response payload for the profile of the current session.
#[derive(Serialize)]
pub struct ProfileResponse {
    pub name: String,
    pub login: String,
    pub hostname: String,
    pub logged_in_at: DateTime<Utc>,
    pub session_id: String,
}

/// Creates the session cookie: HTTP-only, `SameSite=Lax`, site-wide, living as long as the session.
fn session_cookie(config: &Config, ttl: chrono::Duration, session_id: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, session_id);

    cookie.set_http_only(true);
    if config.secure_cookies {
        cookie.set_secure(true);
    }
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(Duration::seconds(ttl.num_seconds()));
    cookie.set_path("/");

    cookie
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload?;
    payload.validate()?;

    let (Some(login), Some(password)) = (payload.login.as_deref(), payload.password.as_deref()) else {
        return Err(AppError::Validation("Login and password are required".to_string()));
    };
    tracing::info!("🔐 Login attempt for: {}", login);

    let user_id = state.authenticator.authenticate(login, password).await?;
    let session_id = state.sessions.create(user_id).await?;

    cookies.add(session_cookie(
        &state.config,
        state.sessions.ttl(),
        session_id.clone(),
    ));
    tracing::info!("✅ User logged in: {}", user_id);

    let response = LoginResponse {
        success: true,
        session_id,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles the profile of the current session. Runs behind `require_auth`.
#[axum::debug_handler]
pub async fn profile(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response> {
    let profile = load_profile(state.users.as_ref(), &session).await?;

    let response = ProfileResponse {
        name: profile.name,
        login: profile.login,
        hostname: state.config.server_name.clone(),
        logged_in_at: profile.logged_in_at,
        session_id: profile.session_id,
    };

    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles user logout.
///
/// The cookie is cleared whether or not a session existed; only a store
/// failure makes this fail.
#[axum::debug_handler]
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Result<Response> {
    let token = extract_session_token(&cookies);

    let mut session_cookie = Cookie::new(SESSION_COOKIE, "");
    session_cookie.set_path("/");
    cookies.remove(session_cookie);

    state.sessions.revoke(token.as_deref()).await?;
    tracing::info!("👋 Logout completed");

    Ok((StatusCode::OK, Json(LogoutResponse { success: true })).into_response())
}
