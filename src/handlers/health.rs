use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub hostname: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

/// Reports whether both stores are reachable from this instance.
pub async fn health(State(state): State<AppState>) -> Response {
    let checked = async {
        state.users.ping().await?;
        state.sessions.ping().await
    }
    .await;

    match checked {
        Ok(()) => {
            let body = HealthResponse {
                status: "ok",
                hostname: state.config.server_name.clone(),
                timestamp: Some(Utc::now()),
                error: None,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            tracing::error!("❌ Health check failed: {}", e);
            let body = HealthResponse {
                status: "error",
                hostname: state.config.server_name.clone(),
                timestamp: None,
                error: Some("Store unavailable"),
            };
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}
