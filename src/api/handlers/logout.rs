use axum::{
    Extension,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::{error::AuthError, session::CurrentUser, state::AuthState};

#[derive(ToSchema, Deserialize, Debug)]
pub struct LogoutRequest {
    #[serde(rename = "refreshToken")]
    pub refresh_token: Option<String>,
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    request_body = LogoutRequest,
    responses(
        (status = 200, description = "Session revoked"),
        (status = 401, description = "Not authenticated"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip(state, current, payload))]
pub async fn logout(
    state: Extension<Arc<AuthState>>,
    current: Extension<CurrentUser>,
    payload: Option<Json<LogoutRequest>>,
) -> Result<Response, AuthError> {
    let now = Utc::now().timestamp();

    // Both tokens go on the blacklist for their remaining life; expiries are
    // read without signature verification since the values only bound TTLs.
    state
        .store()
        .blacklist(
            &current.token,
            current.claims.remaining_ttl_seconds(now),
        )
        .await;

    if let Some(refresh_token) = payload.and_then(|Json(body)| body.refresh_token) {
        if let Ok(claims) = state.tokens().decode_unsafe(&refresh_token) {
            state
                .store()
                .blacklist(&refresh_token, claims.remaining_ttl_seconds(now))
                .await;
        }
    }

    Ok(Json(json!({
        "success": true,
        "message": "Logout successful",
    }))
    .into_response())
}
