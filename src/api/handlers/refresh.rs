use axum::{
    Extension,
    extract::ConnectInfo,
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::{error::AuthError, session::authenticate_refresh, state::AuthState};

#[derive(ToSchema, Deserialize, Debug)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    pub refresh_token: Option<String>,
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair issued"),
        (status = 401, description = "Refresh token missing, invalid, or expired"),
    ),
    tag = "auth"
)]
#[instrument(skip(state, headers, peer, payload))]
pub async fn refresh(
    state: Extension<Arc<AuthState>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    payload: Option<Json<RefreshRequest>>,
) -> Result<Response, AuthError> {
    let token = payload
        .and_then(|Json(body)| body.refresh_token)
        .ok_or(AuthError::MissingRefreshToken)?;

    let (principal, claims) =
        authenticate_refresh(&state, &token, &headers, peer.map(|info| info.0)).await?;

    // Rotation: the presented refresh token is spent. Blacklisting it for its
    // remaining life means a replay fails even though the signature verifies.
    state
        .store()
        .blacklist(&token, claims.remaining_ttl_seconds(Utc::now().timestamp()))
        .await;

    let access_token = state
        .tokens()
        .issue_access(principal.id)
        .map_err(|_| AuthError::Internal)?;
    let refresh_token = state
        .tokens()
        .issue_refresh(principal.id)
        .map_err(|_| AuthError::Internal)?;

    Ok(Json(json!({
        "success": true,
        "message": "Token refreshed successfully",
        "data": {
            "accessToken": access_token,
            "refreshToken": refresh_token,
        },
    }))
    .into_response())
}
