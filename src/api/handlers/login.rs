use axum::{
    Extension,
    extract::ConnectInfo,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::{
    admission::{client_ip, lockout, user_agent},
    audit::{SecurityEvent, SecurityEventKind},
    directory::DirectoryError,
    error::AuthError,
    state::AuthState,
};

#[derive(ToSchema, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful"),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Account locked after repeated failures"),
    ),
    tag = "auth"
)]
#[instrument(skip(state, headers, peer, payload))]
pub async fn login(
    state: Extension<Arc<AuthState>>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(payload)) = payload else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "message": "Missing payload"})),
        )
            .into_response());
    };

    let email = payload.email.trim().to_lowercase();
    let ip = client_ip(&headers, peer.map(|info| info.0));
    let gate = lockout::Lockout::new(state.store().as_ref(), state.limits());
    let credential_key = lockout::credential_key(&email);

    // The admission pipeline already checked the IP key; the credential key
    // covers attackers rotating addresses against one account.
    if let Err(err) = gate.check(&credential_key).await {
        state.audit().record(
            SecurityEvent::new(SecurityEventKind::BruteForceDetected, &ip)
                .with_user_agent(user_agent(&headers))
                .with_path("/auth/login"),
        );
        return Err(err);
    }

    let principal = match state.directory().authenticate(&email, &payload.password).await {
        Ok(principal) => principal,
        Err(DirectoryError::Unavailable(_)) => return Err(AuthError::Internal),
        Err(DirectoryError::AlreadyExists) => return Err(AuthError::Internal),
    };

    let Some(principal) = principal else {
        gate.record_failure(&credential_key).await;
        gate.record_failure(&lockout::ip_key(&ip)).await;
        return Ok((
            StatusCode::UNAUTHORIZED,
            Json(json!({"success": false, "message": "Invalid credentials"})),
        )
            .into_response());
    };

    if !principal.is_active {
        return Err(AuthError::AccountDisabled);
    }

    gate.reset(&credential_key).await;
    gate.reset(&lockout::ip_key(&ip)).await;

    let access_token = state
        .tokens()
        .issue_access(principal.id)
        .map_err(|_| AuthError::Internal)?;
    let refresh_token = state
        .tokens()
        .issue_refresh(principal.id)
        .map_err(|_| AuthError::Internal)?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "message": "Login successful",
            "data": {
                "user": principal,
                "accessToken": access_token,
                "refreshToken": refresh_token,
            },
        })),
    )
        .into_response())
}
