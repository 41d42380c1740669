use axum::{
    Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::{
    api::handlers::{valid_email, valid_password},
    directory::{DirectoryError, NewUser},
    error::AuthError,
    state::AuthState,
};

#[derive(ToSchema, Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful"),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email or username already registered"),
    ),
    tag = "auth"
)]
#[instrument(skip(state, payload))]
pub async fn register(
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(payload)) = payload else {
        return Ok(bad_request("Missing payload"));
    };

    if !valid_email(&payload.email) {
        return Ok(bad_request("Invalid email address"));
    }
    if !valid_password(&payload.password) {
        return Ok(bad_request("Password must be at least 8 characters"));
    }
    if payload.username.trim().is_empty() {
        return Ok(bad_request("Username must not be empty"));
    }

    let principal = match state
        .directory()
        .create(NewUser {
            email: payload.email.trim().to_lowercase(),
            username: payload.username.trim().to_string(),
            password: payload.password,
        })
        .await
    {
        Ok(principal) => principal,
        Err(DirectoryError::AlreadyExists) => {
            return Ok((
                StatusCode::CONFLICT,
                Json(json!({
                    "success": false,
                    "message": "User with this email or username already exists",
                })),
            )
                .into_response());
        }
        Err(DirectoryError::Unavailable(_)) => return Err(AuthError::Internal),
    };

    let access_token = state
        .tokens()
        .issue_access(principal.id)
        .map_err(|_| AuthError::Internal)?;
    let refresh_token = state
        .tokens()
        .issue_refresh(principal.id)
        .map_err(|_| AuthError::Internal)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "data": {
                "user": principal,
                "accessToken": access_token,
                "refreshToken": refresh_token,
            },
        })),
    )
        .into_response())
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "success": false,
            "message": message,
        })),
    )
        .into_response()
}
