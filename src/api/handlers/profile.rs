use axum::{
    Extension,
    response::{IntoResponse, Json},
};
use serde_json::json;
use tracing::instrument;

use crate::session::CurrentUser;

#[utoipa::path(
    get,
    path = "/auth/profile",
    responses(
        (status = 200, description = "Authenticated principal", body = crate::directory::Principal),
        (status = 401, description = "Not authenticated"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip(current))]
pub async fn profile(current: Extension<CurrentUser>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "data": {
            "user": current.principal,
        },
    }))
}
