use axum::{
    Extension,
    http::HeaderMap,
    response::{IntoResponse, Json},
};
use serde_json::json;
use std::sync::Arc;

use crate::{GIT_COMMIT_HASH, state::AuthState};

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health and build metadata"),
    ),
    tag = "health"
)]
// axum handler for health
pub async fn health(state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let store_up = state.store().ping().await;

    let body = Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "build": GIT_COMMIT_HASH,
        "store": if store_up { "up" } else { "down" },
    }));

    let short_hash = if GIT_COMMIT_HASH.len() > 7 {
        &GIT_COMMIT_HASH[0..7]
    } else {
        ""
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) = format!(
        "{}:{}:{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_hash
    )
    .parse()
    {
        headers.insert("X-App", value);
    }

    (headers, body)
}
