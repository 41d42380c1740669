//! HTTP surface: router assembly and the server loop.

use anyhow::Result;
use axum::{
    Extension, Router,
    body::Body,
    http::{HeaderValue, Request},
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, info_span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{admission, session, state::AuthState};

pub mod handlers;
pub mod openapi;

#[derive(Clone, Copy, Default)]
struct MakeRequestUlid;

impl MakeRequestId for MakeRequestUlid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let ulid = Ulid::new().to_string();
        ulid.parse::<HeaderValue>().ok().map(RequestId::new)
    }
}

/// Build the full application router around shared state.
///
/// Layer order matters: the request id is minted outermost so the trace span
/// can pick it up, state is injected before the admission gate runs, and the
/// gate wraps every route except the allowlisted diagnostics.
#[must_use]
pub fn router(state: Arc<AuthState>) -> Router {
    let protected = Router::new()
        .route("/auth/profile", get(handlers::profile))
        .route("/auth/logout", post(handlers::logout))
        .route_layer(middleware::from_fn(session::require_session));

    let open = Router::new()
        .route("/", get(handlers::root))
        .route_layer(middleware::from_fn(session::optional_session));

    Router::new()
        .merge(
            SwaggerUi::new("/api-docs")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
        .merge(open)
        .route("/health", get(handlers::health))
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUlid))
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get("x-request-id")
                            .and_then(|value| value.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        info_span!(
                            "request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id,
                        )
                    }),
                )
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(CorsLayer::permissive())
                .layer(Extension(state))
                .layer(middleware::from_fn(admission::gate)),
        )
}

/// Bind and serve until interrupted.
///
/// # Errors
/// Returns an error if binding or serving fails.
pub async fn new(port: u16, state: Arc<AuthState>) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on *:{port}");

    let app = router(state);

    // Connect info gives the admission gates a per-peer fallback key when no
    // proxy headers are present.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown())
    .await?;

    Ok(())
}

async fn shutdown() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {err}");
    }
}
