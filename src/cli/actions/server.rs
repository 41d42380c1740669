use crate::{
    api,
    audit::TracingAuditSink,
    cli::actions::ServerArgs,
    directory::PgDirectory,
    revocation::RedisStore,
    state::AuthState,
    token::{TokenConfig, TokenService},
};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use url::Url;

/// Wire up the server action and run it until shutdown.
pub async fn execute(args: ServerArgs) -> Result<()> {
    let dsn = Url::parse(&args.dsn).context("Invalid database DSN")?;
    let redis_url = Url::parse(&args.redis_url).context("Invalid Redis URL")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(dsn.as_str())
        .await
        .context("Failed to connect to Postgres")?;

    let store = RedisStore::connect(redis_url.as_str())
        .await
        .context("Failed to connect to Redis")?;

    let config = TokenConfig::new(args.access_secret, args.refresh_secret)
        .with_access_ttl_seconds(args.access_ttl_seconds)
        .with_refresh_ttl_seconds(args.refresh_ttl_seconds)
        .with_issuer(args.issuer)
        .with_audience(args.audience);

    let tokens = TokenService::new(config)?;

    info!("Starting server on port {}", args.port);

    let state = Arc::new(AuthState::new(
        tokens,
        Arc::new(store),
        Arc::new(PgDirectory::new(pool)),
        Arc::new(TracingAuditSink),
        args.limits,
    ));

    api::new(args.port, state).await
}
