//! Admission pipeline: the ordered gates every request passes before routing.
//!
//! Order is general rate limit, auth rate limit, progressive slow-down, then
//! brute-force lockout. Diagnostic paths bypass all gates. Every gate reads
//! its counters from the revocation store, so the pipeline inherits the
//! store's fail-open behavior: an unreachable store admits traffic.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Extension,
    extract::{ConnectInfo, Request},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{
    audit::{SecurityEvent, SecurityEventKind},
    state::AuthState,
};

pub mod lockout;
pub mod rate_limit;
pub mod slow_down;

const DEFAULT_GENERAL_WINDOW_SECONDS: u64 = 15 * 60;
const DEFAULT_GENERAL_MAX: i64 = 100;
const DEFAULT_AUTH_WINDOW_SECONDS: u64 = 15 * 60;
const DEFAULT_AUTH_MAX: i64 = 5;
const DEFAULT_SLOW_DOWN_AFTER: i64 = 50;
const DEFAULT_SLOW_DOWN_STEP_MS: u64 = 500;
const DEFAULT_SLOW_DOWN_CAP_MS: u64 = 20_000;
const DEFAULT_LOCKOUT_FREE_RETRIES: i64 = 5;
const DEFAULT_LOCKOUT_MIN_WAIT_SECONDS: u64 = 5 * 60;
const DEFAULT_LOCKOUT_MAX_WAIT_SECONDS: u64 = 60 * 60;
const DEFAULT_LOCKOUT_LIFETIME_SECONDS: u64 = 24 * 60 * 60;

/// Paths that bypass every gate so diagnostics keep answering under abuse.
const ALLOWLIST: [&str; 2] = ["/health", "/api-docs"];

/// Knobs for every gate in the pipeline.
#[derive(Clone, Debug)]
pub struct AdmissionConfig {
    pub general_window: Duration,
    pub general_max: i64,
    pub auth_window: Duration,
    pub auth_max: i64,
    pub slow_down_after: i64,
    pub slow_down_step: Duration,
    pub slow_down_cap: Duration,
    pub lockout_free_retries: i64,
    pub lockout_min_wait: Duration,
    pub lockout_max_wait: Duration,
    pub lockout_lifetime: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            general_window: Duration::from_secs(DEFAULT_GENERAL_WINDOW_SECONDS),
            general_max: DEFAULT_GENERAL_MAX,
            auth_window: Duration::from_secs(DEFAULT_AUTH_WINDOW_SECONDS),
            auth_max: DEFAULT_AUTH_MAX,
            slow_down_after: DEFAULT_SLOW_DOWN_AFTER,
            slow_down_step: Duration::from_millis(DEFAULT_SLOW_DOWN_STEP_MS),
            slow_down_cap: Duration::from_millis(DEFAULT_SLOW_DOWN_CAP_MS),
            lockout_free_retries: DEFAULT_LOCKOUT_FREE_RETRIES,
            lockout_min_wait: Duration::from_secs(DEFAULT_LOCKOUT_MIN_WAIT_SECONDS),
            lockout_max_wait: Duration::from_secs(DEFAULT_LOCKOUT_MAX_WAIT_SECONDS),
            lockout_lifetime: Duration::from_secs(DEFAULT_LOCKOUT_LIFETIME_SECONDS),
        }
    }
}

impl AdmissionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_general_limit(mut self, window: Duration, max: i64) -> Self {
        self.general_window = window;
        self.general_max = max;
        self
    }

    #[must_use]
    pub fn with_auth_limit(mut self, window: Duration, max: i64) -> Self {
        self.auth_window = window;
        self.auth_max = max;
        self
    }

    #[must_use]
    pub fn with_slow_down(mut self, after: i64, step: Duration, cap: Duration) -> Self {
        self.slow_down_after = after;
        self.slow_down_step = step;
        self.slow_down_cap = cap;
        self
    }

    #[must_use]
    pub fn with_lockout(
        mut self,
        free_retries: i64,
        min_wait: Duration,
        max_wait: Duration,
        lifetime: Duration,
    ) -> Self {
        self.lockout_free_retries = free_retries;
        self.lockout_min_wait = min_wait;
        self.lockout_max_wait = max_wait;
        self.lockout_lifetime = lifetime;
        self
    }
}

/// Requester address: proxy headers first, then the peer socket address.
///
/// Direct clients without a proxy in front must not share one bucket, so the
/// connection's own address is the fallback before the last-resort literal.
#[must_use]
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
    {
        return real_ip.to_string();
    }

    peer.map_or_else(|| "unknown".to_string(), |addr| addr.ip().to_string())
}

/// Peer socket address, present when the router is served with connect info.
#[must_use]
pub fn peer_addr(request: &Request) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0)
}

#[must_use]
pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

fn is_allowlisted(path: &str) -> bool {
    ALLOWLIST.iter().any(|prefix| path.starts_with(prefix))
}

fn is_auth_path(path: &str) -> bool {
    path.starts_with("/auth")
}

fn is_credential_path(path: &str) -> bool {
    path == "/auth/login" || path == "/auth/register"
}

/// The pipeline itself, applied router-wide via `middleware::from_fn`.
pub async fn gate(
    Extension(state): Extension<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if is_allowlisted(&path) {
        return next.run(request).await;
    }

    let ip = client_ip(request.headers(), peer_addr(&request));
    let agent = user_agent(request.headers());
    let store = state.store().as_ref();
    let limits = state.limits();

    if let Err(err) = rate_limit::check_general(store, limits, &ip).await {
        state.audit().record(
            SecurityEvent::new(SecurityEventKind::RateLimitExceeded, &ip)
                .with_user_agent(agent)
                .with_path(&path),
        );
        return err.into_response();
    }

    if is_auth_path(&path) {
        if let Err(err) = rate_limit::check_auth(store, limits, &ip).await {
            state.audit().record(
                SecurityEvent::new(SecurityEventKind::AuthRateLimitExceeded, &ip)
                    .with_user_agent(agent)
                    .with_path(&path),
            );
            return err.into_response();
        }
    }

    if let Some(delay) = slow_down::delay_for(store, limits, &ip).await {
        tokio::time::sleep(delay).await;
    }

    if is_credential_path(&path) {
        let gate = lockout::Lockout::new(store, limits);
        if let Err(err) = gate.check(&lockout::ip_key(&ip)).await {
            state.audit().record(
                SecurityEvent::new(SecurityEventKind::BruteForceDetected, &ip)
                    .with_user_agent(agent)
                    .with_path(&path),
            );
            return err.into_response();
        }
    }

    next.run(request).await
}
