//! Fixed-window rate limiters backed by store counters.
//!
//! The window is anchored at the first request: `increment` sets the TTL only
//! when it creates the key, so the counter disappears `window` after the first
//! hit and the next request starts a fresh window.

use crate::{error::AuthError, revocation::RevocationStore};

use super::AdmissionConfig;

const GENERAL_PREFIX: &str = "ratelimit:ip:";
const AUTH_PREFIX: &str = "ratelimit:auth:";

// Rounds up so a sub-minute window never reports a zero retry hint.
fn window_minutes(window: std::time::Duration) -> u64 {
    window.as_secs().div_ceil(60)
}

/// Router-wide limiter applied to every non-allowlisted request.
///
/// # Errors
/// `AuthError::RateLimited` once the per-IP count exceeds the general max.
pub async fn check_general(
    store: &dyn RevocationStore,
    config: &AdmissionConfig,
    ip: &str,
) -> Result<(), AuthError> {
    let count = store
        .increment(&format!("{GENERAL_PREFIX}{ip}"), config.general_window)
        .await;
    if count > config.general_max {
        return Err(AuthError::RateLimited {
            retry_after_minutes: window_minutes(config.general_window),
        });
    }
    Ok(())
}

/// Stricter limiter for `/auth` paths, counted separately from the general one.
///
/// # Errors
/// `AuthError::AuthRateLimited` once the per-IP count exceeds the auth max.
pub async fn check_auth(
    store: &dyn RevocationStore,
    config: &AdmissionConfig,
    ip: &str,
) -> Result<(), AuthError> {
    let count = store
        .increment(&format!("{AUTH_PREFIX}{ip}"), config.auth_window)
        .await;
    if count > config.auth_max {
        return Err(AuthError::AuthRateLimited {
            retry_after_minutes: window_minutes(config.auth_window),
        });
    }
    Ok(())
}
