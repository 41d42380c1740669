//! Brute-force lockout keyed by credential or requester IP.
//!
//! Failures accumulate in a store counter that lives for the configured
//! lifetime. Past the free retries, each further failure locks the key for a
//! doubling wait, bounded by the max wait. A successful login consumes the
//! record entirely.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::{error::AuthError, revocation::RevocationStore};

use super::AdmissionConfig;

const COUNT_PREFIX: &str = "lockout:count:";
const UNTIL_PREFIX: &str = "lockout:until:";

/// Lockout key for anonymous pre-checks in the admission pipeline.
#[must_use]
pub fn ip_key(ip: &str) -> String {
    format!("auth:{ip}")
}

/// Lockout key for a known credential; preferred over the IP key so an
/// attacker rotating addresses still locks the targeted account.
#[must_use]
pub fn credential_key(email: &str) -> String {
    format!("user:{}", email.to_lowercase())
}

pub struct Lockout<'a> {
    store: &'a dyn RevocationStore,
    config: &'a AdmissionConfig,
}

impl<'a> Lockout<'a> {
    #[must_use]
    pub fn new(store: &'a dyn RevocationStore, config: &'a AdmissionConfig) -> Self {
        Self { store, config }
    }

    /// Reject while the key is inside a lockout window.
    ///
    /// # Errors
    /// `AuthError::Locked` carrying the next valid request time.
    pub async fn check(&self, key: &str) -> Result<(), AuthError> {
        let Some(until_ts) = self.store.get(&format!("{UNTIL_PREFIX}{key}")).await else {
            return Ok(());
        };

        if until_ts <= Utc::now().timestamp() {
            return Ok(());
        }

        let next_valid_request =
            DateTime::from_timestamp(until_ts, 0).unwrap_or_else(Utc::now);
        Err(AuthError::Locked { next_valid_request })
    }

    /// Count a failed attempt; returns the lockout deadline once the key has
    /// exhausted its free retries. With N free retries the Nth failure sets
    /// the first lock, so the request after it is rejected.
    pub async fn record_failure(&self, key: &str) -> Option<DateTime<Utc>> {
        let count = self
            .store
            .increment(&format!("{COUNT_PREFIX}{key}"), self.config.lockout_lifetime)
            .await;
        if count == 0 {
            // Store unavailable; nothing to anchor a lockout on.
            return None;
        }

        if count < self.config.lockout_free_retries {
            return None;
        }

        let exponent = u32::try_from(count - self.config.lockout_free_retries).unwrap_or(u32::MAX);
        let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
        let wait = self
            .config
            .lockout_min_wait
            .saturating_mul(factor)
            .min(self.config.lockout_max_wait);

        let until = Utc::now() + chrono::Duration::from_std(wait).unwrap_or_default();
        self.store
            .set(&format!("{UNTIL_PREFIX}{key}"), until.timestamp(), wait)
            .await;
        Some(until)
    }

    /// Forget the key's failure history, e.g. after a successful login.
    pub async fn reset(&self, key: &str) {
        self.store.delete(&format!("{COUNT_PREFIX}{key}")).await;
        self.store.delete(&format!("{UNTIL_PREFIX}{key}")).await;
    }
}
