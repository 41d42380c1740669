//! Shared application state threaded through the router as an extension.

use std::sync::Arc;

use crate::{
    admission::AdmissionConfig, audit::AuditSink, directory::UserDirectory,
    revocation::RevocationStore, token::TokenService,
};

/// Everything the handlers and middleware need, wired once at startup.
///
/// The store, directory, and audit sink are trait objects so tests can run the
/// full router against in-memory fakes.
pub struct AuthState {
    tokens: TokenService,
    store: Arc<dyn RevocationStore>,
    directory: Arc<dyn UserDirectory>,
    audit: Arc<dyn AuditSink>,
    limits: AdmissionConfig,
}

impl AuthState {
    #[must_use]
    pub fn new(
        tokens: TokenService,
        store: Arc<dyn RevocationStore>,
        directory: Arc<dyn UserDirectory>,
        audit: Arc<dyn AuditSink>,
        limits: AdmissionConfig,
    ) -> Self {
        Self {
            tokens,
            store,
            directory,
            audit,
            limits,
        }
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn RevocationStore> {
        &self.store
    }

    #[must_use]
    pub fn directory(&self) -> &Arc<dyn UserDirectory> {
        &self.directory
    }

    #[must_use]
    pub fn audit(&self) -> &Arc<dyn AuditSink> {
        &self.audit
    }

    #[must_use]
    pub fn limits(&self) -> &AdmissionConfig {
        &self.limits
    }
}
