//! Audit sink for security-relevant rejections.
//!
//! Fire-and-forget: recording never fails the request. Events carry the
//! requester IP, user-agent, and at most a truncated token fingerprint;
//! the full token value is never logged.

use std::sync::Mutex;
use tracing::warn;

const FINGERPRINT_LEN: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SecurityEventKind {
    BlacklistedTokenAccess,
    BlacklistedRefreshToken,
    InvalidTokenAccess,
    RateLimitExceeded,
    AuthRateLimitExceeded,
    BruteForceDetected,
}

impl SecurityEventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BlacklistedTokenAccess => "BLACKLISTED_TOKEN_ACCESS",
            Self::BlacklistedRefreshToken => "BLACKLISTED_REFRESH_TOKEN",
            Self::InvalidTokenAccess => "INVALID_TOKEN_ACCESS",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::AuthRateLimitExceeded => "AUTH_RATE_LIMIT_EXCEEDED",
            Self::BruteForceDetected => "BRUTE_FORCE_DETECTED",
        }
    }
}

#[derive(Clone, Debug)]
pub struct SecurityEvent {
    pub kind: SecurityEventKind,
    pub ip: String,
    pub user_agent: Option<String>,
    pub token_fingerprint: Option<String>,
    pub path: Option<String>,
}

impl SecurityEvent {
    #[must_use]
    pub fn new(kind: SecurityEventKind, ip: &str) -> Self {
        Self {
            kind,
            ip: ip.to_string(),
            user_agent: None,
            token_fingerprint: None,
            path: None,
        }
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Attach a truncated token prefix, never the full value.
    #[must_use]
    pub fn with_token(mut self, token: &str) -> Self {
        let prefix: String = token.chars().take(FINGERPRINT_LEN).collect();
        self.token_fingerprint = Some(format!("{prefix}..."));
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: SecurityEvent);
}

/// Production sink: structured warn-level tracing events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: SecurityEvent) {
        warn!(
            event = event.kind.as_str(),
            ip = %event.ip,
            user_agent = event.user_agent.as_deref().unwrap_or("-"),
            token = event.token_fingerprint.as_deref().unwrap_or("-"),
            path = event.path.as_deref().unwrap_or("-"),
            "security event"
        );
    }
}

/// Test sink collecting events for assertions.
#[derive(Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<SecurityEvent>>,
}

impl RecordingAuditSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, event: SecurityEvent) {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event);
    }
}
