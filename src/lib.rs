//! # Tasca (Todo API, security core)
//!
//! `tasca` is a todo-list API whose core is the authentication and
//! session-security layer: JWT issuance and verification, refresh-token
//! rotation, a Redis-backed revocation store, and a layered admission
//! pipeline gating every protected endpoint.
//!
//! ## Token lifecycle
//!
//! Access tokens are short-lived (15 minutes by default); refresh tokens are
//! long-lived (7 days) and carry an explicit kind marker so they can never be
//! honored as access tokens. Logout blacklists both tokens for their remaining
//! validity, after which they are unusable even though they have not expired.
//!
//! ## Admission pipeline
//!
//! Requests pass through ordered gates before any handler runs: a general
//! per-IP rate limit, a stricter auth-path limit, a progressive slow-down, and
//! a brute-force lockout. Gate state lives in the revocation store, so no
//! in-process locks are needed across requests.
//!
//! ## Fail-open stores
//!
//! The revocation store is a cache, not the source of truth for token
//! validity. Store outages degrade to "not blacklisted" / "counter absent"
//! (logged), preserving availability over strict enforcement.

pub mod admission;
pub mod api;
pub mod audit;
pub mod cli;
pub mod directory;
pub mod error;
pub mod revocation;
pub mod session;
pub mod state;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
