//! User directory boundary.
//!
//! The auth layer never touches user persistence directly; it resolves
//! principals through this trait. Production uses the Postgres-backed
//! implementation, tests use the in-memory one.

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

mod memory;
mod pg;

pub use memory::MemoryDirectory;
pub use pg::PgDirectory;

/// Resolved authenticated identity. Owned by the directory; request handlers
/// only ever hold a read-only copy for the request's lifetime.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(rename = "isActive")]
    pub is_active: bool,
}

/// Input for user creation; password hashing policy is the directory's
/// concern, not the auth layer's.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("email or username already registered")]
    AlreadyExists,
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a principal by id; `None` when unknown.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>, DirectoryError>;

    /// Look up a principal by email; `None` when unknown.
    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, DirectoryError>;

    /// Create a user record and return the new principal.
    async fn create(&self, user: NewUser) -> Result<Principal, DirectoryError>;

    /// Check credentials; `None` for unknown email or wrong password. The
    /// caller is responsible for rejecting inactive principals.
    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Principal>, DirectoryError>;
}
