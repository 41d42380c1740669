//! In-memory user directory for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use super::{DirectoryError, NewUser, Principal, UserDirectory};

struct Record {
    principal: Principal,
    password: String,
}

/// Test fake; stores passwords in the clear since nothing persists.
#[derive(Default)]
pub struct MemoryDirectory {
    users: Mutex<HashMap<Uuid, Record>>,
}

impl MemoryDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user directly, bypassing the create path.
    pub fn insert(&self, principal: Principal, password: &str) {
        let mut users = self
            .users
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        users.insert(
            principal.id,
            Record {
                principal,
                password: password.to_string(),
            },
        );
    }

    /// Flip the active flag, e.g. to exercise `ACCOUNT_DISABLED` paths.
    pub fn set_active(&self, id: Uuid, active: bool) {
        let mut users = self
            .users
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(record) = users.get_mut(&id) {
            record.principal.is_active = active;
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>, DirectoryError> {
        let users = self
            .users
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(users.get(&id).map(|record| record.principal.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, DirectoryError> {
        let users = self
            .users
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(users
            .values()
            .find(|record| record.principal.email == email)
            .map(|record| record.principal.clone()))
    }

    async fn create(&self, user: NewUser) -> Result<Principal, DirectoryError> {
        let mut users = self
            .users
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let exists = users.values().any(|record| {
            record.principal.email == user.email || record.principal.username == user.username
        });
        if exists {
            return Err(DirectoryError::AlreadyExists);
        }

        let principal = Principal {
            id: Uuid::new_v4(),
            email: user.email,
            username: user.username,
            is_active: true,
        };
        users.insert(
            principal.id,
            Record {
                principal: principal.clone(),
                password: user.password,
            },
        );
        Ok(principal)
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Principal>, DirectoryError> {
        let users = self
            .users
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(users
            .values()
            .find(|record| record.principal.email == email && record.password == password)
            .map(|record| record.principal.clone()))
    }
}
