//! Postgres-backed user directory.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::error;
use uuid::Uuid;

use super::{DirectoryError, NewUser, Principal, UserDirectory};

const UNIQUE_VIOLATION: &str = "23505";

pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn principal_from_row(row: &PgRow) -> Principal {
    Principal {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        is_active: row.get("is_active"),
    }
}

fn store_error(context: &str, err: &sqlx::Error) -> DirectoryError {
    error!("{context}: {err}");
    DirectoryError::Unavailable(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .is_some_and(|code| code.as_ref() == UNIQUE_VIOLATION),
        _ => false,
    }
}

#[async_trait]
impl UserDirectory for PgDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Principal>, DirectoryError> {
        sqlx::query("SELECT id, email, username, is_active FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.as_ref().map(principal_from_row))
            .map_err(|err| store_error("Failed to look up user by id", &err))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>, DirectoryError> {
        sqlx::query("SELECT id, email, username, is_active FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.as_ref().map(principal_from_row))
            .map_err(|err| store_error("Failed to look up user by email", &err))
    }

    async fn create(&self, user: NewUser) -> Result<Principal, DirectoryError> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(user.password.as_bytes(), &salt)
            .map_err(|err| DirectoryError::Unavailable(err.to_string()))?
            .to_string();

        sqlx::query(
            "INSERT INTO users (id, email, username, password_hash, is_active)
             VALUES ($1, $2, $3, $4, TRUE)
             RETURNING id, email, username, is_active",
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.username)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await
        .map(|row| principal_from_row(&row))
        .map_err(|err| {
            if is_unique_violation(&err) {
                DirectoryError::AlreadyExists
            } else {
                store_error("Failed to create user", &err)
            }
        })
    }

    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Principal>, DirectoryError> {
        let row = sqlx::query(
            "SELECT id, email, username, is_active, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| store_error("Failed to look up credentials", &err))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let stored_hash: String = row.get("password_hash");
        let Ok(parsed) = PasswordHash::new(&stored_hash) else {
            error!("Stored password hash is unparseable; treating as mismatch");
            return Ok(None);
        };

        if Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_err()
        {
            return Ok(None);
        }

        Ok(Some(principal_from_row(&row)))
    }
}
