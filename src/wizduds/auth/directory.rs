//! User directory: maps an email/password pair to an account.
//!
//! Passwords are stored as Argon2 PHC strings. Verification runs on the
//! blocking pool so a burst of logins cannot stall the async workers.

use anyhow::{anyhow, Context, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::{Connection, PgPool, Row};
use tokio::{sync::RwLock, task::spawn_blocking};
use tracing::{debug, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use super::StoreFuture;

/// Account record handed out by the directory. Only `id` is needed to open a
/// session; `email` is shown on the landing page.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
}

pub trait UserDirectory: Send + Sync {
    /// Return the account when `email` exists and `password` matches it.
    /// Unknown emails and wrong passwords both yield `Ok(None)`.
    fn verify_credentials<'a>(
        &'a self,
        email: &'a str,
        password: &'a SecretString,
    ) -> StoreFuture<'a, Option<AuthenticatedUser>>;

    fn user_by_id(&self, id: Uuid) -> StoreFuture<'_, Option<AuthenticatedUser>>;

    /// Check that the backing storage is reachable.
    fn ping(&self) -> StoreFuture<'_, ()>;
}

/// Hash a password into an Argon2id PHC string with a random salt.
///
/// # Errors
/// Returns an error if hashing fails.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("failed to hash password: {e}"))
}

async fn verify_password(password: &SecretString, stored_hash: String) -> Result<bool> {
    let password = password.expose_secret().to_owned();
    spawn_blocking(move || {
        let parsed =
            PasswordHash::new(&stored_hash).map_err(|e| anyhow!("invalid password hash: {e}"))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(anyhow!("failed to verify password: {e}")),
        }
    })
    .await
    .context("password verification task failed")?
}

/// Postgres-backed directory.
///
/// Expects `users (id uuid, email text unique)` and
/// `passwords (user_id uuid references users, hash text)`.
#[derive(Clone, Debug)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lookup_credentials(&self, email: &str) -> Result<Option<(AuthenticatedUser, String)>> {
        let query = r"
            SELECT u.id, u.email, p.hash
            FROM users u
            JOIN passwords p ON p.user_id = u.id
            WHERE u.email = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup login record")?;

        Ok(row.map(|row| {
            (
                AuthenticatedUser {
                    id: row.get("id"),
                    email: row.get("email"),
                },
                row.get("hash"),
            )
        }))
    }

    async fn verify(&self, email: &str, password: &SecretString) -> Result<Option<AuthenticatedUser>> {
        let Some((user, stored_hash)) = self.lookup_credentials(email).await? else {
            debug!("User not found");
            return Ok(None);
        };

        if verify_password(password, stored_hash).await? {
            Ok(Some(user))
        } else {
            debug!("Password mismatch");
            Ok(None)
        }
    }

    async fn find(&self, id: Uuid) -> Result<Option<AuthenticatedUser>> {
        let query = "SELECT id, email FROM users WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user")?;

        Ok(row.map(|row| AuthenticatedUser {
            id: row.get("id"),
            email: row.get("email"),
        }))
    }

    async fn ping_database(&self) -> Result<()> {
        let acquire_span = tracing::info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("failed to acquire database connection")?;

        let ping_span = tracing::info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("failed to ping database")
    }
}

impl UserDirectory for PgUserDirectory {
    fn verify_credentials<'a>(
        &'a self,
        email: &'a str,
        password: &'a SecretString,
    ) -> StoreFuture<'a, Option<AuthenticatedUser>> {
        Box::pin(self.verify(email, password))
    }

    fn user_by_id(&self, id: Uuid) -> StoreFuture<'_, Option<AuthenticatedUser>> {
        Box::pin(self.find(id))
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(self.ping_database())
    }
}

struct StoredUser {
    user: AuthenticatedUser,
    password_hash: String,
}

/// In-process directory for local runs and tests.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: RwLock<Vec<StoredUser>>,
}

impl MemoryUserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account with a freshly generated id.
    ///
    /// # Errors
    /// Returns an error if the password cannot be hashed.
    pub fn with_user(mut self, email: &str, password: &str) -> Result<Self> {
        let password_hash = hash_password(password)?;
        self.users.get_mut().push(StoredUser {
            user: AuthenticatedUser {
                id: Uuid::new_v4(),
                email: email.to_string(),
            },
            password_hash,
        });
        Ok(self)
    }

    /// Look up an account by email without checking a password.
    pub async fn find_by_email(&self, email: &str) -> Option<AuthenticatedUser> {
        self.users
            .read()
            .await
            .iter()
            .find(|stored| stored.user.email == email)
            .map(|stored| stored.user.clone())
    }

    /// Remove an account; returns whether it existed.
    pub async fn remove(&self, id: Uuid) -> bool {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|stored| stored.user.id != id);
        users.len() != before
    }

    async fn verify(&self, email: &str, password: &SecretString) -> Result<Option<AuthenticatedUser>> {
        let found = self
            .users
            .read()
            .await
            .iter()
            .find(|stored| stored.user.email == email)
            .map(|stored| (stored.user.clone(), stored.password_hash.clone()));

        let Some((user, stored_hash)) = found else {
            return Ok(None);
        };

        Ok(verify_password(password, stored_hash).await?.then_some(user))
    }
}

impl std::fmt::Debug for MemoryUserDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryUserDirectory")
            .field("users", &"***")
            .finish()
    }
}

impl UserDirectory for MemoryUserDirectory {
    fn verify_credentials<'a>(
        &'a self,
        email: &'a str,
        password: &'a SecretString,
    ) -> StoreFuture<'a, Option<AuthenticatedUser>> {
        Box::pin(self.verify(email, password))
    }

    fn user_by_id(&self, id: Uuid) -> StoreFuture<'_, Option<AuthenticatedUser>> {
        Box::pin(async move {
            Ok(self
                .users
                .read()
                .await
                .iter()
                .find(|stored| stored.user.id == id)
                .map(|stored| stored.user.clone()))
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}
