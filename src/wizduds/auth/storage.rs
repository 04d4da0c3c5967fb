//! Session record storage.
//!
//! Records are keyed by the SHA-256 hash of the cookie token; raw tokens are
//! never stored. Expired records are never returned by `lookup`, and
//! `purge_expired` deletes them in bulk.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::Instrument;
use uuid::Uuid;

use super::{utils::now_unix_seconds, StoreFuture};

/// Minimal data kept for an open session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRecord {
    pub user_id: Uuid,
    /// Set when the visitor ticked "remember me".
    pub persistent: bool,
    pub expires_at_unix: i64,
}

pub trait SessionStore: Send + Sync {
    fn insert<'a>(&'a self, token_hash: &'a [u8], record: &'a SessionRecord)
        -> StoreFuture<'a, ()>;

    fn lookup<'a>(&'a self, token_hash: &'a [u8]) -> StoreFuture<'a, Option<SessionRecord>>;

    fn delete<'a>(&'a self, token_hash: &'a [u8]) -> StoreFuture<'a, ()>;

    /// Delete every expired record; returns how many were removed.
    fn purge_expired(&self) -> StoreFuture<'_, u64>;
}

/// Postgres-backed store using the `sessions` table.
#[derive(Clone, Debug)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_session(&self, token_hash: &[u8], record: &SessionRecord) -> Result<()> {
        let query = r"
            INSERT INTO sessions
                (token_hash, user_id, persistent, expires_at)
            VALUES ($1, $2, $3, to_timestamp($4::double precision))
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token_hash)
            .bind(record.user_id)
            .bind(record.persistent)
            .bind(record.expires_at_unix)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to insert session")?;
        Ok(())
    }

    async fn lookup_session(&self, token_hash: &[u8]) -> Result<Option<SessionRecord>> {
        let query = r"
            SELECT
                user_id,
                persistent,
                EXTRACT(EPOCH FROM expires_at)::BIGINT AS expires_at_unix
            FROM sessions
            WHERE token_hash = $1
              AND expires_at > NOW()
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup session")?;

        Ok(row.map(|row| SessionRecord {
            user_id: row.get("user_id"),
            persistent: row.get("persistent"),
            expires_at_unix: row.get("expires_at_unix"),
        }))
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<()> {
        let query = "DELETE FROM sessions WHERE token_hash = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete session")?;
        Ok(())
    }

    async fn purge_expired_sessions(&self) -> Result<u64> {
        let query = "DELETE FROM sessions WHERE expires_at <= NOW()";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to purge expired sessions")?;
        Ok(result.rows_affected())
    }
}

impl SessionStore for PgSessionStore {
    fn insert<'a>(
        &'a self,
        token_hash: &'a [u8],
        record: &'a SessionRecord,
    ) -> StoreFuture<'a, ()> {
        Box::pin(self.insert_session(token_hash, record))
    }

    fn lookup<'a>(&'a self, token_hash: &'a [u8]) -> StoreFuture<'a, Option<SessionRecord>> {
        Box::pin(self.lookup_session(token_hash))
    }

    fn delete<'a>(&'a self, token_hash: &'a [u8]) -> StoreFuture<'a, ()> {
        Box::pin(self.delete_session(token_hash))
    }

    fn purge_expired(&self) -> StoreFuture<'_, u64> {
        Box::pin(self.purge_expired_sessions())
    }
}

/// In-process store for local runs and tests.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Vec<u8>, SessionRecord>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, expired ones included.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// All stored records, expired ones included.
    pub async fn records(&self) -> Vec<SessionRecord> {
        self.sessions.read().await.values().cloned().collect()
    }
}

impl SessionStore for MemorySessionStore {
    fn insert<'a>(
        &'a self,
        token_hash: &'a [u8],
        record: &'a SessionRecord,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.sessions
                .write()
                .await
                .insert(token_hash.to_vec(), record.clone());
            Ok(())
        })
    }

    fn lookup<'a>(&'a self, token_hash: &'a [u8]) -> StoreFuture<'a, Option<SessionRecord>> {
        Box::pin(async move {
            let now = now_unix_seconds();
            let mut sessions = self.sessions.write().await;
            let Some(record) = sessions.get(token_hash).cloned() else {
                return Ok(None);
            };
            if record.expires_at_unix > now {
                return Ok(Some(record));
            }
            sessions.remove(token_hash);
            Ok(None)
        })
    }

    fn delete<'a>(&'a self, token_hash: &'a [u8]) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.sessions.write().await.remove(token_hash);
            Ok(())
        })
    }

    fn purge_expired(&self) -> StoreFuture<'_, u64> {
        Box::pin(async move {
            let now = now_unix_seconds();
            let mut sessions = self.sessions.write().await;
            let before = sessions.len();
            sessions.retain(|_, record| record.expires_at_unix > now);
            Ok(u64::try_from(before - sessions.len()).unwrap_or(u64::MAX))
        })
    }
}
