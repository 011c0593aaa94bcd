//! API key repository.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{DepotError, Result};

/// An API key record. The raw secret never appears here.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKeyRecord {
    /// Unique key ID.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// SHA-256 digest of the raw secret.
    pub key_digest: String,
    /// Requests allowed per rolling hour.
    pub rate_limit: i64,
    /// Expiry timestamp, if any.
    pub expires_at: Option<DateTime<Utc>>,
    /// Last successful authorization.
    pub last_used_at: Option<DateTime<Utc>>,
    /// Owning account.
    pub account_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ApiKeyRecord {
    /// Whether the key has passed its expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires) if expires <= now)
    }
}

/// Data for creating a new API key.
#[derive(Debug, Clone)]
pub struct NewApiKey {
    /// Human-readable name.
    pub name: String,
    /// SHA-256 digest of the raw secret.
    pub key_digest: String,
    /// Requests allowed per rolling hour.
    pub rate_limit: i64,
    /// Expiry timestamp, if any.
    pub expires_at: Option<DateTime<Utc>>,
    /// Owning account.
    pub account_id: String,
}

/// Aggregate key counts for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStats {
    /// All keys.
    pub total: i64,
    /// Keys that can still authorize.
    pub active: i64,
    /// Keys past their expiry.
    pub expired: i64,
}

const KEY_COLUMNS: &str =
    "id, name, key_digest, rate_limit, expires_at, last_used_at, account_id, created_at, updated_at";

/// Repository for API key operations.
pub struct ApiKeyRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ApiKeyRepository<'a> {
    /// Create a new ApiKeyRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new API key.
    pub async fn create(&self, key: &NewApiKey) -> Result<ApiKeyRecord> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO api_keys (id, name, key_digest, rate_limit, expires_at, account_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&key.name)
        .bind(&key.key_digest)
        .bind(key.rate_limit)
        .bind(key.expires_at)
        .bind(&key.account_id)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;

        self.get(&id, &key.account_id)
            .await?
            .ok_or_else(|| DepotError::NotFound("api key".to_string()))
    }

    /// Get a key by ID, scoped to an account.
    pub async fn get(&self, id: &str, account_id: &str) -> Result<Option<ApiKeyRecord>> {
        let key = sqlx::query_as::<_, ApiKeyRecord>(&format!(
            "SELECT {KEY_COLUMNS} FROM api_keys WHERE id = ? AND account_id = ?"
        ))
        .bind(id)
        .bind(account_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(key)
    }

    /// Look a key up by the digest of a presented secret.
    ///
    /// Not account-scoped: this is the lookup that *establishes* the account.
    pub async fn find_by_digest(&self, digest: &str) -> Result<Option<ApiKeyRecord>> {
        let key = sqlx::query_as::<_, ApiKeyRecord>(&format!(
            "SELECT {KEY_COLUMNS} FROM api_keys WHERE key_digest = ?"
        ))
        .bind(digest)
        .fetch_optional(self.pool)
        .await?;

        Ok(key)
    }

    /// List all keys for an account, newest first.
    pub async fn list(&self, account_id: &str) -> Result<Vec<ApiKeyRecord>> {
        let keys = sqlx::query_as::<_, ApiKeyRecord>(&format!(
            "SELECT {KEY_COLUMNS} FROM api_keys WHERE account_id = ?
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(account_id)
        .fetch_all(self.pool)
        .await?;

        Ok(keys)
    }

    /// Record a successful authorization.
    pub async fn touch_last_used(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE api_keys SET last_used_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Update a key's rate limit.
    pub async fn update_rate_limit(
        &self,
        id: &str,
        account_id: &str,
        rate_limit: i64,
    ) -> Result<Option<ApiKeyRecord>> {
        let result = sqlx::query(
            "UPDATE api_keys SET rate_limit = ?, updated_at = ? WHERE id = ? AND account_id = ?",
        )
        .bind(rate_limit)
        .bind(Utc::now())
        .bind(id)
        .bind(account_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get(id, account_id).await
    }

    /// Delete (revoke) a key. Returns `true` when a row was removed.
    pub async fn delete(&self, id: &str, account_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = ? AND account_id = ?")
            .bind(id)
            .bind(account_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Aggregate counts for an account's keys.
    pub async fn stats(&self, account_id: &str) -> Result<KeyStats> {
        let now = Utc::now();
        let row: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*),
                    COUNT(CASE WHEN expires_at IS NOT NULL AND expires_at <= ? THEN 1 END)
             FROM api_keys WHERE account_id = ?",
        )
        .bind(now)
        .bind(account_id)
        .fetch_one(self.pool)
        .await?;

        Ok(KeyStats {
            total: row.0,
            active: row.0 - row.1,
            expired: row.1,
        })
    }
}
