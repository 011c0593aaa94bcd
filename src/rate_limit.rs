//! Rolling-window rate limiting for API keys.
//!
//! Usage events are persisted per key and evicted once they age past the
//! window, so quota decisions follow a continuously sliding interval rather
//! than clock-aligned buckets, and every gateway instance sharing the
//! database sees the same counters.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::Result;

/// Length of the rolling window: one hour.
pub const WINDOW: Duration = Duration::from_secs(3600);

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed.
    Allowed {
        /// Requests left in the window after this one.
        remaining: u32,
    },
    /// Request is denied.
    Denied {
        /// Time until the oldest counted request ages out of the window.
        retry_after: Duration,
    },
}

impl RateLimitResult {
    /// Check if the request is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Rolling-window rate limiter backed by the `api_key_usage` table.
#[derive(Debug, Clone)]
pub struct RollingWindowLimiter {
    db: Database,
    window: Duration,
}

impl RollingWindowLimiter {
    /// Create a limiter with the standard one-hour window.
    pub fn new(db: Database) -> Self {
        Self { db, window: WINDOW }
    }

    /// Create a limiter with a custom window (tests).
    pub fn with_window(db: Database, window: Duration) -> Self {
        Self { db, window }
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - chrono::Duration::from_std(self.window).unwrap_or(chrono::Duration::hours(1))
    }

    /// Check a key against its limit and record the request when allowed.
    ///
    /// Eviction, count, and insert run in one transaction so concurrent
    /// requests against the same key cannot both slip under the limit.
    pub async fn check_and_record(&self, key_id: &str, max_requests: u32) -> Result<RateLimitResult> {
        let now = Utc::now();
        let cutoff = self.cutoff(now);

        let mut tx = self.db.pool().begin().await?;

        // Evict events that have aged out of the window
        sqlx::query("DELETE FROM api_key_usage WHERE key_id = ? AND used_at <= ?")
            .bind(key_id)
            .bind(cutoff)
            .execute(&mut *tx)
            .await?;

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM api_key_usage WHERE key_id = ?")
            .bind(key_id)
            .fetch_one(&mut *tx)
            .await?;

        if count.0 >= max_requests as i64 {
            let oldest: (Option<DateTime<Utc>>,) =
                sqlx::query_as("SELECT MIN(used_at) FROM api_key_usage WHERE key_id = ?")
                    .bind(key_id)
                    .fetch_one(&mut *tx)
                    .await?;
            tx.commit().await?;

            let retry_after = match oldest.0 {
                Some(oldest) => {
                    let ages_out = oldest
                        + chrono::Duration::from_std(self.window)
                            .unwrap_or(chrono::Duration::hours(1));
                    (ages_out - now).to_std().unwrap_or(Duration::ZERO)
                }
                None => Duration::ZERO,
            };

            return Ok(RateLimitResult::Denied { retry_after });
        }

        sqlx::query("INSERT INTO api_key_usage (key_id, used_at) VALUES (?, ?)")
            .bind(key_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let remaining = (max_requests as i64 - count.0 - 1).max(0) as u32;
        Ok(RateLimitResult::Allowed { remaining })
    }

    /// Requests left in the window for a key, without recording anything.
    pub async fn remaining(&self, key_id: &str, max_requests: u32) -> Result<u32> {
        let cutoff = self.cutoff(Utc::now());

        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM api_key_usage WHERE key_id = ? AND used_at > ?")
                .bind(key_id)
                .bind(cutoff)
                .fetch_one(self.db.pool())
                .await?;

        Ok((max_requests as i64 - count.0).max(0) as u32)
    }

    /// Evict aged-out events for every key.
    ///
    /// Inline eviction keeps active keys bounded; this sweep catches keys
    /// that went idle while over their limit.
    pub async fn evict_expired(&self) -> Result<u64> {
        let cutoff = self.cutoff(Utc::now());

        let result = sqlx::query("DELETE FROM api_key_usage WHERE used_at <= ?")
            .bind(cutoff)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
