//! API key service: issuance, authorization, revocation, and stats.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::db::Database;
use crate::rate_limit::{RateLimitResult, RollingWindowLimiter};
use crate::{DepotError, Result};

use super::repository::{ApiKeyRecord, ApiKeyRepository, KeyStats, NewApiKey};
use super::secret::{derive_digest, generate_secret};
use super::MAX_KEY_NAME_LENGTH;

/// Rate limit assigned to the seeded bootstrap key.
const BOOTSTRAP_RATE_LIMIT: i64 = 1_000_000;

/// The authorization context established for a request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Account the presented key belongs to.
    pub account_id: String,
    /// The key that authorized this request.
    pub key_id: String,
    /// The key's rolling-hour limit.
    pub rate_limit: u32,
    /// Requests left in the window after this one.
    pub remaining: u32,
}

/// API key service.
pub struct ApiKeyService {
    db: Database,
    limiter: RollingWindowLimiter,
    default_rate_limit: u32,
}

impl ApiKeyService {
    /// Create a new ApiKeyService.
    pub fn new(db: Database, default_rate_limit: u32) -> Self {
        let limiter = RollingWindowLimiter::new(db.clone());
        Self {
            db,
            limiter,
            default_rate_limit,
        }
    }

    /// Use a custom limiter (tests shrink the window).
    pub fn with_limiter(mut self, limiter: RollingWindowLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// The rolling-window limiter shared with the background sweep.
    pub fn limiter(&self) -> &RollingWindowLimiter {
        &self.limiter
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(DepotError::Validation("key name is required".into()));
        }
        if name.chars().count() > MAX_KEY_NAME_LENGTH {
            return Err(DepotError::Validation(format!(
                "key name must be at most {MAX_KEY_NAME_LENGTH} characters"
            )));
        }
        Ok(())
    }

    /// Issue a new key.
    ///
    /// Returns the record together with the raw secret. The raw value is
    /// shown exactly once here and is unrecoverable afterwards: only its
    /// digest is stored.
    pub async fn issue(
        &self,
        account_id: &str,
        name: &str,
        rate_limit: Option<u32>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(ApiKeyRecord, String)> {
        Self::validate_name(name)?;

        let rate_limit = rate_limit.unwrap_or(self.default_rate_limit);
        if rate_limit == 0 {
            return Err(DepotError::Validation(
                "rate limit must be at least 1".into(),
            ));
        }

        if let Some(expires) = expires_at {
            if expires <= Utc::now() {
                return Err(DepotError::Validation(
                    "expiry must be in the future".into(),
                ));
            }
        }

        let raw_secret = generate_secret();
        let record = ApiKeyRepository::new(self.db.pool())
            .create(&NewApiKey {
                name: name.to_string(),
                key_digest: derive_digest(&raw_secret),
                rate_limit: rate_limit as i64,
                expires_at,
                account_id: account_id.to_string(),
            })
            .await?;

        info!(key_id = %record.id, account = %account_id, "issued api key");
        Ok((record, raw_secret))
    }

    /// Authorize a presented secret.
    ///
    /// Fails `Unauthorized` for unknown, revoked, or expired keys; records
    /// `last_used_at` and then evaluates the rolling-window quota, failing
    /// `RateLimited` when the window is full.
    pub async fn authorize(&self, raw_secret: &str) -> Result<AuthContext> {
        let repo = ApiKeyRepository::new(self.db.pool());

        let key = repo
            .find_by_digest(&derive_digest(raw_secret))
            .await?
            .ok_or_else(|| DepotError::Unauthorized("invalid api key".to_string()))?;

        if key.is_expired(Utc::now()) {
            warn!(key_id = %key.id, "expired api key presented");
            return Err(DepotError::Unauthorized("api key expired".to_string()));
        }

        repo.touch_last_used(&key.id).await?;

        let rate_limit = key.rate_limit.max(0) as u32;
        match self.limiter.check_and_record(&key.id, rate_limit).await? {
            RateLimitResult::Allowed { remaining } => Ok(AuthContext {
                account_id: key.account_id,
                key_id: key.id,
                rate_limit,
                remaining,
            }),
            RateLimitResult::Denied { retry_after } => {
                warn!(key_id = %key.id, retry_after_secs = retry_after.as_secs(), "api key over quota");
                Err(DepotError::RateLimited { retry_after })
            }
        }
    }

    /// Get a key by id.
    pub async fn get(&self, account_id: &str, id: &str) -> Result<ApiKeyRecord> {
        ApiKeyRepository::new(self.db.pool())
            .get(id, account_id)
            .await?
            .ok_or_else(|| DepotError::NotFound("api key".to_string()))
    }

    /// List an account's keys. Raw secrets are never part of the result.
    pub async fn list(&self, account_id: &str) -> Result<Vec<ApiKeyRecord>> {
        ApiKeyRepository::new(self.db.pool()).list(account_id).await
    }

    /// Update a key's rate limit.
    pub async fn update_rate_limit(
        &self,
        account_id: &str,
        id: &str,
        rate_limit: u32,
    ) -> Result<ApiKeyRecord> {
        if rate_limit == 0 {
            return Err(DepotError::Validation(
                "rate limit must be at least 1".into(),
            ));
        }

        ApiKeyRepository::new(self.db.pool())
            .update_rate_limit(id, account_id, rate_limit as i64)
            .await?
            .ok_or_else(|| DepotError::NotFound("api key".to_string()))
    }

    /// Revoke a key. All future authorization attempts with its secret fail.
    pub async fn revoke(&self, account_id: &str, id: &str) -> Result<()> {
        let deleted = ApiKeyRepository::new(self.db.pool())
            .delete(id, account_id)
            .await?;

        if !deleted {
            return Err(DepotError::NotFound("api key".to_string()));
        }

        info!(key_id = %id, account = %account_id, "revoked api key");
        Ok(())
    }

    /// Aggregate key counts for an account.
    pub async fn stats(&self, account_id: &str) -> Result<KeyStats> {
        ApiKeyRepository::new(self.db.pool()).stats(account_id).await
    }

    /// Seed the configured bootstrap key so a fresh deployment is reachable.
    ///
    /// Idempotent: if a key with the same digest already exists, nothing
    /// changes. The raw value itself is never logged.
    pub async fn ensure_bootstrap_key(&self, account_id: &str, raw_secret: &str) -> Result<()> {
        let repo = ApiKeyRepository::new(self.db.pool());
        let digest = derive_digest(raw_secret);

        if repo.find_by_digest(&digest).await?.is_some() {
            return Ok(());
        }

        let record = repo
            .create(&NewApiKey {
                name: "bootstrap".to_string(),
                key_digest: digest,
                rate_limit: BOOTSTRAP_RATE_LIMIT,
                expires_at: None,
                account_id: account_id.to_string(),
            })
            .await?;

        info!(key_id = %record.id, account = %account_id, "seeded bootstrap api key");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn setup() -> ApiKeyService {
        let db = Database::open_in_memory().await.unwrap();
        ApiKeyService::new(db, 1000)
    }

    #[tokio::test]
    async fn test_issue_returns_secret_once() {
        let service = setup().await;

        let (record, secret) = service.issue("acct", "ci", None, None).await.unwrap();

        assert!(secret.starts_with("fd_"));
        assert_eq!(record.rate_limit, 1000);
        assert_ne!(record.key_digest, secret);

        // Listing never exposes the raw value
        let listed = service.list("acct").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key_digest, derive_digest(&secret));
    }

    #[tokio::test]
    async fn test_issue_with_custom_rate_limit() {
        let service = setup().await;

        let (record, _) = service.issue("acct", "slow", Some(5), None).await.unwrap();
        assert_eq!(record.rate_limit, 5);
    }

    #[tokio::test]
    async fn test_issue_validation() {
        let service = setup().await;

        assert!(matches!(
            service.issue("acct", "  ", None, None).await,
            Err(DepotError::Validation(_))
        ));
        assert!(matches!(
            service.issue("acct", "k", Some(0), None).await,
            Err(DepotError::Validation(_))
        ));
        let past = Utc::now() - chrono::Duration::hours(1);
        assert!(matches!(
            service.issue("acct", "k", None, Some(past)).await,
            Err(DepotError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_authorize_success_touches_last_used() {
        let service = setup().await;

        let (record, secret) = service.issue("acct", "k", None, None).await.unwrap();
        assert!(record.last_used_at.is_none());

        let ctx = service.authorize(&secret).await.unwrap();
        assert_eq!(ctx.account_id, "acct");
        assert_eq!(ctx.key_id, record.id);
        assert_eq!(ctx.rate_limit, 1000);

        let touched = service.get("acct", &record.id).await.unwrap();
        assert!(touched.last_used_at.is_some());
    }

    #[tokio::test]
    async fn test_authorize_unknown_secret() {
        let service = setup().await;

        let result = service.authorize("fd_never_issued").await;
        assert!(matches!(result, Err(DepotError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_authorize_revoked_key() {
        let service = setup().await;

        let (record, secret) = service.issue("acct", "k", None, None).await.unwrap();
        service.authorize(&secret).await.unwrap();

        service.revoke("acct", &record.id).await.unwrap();

        let result = service.authorize(&secret).await;
        assert!(matches!(result, Err(DepotError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_authorize_expired_key() {
        let service = setup().await;

        // Issue with a near-future expiry, then wait past it
        let expires = Utc::now() + chrono::Duration::milliseconds(20);
        let (_, secret) = service.issue("acct", "k", None, Some(expires)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;

        let result = service.authorize(&secret).await;
        assert!(matches!(result, Err(DepotError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_rate_limit_two_then_limited() {
        let service = setup().await;

        // rateLimit=2: two authorized calls succeed, the third is limited
        let (_, secret) = service.issue("acct", "k", Some(2), None).await.unwrap();

        assert!(service.authorize(&secret).await.is_ok());
        assert!(service.authorize(&secret).await.is_ok());

        let result = service.authorize(&secret).await;
        match result {
            Err(DepotError::RateLimited { retry_after }) => {
                assert!(retry_after.as_secs() <= 3600);
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_quota_returns_after_window_slides() {
        let db = Database::open_in_memory().await.unwrap();
        let limiter = RollingWindowLimiter::with_window(db.clone(), Duration::from_millis(50));
        let service = ApiKeyService::new(db, 1000).with_limiter(limiter);

        let (_, secret) = service.issue("acct", "k", Some(1), None).await.unwrap();

        assert!(service.authorize(&secret).await.is_ok());
        assert!(matches!(
            service.authorize(&secret).await,
            Err(DepotError::RateLimited { .. })
        ));

        tokio::time::sleep(Duration::from_millis(80)).await;

        // The oldest event aged out; no fixed boundary was involved
        assert!(service.authorize(&secret).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_rate_limit() {
        let service = setup().await;

        let (record, _) = service.issue("acct", "k", Some(10), None).await.unwrap();

        let updated = service
            .update_rate_limit("acct", &record.id, 99)
            .await
            .unwrap();
        assert_eq!(updated.rate_limit, 99);

        assert!(matches!(
            service.update_rate_limit("acct", "missing", 5).await,
            Err(DepotError::NotFound(_))
        ));
        assert!(matches!(
            service.update_rate_limit("acct", &record.id, 0).await,
            Err(DepotError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_revoke_missing() {
        let service = setup().await;

        let result = service.revoke("acct", "missing").await;
        assert!(matches!(result, Err(DepotError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stats() {
        let service = setup().await;

        service.issue("acct", "a", None, None).await.unwrap();
        service
            .issue("acct", "b", None, Some(Utc::now() + chrono::Duration::hours(1)))
            .await
            .unwrap();

        let stats = service.stats("acct").await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.expired, 0);
    }

    #[tokio::test]
    async fn test_bootstrap_key_idempotent() {
        let service = setup().await;

        service
            .ensure_bootstrap_key("admin", "fd_bootstrap_secret")
            .await
            .unwrap();
        service
            .ensure_bootstrap_key("admin", "fd_bootstrap_secret")
            .await
            .unwrap();

        let keys = service.list("admin").await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].name, "bootstrap");

        let ctx = service.authorize("fd_bootstrap_secret").await.unwrap();
        assert_eq!(ctx.account_id, "admin");
    }
}
