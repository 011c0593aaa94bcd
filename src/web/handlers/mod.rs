//! API handlers for the Web API.

pub mod files;
pub mod folders;
pub mod keys;

pub use files::*;
pub use folders::*;
pub use keys::*;

use crate::apikey::ApiKeyService;
use crate::config::Config;
use crate::db::Database;
use crate::file::{ContentStore, FileService, FolderService, PageRequest};
use crate::web::error::ApiError;

/// Shared application state behind the router.
///
/// The gateway holds no business state of its own: everything here is a
/// service over the shared database and blob store, so multiple instances
/// pointed at the same storage behave identically.
pub struct AppState {
    /// File upload/download/update/delete.
    pub files: FileService,
    /// Folder hierarchy operations.
    pub folders: FolderService,
    /// Key issuance, authorization, and quota.
    pub keys: ApiKeyService,
    /// Page size used when the caller omits `limit`.
    pub default_page_limit: u32,
    /// Hard ceiling for `limit`.
    pub max_page_limit: u32,
    /// Maximum upload size per file, in bytes.
    pub max_upload_size: u64,
}

impl AppState {
    /// Build the application state from configuration.
    pub fn new(db: Database, store: ContentStore, config: &Config) -> Self {
        let files = FileService::new(db.clone(), store.clone())
            .with_max_file_size(config.storage.max_upload_size_bytes())
            .with_thumbnail_max_dimension(config.storage.thumbnail_max_dimension);
        let folders = FolderService::new(db.clone(), store);
        let keys = ApiKeyService::new(db, config.api.default_rate_limit);

        Self {
            files,
            folders,
            keys,
            default_page_limit: config.api.default_page_limit,
            max_page_limit: config.api.max_page_limit,
            max_upload_size: config.storage.max_upload_size_bytes(),
        }
    }

    /// Resolve pagination parameters: page must be >= 1, limit defaults and
    /// is clamped to the configured maximum.
    pub fn resolve_page(
        &self,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<PageRequest, ApiError> {
        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(ApiError::unprocessable("page must be at least 1"));
        }

        let limit = limit.unwrap_or(self.default_page_limit);
        if limit == 0 {
            return Err(ApiError::unprocessable("limit must be at least 1"));
        }

        Ok(PageRequest {
            page,
            limit: limit.min(self.max_page_limit),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn state() -> AppState {
        let db = Database::open_in_memory().await.unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let store = ContentStore::new(dir.path()).unwrap();
        AppState::new(db, store, &Config::default())
    }

    #[tokio::test]
    async fn test_resolve_page_defaults() {
        let state = state().await;
        let page = state.resolve_page(None, None).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 20);
    }

    #[tokio::test]
    async fn test_resolve_page_clamps_limit() {
        let state = state().await;
        let page = state.resolve_page(Some(2), Some(5000)).unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.limit, 100);
    }

    #[tokio::test]
    async fn test_resolve_page_rejects_zero() {
        let state = state().await;
        assert!(state.resolve_page(Some(0), None).is_err());
        assert!(state.resolve_page(None, Some(0)).is_err());
    }
}
