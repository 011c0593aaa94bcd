//! File catalog types and repository.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, SqlitePool};
use uuid::Uuid;

use crate::{DepotError, Result};

/// A file record in the catalog.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Unique file ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Original upload filename.
    pub original_name: String,
    /// Declared mime type.
    pub mime_type: String,
    /// Size in bytes.
    pub size: i64,
    /// SHA-256 content hash (lowercase hex).
    pub hash: String,
    /// Blob storage location.
    pub storage_path: String,
    /// Image width in pixels, when known.
    pub width: Option<i64>,
    /// Image height in pixels, when known.
    pub height: Option<i64>,
    /// Thumbnail storage location, when one was generated.
    pub thumbnail_path: Option<String>,
    /// Tags (order-insignificant, deduplicated).
    pub tags: Vec<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Structured metadata.
    pub metadata: Option<serde_json::Value>,
    /// Owning account.
    pub account_id: String,
    /// Containing folder, if any.
    pub folder_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Raw row shape; tags and metadata are JSON text columns.
#[derive(Debug, sqlx::FromRow)]
struct FileRow {
    id: String,
    name: String,
    original_name: String,
    mime_type: String,
    size: i64,
    hash: String,
    storage_path: String,
    width: Option<i64>,
    height: Option<i64>,
    thumbnail_path: Option<String>,
    tags: String,
    description: Option<String>,
    metadata: Option<String>,
    account_id: String,
    folder_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FileRow> for FileRecord {
    fn from(row: FileRow) -> Self {
        FileRecord {
            id: row.id,
            name: row.name,
            original_name: row.original_name,
            mime_type: row.mime_type,
            size: row.size,
            hash: row.hash,
            storage_path: row.storage_path,
            width: row.width,
            height: row.height,
            thumbnail_path: row.thumbnail_path,
            tags: serde_json::from_str(&row.tags).unwrap_or_default(),
            description: row.description,
            metadata: row
                .metadata
                .as_deref()
                .and_then(|m| serde_json::from_str(m).ok()),
            account_id: row.account_id,
            folder_id: row.folder_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const FILE_COLUMNS: &str = "id, name, original_name, mime_type, size, hash, storage_path, \
     width, height, thumbnail_path, tags, description, metadata, \
     account_id, folder_id, created_at, updated_at";

/// Data for creating a new file record.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    /// Display name.
    pub name: String,
    /// Original upload filename.
    pub original_name: String,
    /// Declared mime type.
    pub mime_type: String,
    /// Size in bytes.
    pub size: i64,
    /// SHA-256 content hash.
    pub hash: String,
    /// Blob storage location.
    pub storage_path: String,
    /// Image width.
    pub width: Option<i64>,
    /// Image height.
    pub height: Option<i64>,
    /// Thumbnail location.
    pub thumbnail_path: Option<String>,
    /// Tags.
    pub tags: Vec<String>,
    /// Description.
    pub description: Option<String>,
    /// Structured metadata.
    pub metadata: Option<serde_json::Value>,
    /// Owning account.
    pub account_id: String,
    /// Containing folder.
    pub folder_id: Option<String>,
}

impl NewFileRecord {
    /// Create a new record with the required fields.
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        size: i64,
        hash: impl Into<String>,
        storage_path: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            original_name: name.clone(),
            name,
            mime_type: mime_type.into(),
            size,
            hash: hash.into(),
            storage_path: storage_path.into(),
            width: None,
            height: None,
            thumbnail_path: None,
            tags: Vec::new(),
            description: None,
            metadata: None,
            account_id: account_id.into(),
            folder_id: None,
        }
    }

    /// Set image dimensions.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width as i64);
        self.height = Some(height as i64);
        self
    }

    /// Set the thumbnail location.
    pub fn with_thumbnail(mut self, thumbnail_path: impl Into<String>) -> Self {
        self.thumbnail_path = Some(thumbnail_path.into());
        self
    }

    /// Set the tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the containing folder.
    pub fn with_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }
}

/// Builder for partial file updates. Only set fields are written.
#[derive(Debug, Clone, Default)]
pub struct FileUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New tag set.
    pub tags: Option<Vec<String>>,
    /// New description (`Some(None)` clears it).
    pub description: Option<Option<String>>,
    /// New metadata (`Some(None)` clears it).
    pub metadata: Option<Option<serde_json::Value>>,
    /// New folder (`Some(None)` moves to the account root).
    pub folder_id: Option<Option<String>>,
}

impl FileUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the tag set.
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Set the description.
    pub fn description(mut self, description: Option<impl Into<String>>) -> Self {
        self.description = Some(description.map(|s| s.into()));
        self
    }

    /// Set the metadata.
    pub fn metadata(mut self, metadata: Option<serde_json::Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Set the containing folder.
    pub fn folder_id(mut self, folder_id: Option<String>) -> Self {
        self.folder_id = Some(folder_id);
        self
    }

    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.tags.is_none()
            && self.description.is_none()
            && self.metadata.is_none()
            && self.folder_id.is_none()
    }
}

/// Listing filter. All conditions are ANDed; account scoping is implicit.
#[derive(Debug, Clone, Default)]
pub struct FileQuery {
    /// Case-insensitive substring over name and description.
    pub search: Option<String>,
    /// Files must carry every listed tag.
    pub tags: Vec<String>,
    /// Exact mime type.
    pub mime_type: Option<String>,
    /// Exact folder id.
    pub folder_id: Option<String>,
}

/// Offset pagination request. `page` is 1-indexed.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    /// 1-indexed page number.
    pub page: u32,
    /// Items per page.
    pub limit: u32,
}

impl PageRequest {
    /// Row offset for this page.
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.limit as i64
    }

    /// Total pages for the given row count.
    pub fn total_pages(&self, total: i64) -> i64 {
        if self.limit == 0 {
            return 0;
        }
        (total + self.limit as i64 - 1) / self.limit as i64
    }
}

/// Repository for file catalog operations.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new file record.
    pub async fn create(&self, file: &NewFileRecord) -> Result<FileRecord> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let tags_json = serde_json::to_string(&file.tags)
            .map_err(|e| DepotError::Validation(format!("invalid tags: {e}")))?;
        let metadata_json = match &file.metadata {
            Some(m) => Some(
                serde_json::to_string(m)
                    .map_err(|e| DepotError::Validation(format!("invalid metadata: {e}")))?,
            ),
            None => None,
        };

        sqlx::query(
            "INSERT INTO files (id, name, original_name, mime_type, size, hash, storage_path,
                                width, height, thumbnail_path, tags, description, metadata,
                                account_id, folder_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&file.name)
        .bind(&file.original_name)
        .bind(&file.mime_type)
        .bind(file.size)
        .bind(&file.hash)
        .bind(&file.storage_path)
        .bind(file.width)
        .bind(file.height)
        .bind(&file.thumbnail_path)
        .bind(&tags_json)
        .bind(&file.description)
        .bind(&metadata_json)
        .bind(&file.account_id)
        .bind(&file.folder_id)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;

        self.get(&id, &file.account_id)
            .await?
            .ok_or_else(|| DepotError::NotFound("file".to_string()))
    }

    /// Get a file by ID, scoped to an account.
    pub async fn get(&self, id: &str, account_id: &str) -> Result<Option<FileRecord>> {
        let row = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ? AND account_id = ?"
        ))
        .bind(id)
        .bind(account_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(FileRecord::from))
    }

    /// Append the filter's WHERE conditions to a query builder.
    fn push_filters(
        builder: &mut QueryBuilder<'_, sqlx::Sqlite>,
        account_id: &str,
        query: &FileQuery,
    ) {
        builder.push(" WHERE account_id = ");
        builder.push_bind(account_id.to_string());

        if let Some(search) = &query.search {
            let pattern = format!("%{}%", search.to_lowercase());
            builder.push(" AND (LOWER(name) LIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR LOWER(COALESCE(description, '')) LIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }

        for tag in &query.tags {
            // tags is a JSON array of strings; match the quoted element
            builder.push(" AND tags LIKE ");
            builder.push_bind(format!("%{}%", serde_json::to_string(tag).unwrap_or_default()));
        }

        if let Some(mime_type) = &query.mime_type {
            builder.push(" AND mime_type = ");
            builder.push_bind(mime_type.to_string());
        }

        if let Some(folder_id) = &query.folder_id {
            builder.push(" AND folder_id = ");
            builder.push_bind(folder_id.to_string());
        }
    }

    /// List files matching the filter, newest first, with the total count.
    pub async fn list(
        &self,
        account_id: &str,
        query: &FileQuery,
        page: &PageRequest,
    ) -> Result<(Vec<FileRecord>, i64)> {
        let mut count_builder: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM files");
        Self::push_filters(&mut count_builder, account_id, query);

        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(self.pool)
            .await?;

        let mut select_builder: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new(format!("SELECT {FILE_COLUMNS} FROM files"));
        Self::push_filters(&mut select_builder, account_id, query);
        select_builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        select_builder.push_bind(page.limit as i64);
        select_builder.push(" OFFSET ");
        select_builder.push_bind(page.offset());

        let rows: Vec<FileRow> = select_builder
            .build_query_as()
            .fetch_all(self.pool)
            .await?;

        Ok((rows.into_iter().map(FileRecord::from).collect(), total))
    }

    /// Update a file record. Returns None when the id is absent or foreign.
    pub async fn update(
        &self,
        id: &str,
        account_id: &str,
        update: &FileUpdate,
    ) -> Result<Option<FileRecord>> {
        if update.is_empty() {
            return self.get(id, account_id).await;
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE files SET ");
        let mut separated = query.separated(", ");

        if let Some(ref name) = update.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name.clone());
        }

        if let Some(ref tags) = update.tags {
            let tags_json = serde_json::to_string(tags)
                .map_err(|e| DepotError::Validation(format!("invalid tags: {e}")))?;
            separated.push("tags = ");
            separated.push_bind_unseparated(tags_json);
        }

        if let Some(ref description) = update.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description.clone());
        }

        if let Some(ref metadata) = update.metadata {
            let metadata_json = match metadata {
                Some(m) => Some(
                    serde_json::to_string(m)
                        .map_err(|e| DepotError::Validation(format!("invalid metadata: {e}")))?,
                ),
                None => None,
            };
            separated.push("metadata = ");
            separated.push_bind_unseparated(metadata_json);
        }

        if let Some(ref folder_id) = update.folder_id {
            separated.push("folder_id = ");
            separated.push_bind_unseparated(folder_id.clone());
        }

        separated.push("updated_at = ");
        separated.push_bind_unseparated(Utc::now());

        query.push(" WHERE id = ");
        query.push_bind(id.to_string());
        query.push(" AND account_id = ");
        query.push_bind(account_id.to_string());

        let result = query.build().execute(self.pool).await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get(id, account_id).await
    }

    /// Delete a file record. Returns `true` when a row was removed.
    pub async fn delete(&self, id: &str, account_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ? AND account_id = ?")
            .bind(id)
            .bind(account_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count live catalog rows referencing a content hash for an account.
    ///
    /// This is the storage reference count: the blob may be released only
    /// when it reaches zero.
    pub async fn count_by_hash(&self, hash: &str, account_id: &str) -> Result<i64> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM files WHERE hash = ? AND account_id = ?")
                .bind(hash)
                .bind(account_id)
                .fetch_one(self.pool)
                .await?;

        Ok(count.0)
    }

    /// Find any live record with the same content hash for an account.
    ///
    /// Used by upload dedup to reuse the existing storage location.
    pub async fn find_by_hash(&self, hash: &str, account_id: &str) -> Result<Option<FileRecord>> {
        let row = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE hash = ? AND account_id = ? LIMIT 1"
        ))
        .bind(hash)
        .bind(account_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(FileRecord::from))
    }

    /// List all files directly inside a folder.
    pub async fn list_by_folder(&self, folder_id: &str, account_id: &str) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE folder_id = ? AND account_id = ?
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(folder_id)
        .bind(account_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(FileRecord::from).collect())
    }

    /// Count files directly inside a folder.
    pub async fn count_by_folder(&self, folder_id: &str) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM files WHERE folder_id = ?")
            .bind(folder_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count.0)
    }
}
