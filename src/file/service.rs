//! File service.
//!
//! High-level file operations:
//! - Upload with size ceiling, content hashing, dedup, and best-effort
//!   thumbnailing
//! - Download and thumbnail retrieval
//! - Partial update and reference-counted delete

use tracing::{debug, error};

use crate::db::Database;
use crate::{DepotError, Result};

use super::folder::FolderRepository;
use super::metadata::{FileQuery, FileRecord, FileRepository, FileUpdate, NewFileRecord, PageRequest};
use super::storage::ContentStore;
use super::thumbnail::{is_image_mime, probe_dimensions, render_thumbnail};
use super::{MAX_DESCRIPTION_LENGTH, MAX_NAME_LENGTH, MAX_TAGS};

/// Maximum length of a single tag.
const MAX_TAG_LENGTH: usize = 64;

/// Request data for a single file upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Original filename as presented by the client.
    pub file_name: String,
    /// Declared mime type, if any.
    pub mime_type: Option<String>,
    /// File content.
    pub content: Vec<u8>,
    /// Tags applied to the file.
    pub tags: Vec<String>,
    /// Description.
    pub description: Option<String>,
    /// Target folder.
    pub folder_id: Option<String>,
}

impl UploadRequest {
    /// Create a new upload request.
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: None,
            content,
            tags: Vec::new(),
            description: None,
            folder_id: None,
        }
    }

    /// Set the declared mime type.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
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

    /// Set the target folder.
    pub fn with_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }
}

/// Result of a batch upload. Each file succeeds or fails independently.
#[derive(Debug)]
pub struct UploadOutcome {
    /// Records created in this batch.
    pub created: Vec<FileRecord>,
    /// Per-file failures: (original filename, error).
    pub failed: Vec<(String, DepotError)>,
}

/// File service for uploads, downloads, updates, and deletion.
pub struct FileService {
    db: Database,
    store: ContentStore,
    max_file_size: u64,
    thumbnail_max_dimension: u32,
}

impl FileService {
    /// Create a new FileService.
    pub fn new(db: Database, store: ContentStore) -> Self {
        Self {
            db,
            store,
            max_file_size: 50 * 1024 * 1024,
            thumbnail_max_dimension: 320,
        }
    }

    /// Set a custom max file size in bytes.
    pub fn with_max_file_size(mut self, max_size: u64) -> Self {
        self.max_file_size = max_size;
        self
    }

    /// Set the thumbnail bound in pixels.
    pub fn with_thumbnail_max_dimension(mut self, max_dimension: u32) -> Self {
        self.thumbnail_max_dimension = max_dimension;
        self
    }

    /// Get the configured max file size.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Normalize a tag list: trim, drop empties, dedup preserving order.
    fn normalize_tags(tags: &[String]) -> Result<Vec<String>> {
        let mut normalized: Vec<String> = Vec::new();
        for tag in tags {
            let tag = tag.trim();
            if tag.is_empty() {
                continue;
            }
            if tag.chars().count() > MAX_TAG_LENGTH {
                return Err(DepotError::Validation(format!(
                    "tag must be at most {MAX_TAG_LENGTH} characters"
                )));
            }
            if !normalized.iter().any(|t| t == tag) {
                normalized.push(tag.to_string());
            }
        }
        if normalized.len() > MAX_TAGS {
            return Err(DepotError::Validation(format!(
                "at most {MAX_TAGS} tags are allowed"
            )));
        }
        Ok(normalized)
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(DepotError::Validation("file name is required".into()));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(DepotError::Validation(format!(
                "file name must be at most {MAX_NAME_LENGTH} characters"
            )));
        }
        Ok(())
    }

    fn validate_description(description: Option<&str>) -> Result<()> {
        if let Some(desc) = description {
            if desc.chars().count() > MAX_DESCRIPTION_LENGTH {
                return Err(DepotError::Validation(format!(
                    "description must be at most {MAX_DESCRIPTION_LENGTH} characters"
                )));
            }
        }
        Ok(())
    }

    /// Resolve the effective mime type for an upload.
    fn resolve_mime(file_name: &str, declared: Option<&str>) -> String {
        match declared {
            Some(m) if !m.trim().is_empty() => m.to_string(),
            _ => mime_guess::from_path(file_name)
                .first_or_octet_stream()
                .to_string(),
        }
    }

    /// Upload a single file.
    ///
    /// The content is hashed and stored before the catalog row is written,
    /// so no database lock is held while bytes are processed. Identical
    /// content already cataloged for the account reuses its storage location
    /// (and thumbnail) instead of duplicating bytes; the catalog row is
    /// still distinct.
    pub async fn upload(&self, account_id: &str, request: &UploadRequest) -> Result<FileRecord> {
        Self::validate_name(&request.file_name)?;
        Self::validate_description(request.description.as_deref())?;
        let tags = Self::normalize_tags(&request.tags)?;

        if request.content.len() as u64 > self.max_file_size {
            let max_mb = self.max_file_size / 1024 / 1024;
            return Err(DepotError::Validation(format!(
                "file exceeds the maximum size of {max_mb}MB"
            )));
        }

        // Folder must exist and belong to the account
        if let Some(folder_id) = &request.folder_id {
            let folder_repo = FolderRepository::new(self.db.pool());
            folder_repo
                .get(folder_id, account_id)
                .await?
                .ok_or_else(|| DepotError::NotFound("folder".to_string()))?;
        }

        let mime_type = Self::resolve_mime(&request.file_name, request.mime_type.as_deref());
        let hash = ContentStore::hash_bytes(&request.content);

        let file_repo = FileRepository::new(self.db.pool());

        // Dedup: an existing live row with the same hash means the bytes are
        // already on disk. Reuse its location and derived attributes.
        let existing = file_repo.find_by_hash(&hash, account_id).await?;
        let wrote_blob;
        let (storage_path, width, height, thumbnail_path) = match &existing {
            Some(prior) => {
                debug!(hash = %hash, "upload deduplicated against existing blob");
                wrote_blob = false;
                (
                    prior.storage_path.clone(),
                    prior.width,
                    prior.height,
                    prior.thumbnail_path.clone(),
                )
            }
            None => {
                let location = self.store.write(&hash, &request.content)?;
                wrote_blob = true;

                let mut width = None;
                let mut height = None;
                let mut thumbnail_path = None;

                if is_image_mime(&mime_type) {
                    if let Some((w, h)) = probe_dimensions(&request.content) {
                        width = Some(w as i64);
                        height = Some(h as i64);
                    }
                    // Best-effort: a corrupt image still uploads fine
                    match render_thumbnail(&request.content, self.thumbnail_max_dimension) {
                        Ok(thumb_bytes) => {
                            let thumb_location = ContentStore::thumbnail_location_for(&hash);
                            match self.store.write_at(&thumb_location, &thumb_bytes) {
                                Ok(()) => thumbnail_path = Some(thumb_location),
                                Err(e) => {
                                    debug!(error = %e, "failed to store thumbnail")
                                }
                            }
                        }
                        Err(e) => {
                            debug!(name = %request.file_name, error = %e, "thumbnail generation failed");
                        }
                    }
                }

                (location, width, height, thumbnail_path)
            }
        };

        let mut new_record = NewFileRecord::new(
            request.file_name.clone(),
            mime_type,
            request.content.len() as i64,
            hash.clone(),
            storage_path,
            account_id,
        )
        .with_tags(tags);
        new_record.width = width;
        new_record.height = height;
        new_record.thumbnail_path = thumbnail_path;
        new_record.description = request
            .description
            .as_ref()
            .filter(|d| !d.trim().is_empty())
            .cloned();
        new_record.folder_id = request.folder_id.clone();

        match file_repo.create(&new_record).await {
            Ok(record) => {
                // A concurrent delete of the record we deduplicated against
                // may have released the blob between our lookup and insert.
                // Content-addressed writes are idempotent, so re-store.
                if !wrote_blob && !self.store.exists(&record.storage_path) {
                    self.store.write(&hash, &request.content)?;
                }
                Ok(record)
            }
            Err(e) => {
                // All-or-nothing visibility: a failed insert must not leave
                // a blob only this upload referenced
                if wrote_blob && file_repo.count_by_hash(&hash, account_id).await? == 0 {
                    let _ = self.store.delete(&new_record.storage_path);
                    if let Some(thumb) = &new_record.thumbnail_path {
                        let _ = self.store.delete(thumb);
                    }
                }
                error!(error = %e, "failed to create file record");
                Err(e)
            }
        }
    }

    /// Upload a batch of files. Each file succeeds or fails on its own; one
    /// oversized payload never aborts its siblings.
    pub async fn upload_batch(
        &self,
        account_id: &str,
        requests: Vec<UploadRequest>,
    ) -> UploadOutcome {
        let mut outcome = UploadOutcome {
            created: Vec::new(),
            failed: Vec::new(),
        };

        for request in requests {
            let name = request.file_name.clone();
            match self.upload(account_id, &request).await {
                Ok(record) => outcome.created.push(record),
                Err(e) => outcome.failed.push((name, e)),
            }
        }

        outcome
    }

    /// Get a file record.
    pub async fn get(&self, account_id: &str, id: &str) -> Result<FileRecord> {
        FileRepository::new(self.db.pool())
            .get(id, account_id)
            .await?
            .ok_or_else(|| DepotError::NotFound("file".to_string()))
    }

    /// List files matching a filter, newest first.
    pub async fn list(
        &self,
        account_id: &str,
        query: &FileQuery,
        page: &PageRequest,
    ) -> Result<(Vec<FileRecord>, i64)> {
        FileRepository::new(self.db.pool())
            .list(account_id, query, page)
            .await
    }

    /// Download a file's content.
    pub async fn download(&self, account_id: &str, id: &str) -> Result<(FileRecord, Vec<u8>)> {
        let record = self.get(account_id, id).await?;
        let content = self.store.read(&record.storage_path)?;
        Ok((record, content))
    }

    /// Fetch a file's thumbnail, when one exists.
    pub async fn thumbnail(&self, account_id: &str, id: &str) -> Result<(FileRecord, Vec<u8>)> {
        let record = self.get(account_id, id).await?;
        let thumb_path = record
            .thumbnail_path
            .clone()
            .ok_or_else(|| DepotError::NotFound("thumbnail".to_string()))?;
        let content = self.store.read(&thumb_path)?;
        Ok((record, content))
    }

    /// Apply a partial update to a file record.
    pub async fn update(
        &self,
        account_id: &str,
        id: &str,
        update: FileUpdate,
    ) -> Result<FileRecord> {
        let mut update = update;

        if let Some(name) = &update.name {
            Self::validate_name(name)?;
        }
        if let Some(Some(description)) = &update.description {
            Self::validate_description(Some(description))?;
        }
        if let Some(tags) = &update.tags {
            update.tags = Some(Self::normalize_tags(tags)?);
        }

        // A target folder must exist and belong to the same account
        if let Some(Some(folder_id)) = &update.folder_id {
            let folder_repo = FolderRepository::new(self.db.pool());
            folder_repo
                .get(folder_id, account_id)
                .await?
                .ok_or_else(|| DepotError::NotFound("folder".to_string()))?;
        }

        FileRepository::new(self.db.pool())
            .update(id, account_id, &update)
            .await?
            .ok_or_else(|| DepotError::NotFound("file".to_string()))
    }

    /// Delete a file record, releasing the blob once nothing references it.
    pub async fn delete(&self, account_id: &str, id: &str) -> Result<()> {
        let file_repo = FileRepository::new(self.db.pool());

        let record = self.get(account_id, id).await?;
        file_repo.delete(id, account_id).await?;

        // Storage is released only when the reference count for this
        // hash+account reaches zero
        if file_repo.count_by_hash(&record.hash, account_id).await? == 0 {
            self.store.delete(&record.storage_path)?;
            if let Some(thumb) = &record.thumbnail_path {
                self.store.delete(thumb)?;
            }
        }

        Ok(())
    }
}
