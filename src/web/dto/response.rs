//! Response DTOs for the Web API.
//!
//! Shapes and field names mirror what the dashboard client consumes.

use serde::Serialize;
use utoipa::ToSchema;

use crate::apikey::{ApiKeyRecord, KeyStats};
use crate::file::{FileRecord, FolderNode, FolderWithCounts, UploadOutcome};

/// A file record as exposed by the API.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    /// File id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Original upload filename.
    pub original_name: String,
    /// Mime type.
    pub mime_type: String,
    /// Size in bytes.
    pub size: i64,
    /// Content hash.
    pub hash: String,
    /// Storage location.
    pub storage_path: String,
    /// Image width.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    /// Image height.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    /// Thumbnail location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<String>,
    /// Tags.
    pub tags: Vec<String>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Structured metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Value>,
    /// Owning account.
    pub user_id: String,
    /// Containing folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl From<FileRecord> for FileResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            original_name: record.original_name,
            mime_type: record.mime_type,
            size: record.size,
            hash: record.hash,
            storage_path: record.storage_path,
            width: record.width,
            height: record.height,
            thumbnail_path: record.thumbnail_path,
            tags: record.tags,
            description: record.description,
            metadata: record.metadata,
            user_id: record.account_id,
            folder_id: record.folder_id,
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }
}

/// Pagination metadata.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Current page (1-indexed).
    pub page: u32,
    /// Items per page.
    pub limit: u32,
    /// Total matching items.
    pub total: i64,
    /// Total pages: ceil(total / limit).
    pub total_pages: i64,
}

/// File listing response.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileListResponse {
    /// Files on this page.
    pub files: Vec<FileResponse>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// A single failed upload inside a batch.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadFailure {
    /// Original filename.
    pub name: String,
    /// Why it failed.
    pub error: String,
}

/// Batch upload response. Files succeed or fail independently.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Records created in this batch.
    pub files: Vec<FileResponse>,
    /// Per-file failures.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<UploadFailure>,
}

impl From<UploadOutcome> for UploadResponse {
    fn from(outcome: UploadOutcome) -> Self {
        Self {
            files: outcome.created.into_iter().map(FileResponse::from).collect(),
            failed: outcome
                .failed
                .into_iter()
                .map(|(name, error)| UploadFailure {
                    name,
                    error: error.to_string(),
                })
                .collect(),
        }
    }
}

/// Direct content counts of a folder.
#[derive(Debug, Serialize, ToSchema)]
pub struct FolderCounts {
    /// Files directly inside.
    pub files: i64,
    /// Direct child folders.
    pub children: i64,
}

/// A folder as exposed by the API.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FolderResponse {
    /// Folder id.
    pub id: String,
    /// Folder name.
    pub name: String,
    /// Materialized path.
    pub path: String,
    /// Parent folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Owning account.
    pub user_id: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
    /// Direct content counts.
    #[serde(rename = "_count")]
    pub count: FolderCounts,
}

impl From<FolderWithCounts> for FolderResponse {
    fn from(item: FolderWithCounts) -> Self {
        Self {
            id: item.folder.id,
            name: item.folder.name,
            path: item.folder.path,
            parent_id: item.folder.parent_id,
            user_id: item.folder.account_id,
            created_at: item.folder.created_at.to_rfc3339(),
            updated_at: item.folder.updated_at.to_rfc3339(),
            count: FolderCounts {
                files: item.file_count,
                children: item.child_count,
            },
        }
    }
}

/// A node in the folder tree response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FolderTreeResponse {
    /// Folder id.
    pub id: String,
    /// Folder name.
    pub name: String,
    /// Materialized path.
    pub path: String,
    /// Parent folder.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Owning account.
    pub user_id: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
    /// Direct content counts.
    #[serde(rename = "_count")]
    pub count: FolderCounts,
    /// Child nodes.
    pub children: Vec<FolderTreeResponse>,
}

impl From<FolderNode> for FolderTreeResponse {
    fn from(node: FolderNode) -> Self {
        let child_count = node.children.len() as i64;
        Self {
            id: node.folder.id,
            name: node.folder.name,
            path: node.folder.path,
            parent_id: node.folder.parent_id,
            user_id: node.folder.account_id,
            created_at: node.folder.created_at.to_rfc3339(),
            updated_at: node.folder.updated_at.to_rfc3339(),
            count: FolderCounts {
                files: node.file_count,
                children: child_count,
            },
            children: node
                .children
                .into_iter()
                .map(FolderTreeResponse::from)
                .collect(),
        }
    }
}

/// An API key as exposed by the API. The raw secret never appears here.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    /// Key id.
    pub id: String,
    /// Key name.
    pub name: String,
    /// Requests per rolling hour.
    pub rate_limit: i64,
    /// Last successful authorization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<String>,
    /// Expiry timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    /// Owning account.
    pub user_id: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl From<ApiKeyRecord> for ApiKeyResponse {
    fn from(record: ApiKeyRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            rate_limit: record.rate_limit,
            last_used_at: record.last_used_at.map(|t| t.to_rfc3339()),
            expires_at: record.expires_at.map(|t| t.to_rfc3339()),
            user_id: record.account_id,
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }
}

/// Key creation response: the only place the raw secret ever appears.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeyResponse {
    /// Warning about the one-time reveal.
    pub message: String,
    /// The raw secret. Shown once, never retrievable again.
    pub key: String,
    /// The created record.
    pub api_key: ApiKeyResponse,
}

/// Aggregate key counts.
#[derive(Debug, Serialize, ToSchema)]
pub struct KeyStatsResponse {
    /// All keys.
    pub total: i64,
    /// Keys that can still authorize.
    pub active: i64,
    /// Keys past their expiry.
    pub expired: i64,
}

impl From<KeyStats> for KeyStatsResponse {
    fn from(stats: KeyStats) -> Self {
        Self {
            total: stats.total,
            active: stats.active,
            expired: stats.expired,
        }
    }
}

/// Generic success envelope for deletions.
#[derive(Debug, Serialize, ToSchema)]
pub struct SuccessResponse {
    /// Always true.
    pub success: bool,
}

impl SuccessResponse {
    /// A successful response.
    pub fn ok() -> Self {
        Self { success: true }
    }
}
