//! Request DTOs for the Web API.
//!
//! Field names follow the dashboard client's camelCase contract.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::validation::{double_option, no_control_chars, not_empty_trimmed};

/// Query parameters for file listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct FileListQuery {
    /// 1-indexed page number.
    pub page: Option<u32>,
    /// Items per page.
    pub limit: Option<u32>,
    /// Free-text search over name and description.
    pub search: Option<String>,
    /// Comma-separated tag list; files must carry every tag.
    pub tags: Option<String>,
    /// Exact mime type.
    pub mime_type: Option<String>,
    /// Exact folder id.
    pub folder_id: Option<String>,
}

impl FileListQuery {
    /// Split the comma-separated tag filter into individual tags.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Partial file update. Absent fields stay untouched; explicit `null`
/// clears nullable fields (`folderId: null` moves the file to the root).
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFileRequest {
    /// New display name.
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    /// New tag set.
    pub tags: Option<Vec<String>>,
    /// New description.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    /// New structured metadata.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Option<serde_json::Value>>,
    /// New containing folder.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub folder_id: Option<Option<String>>,
}

/// Query parameters for folder listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct FolderListQuery {
    /// Parent folder; account roots when omitted.
    pub parent_id: Option<String>,
}

/// Folder creation request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    /// Folder name, unique among siblings.
    #[validate(length(min = 1, max = 255), custom(function = "not_empty_trimmed"))]
    pub name: String,
    /// Parent folder; root when omitted.
    pub parent_id: Option<String>,
}

/// Folder rename/move request. `parentId: null` moves to the root.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFolderRequest {
    /// New name.
    #[validate(length(min = 1, max = 255), custom(function = "no_control_chars"))]
    pub name: Option<String>,
    /// New parent folder.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub parent_id: Option<Option<String>>,
}

/// Query parameters for folder deletion.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FolderDeleteQuery {
    /// Delete a non-empty folder together with its contents.
    #[serde(default)]
    pub cascade: bool,
}

/// API key creation request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeyRequest {
    /// Human-readable key name.
    #[validate(length(min = 1, max = 100), custom(function = "not_empty_trimmed"))]
    pub name: String,
    /// Requests per rolling hour; server default when omitted.
    pub rate_limit: Option<u32>,
    /// Expiry timestamp; never expires when omitted.
    pub expires_at: Option<DateTime<Utc>>,
}

/// API key update request. Only the rate limit is mutable.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateKeyRequest {
    /// Requests per rolling hour.
    #[validate(range(min = 1))]
    pub rate_limit: u32,
}
