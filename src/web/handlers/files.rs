//! File handlers for the Web API.

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;
use utoipa;

use crate::file::{FileQuery, FileUpdate, UploadRequest};
use crate::web::dto::{
    FileListQuery, FileListResponse, FileResponse, PaginationMeta, SuccessResponse,
    UpdateFileRequest, UploadResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthKey;

/// Generate a safe Content-Disposition header value for file downloads.
///
/// Sanitizes the filename to prevent header injection and uses RFC 5987
/// encoding for non-ASCII filenames.
fn content_disposition_header(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' => '_',
            '\\' => '_',
            _ => c,
        })
        .collect();

    if filename.is_ascii() && !filename.chars().any(|c| c.is_control() || c == '"' || c == '\\') {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let encoded = urlencoding::encode(filename);

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    )
}

/// Build a raw content response with download headers.
fn content_response(
    content: Vec<u8>,
    content_type: &str,
    filename: &str,
) -> Result<Response<Body>, ApiError> {
    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(filename),
        )
        .header(header::CONTENT_LENGTH, content.len())
        .body(Body::from(content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// GET /api/files - List files with filters and pagination.
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    params(FileListQuery),
    responses(
        (status = 200, description = "Files and pagination metadata", body = FileListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Invalid pagination bounds"),
        (status = 429, description = "Rate limited")
    ),
    security(("api_key" = []))
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    AuthKey(ctx): AuthKey,
    Query(query): Query<FileListQuery>,
) -> Result<Json<FileListResponse>, ApiError> {
    let page = state.resolve_page(query.page, query.limit)?;

    let filter = FileQuery {
        search: query.search.clone().filter(|s| !s.trim().is_empty()),
        tags: query.tag_list(),
        mime_type: query.mime_type.clone().filter(|m| !m.trim().is_empty()),
        folder_id: query.folder_id.clone().filter(|f| !f.trim().is_empty()),
    };

    let (files, total) = state
        .files
        .list(&ctx.account_id, &filter, &page)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(FileListResponse {
        files: files.into_iter().map(FileResponse::from).collect(),
        pagination: PaginationMeta {
            page: page.page,
            limit: page.limit,
            total,
            total_pages: page.total_pages(total),
        },
    }))
}

/// POST /api/files/upload - Upload one or more files.
///
/// Multipart body: repeated `file` parts plus optional `tags` (JSON array
/// string), `description`, and `folderId` fields shared by the whole batch.
/// Each file succeeds or fails independently.
#[utoipa::path(
    post,
    path = "/api/files/upload",
    tag = "files",
    responses(
        (status = 200, description = "Created records and per-file failures", body = UploadResponse),
        (status = 400, description = "No file part in the body"),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Every file in the batch failed", body = UploadResponse),
        (status = 429, description = "Rate limited")
    ),
    security(("api_key" = []))
)]
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    AuthKey(ctx): AuthKey,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut files: Vec<(String, Option<String>, Vec<u8>)> = Vec::new();
    let mut tags: Vec<String> = Vec::new();
    let mut description: Option<String> = None;
    let mut folder_id: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "unnamed".to_string());
                let content_type = field.content_type().map(str::to_string);
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to read file content: {}", e);
                        ApiError::bad_request("Failed to read file")
                    })?
                    .to_vec();
                files.push((file_name, content_type, content));
            }
            "tags" => {
                let raw = field.text().await.map_err(|e| {
                    tracing::error!("Failed to read tags field: {}", e);
                    ApiError::bad_request("Invalid tags field")
                })?;
                tags = serde_json::from_str(&raw)
                    .map_err(|_| ApiError::bad_request("tags must be a JSON array of strings"))?;
            }
            "description" => {
                description = Some(field.text().await.map_err(|e| {
                    tracing::error!("Failed to read description: {}", e);
                    ApiError::bad_request("Invalid description")
                })?);
            }
            "folderId" => {
                let value = field.text().await.map_err(|e| {
                    tracing::error!("Failed to read folderId: {}", e);
                    ApiError::bad_request("Invalid folderId")
                })?;
                if !value.trim().is_empty() {
                    folder_id = Some(value);
                }
            }
            _ => {}
        }
    }

    if files.is_empty() {
        return Err(ApiError::bad_request("No file provided"));
    }

    // Shared fields may arrive after the file parts, so requests are built
    // only once the whole body has been consumed
    let requests: Vec<UploadRequest> = files
        .into_iter()
        .map(|(file_name, content_type, content)| {
            let mut request = UploadRequest::new(file_name, content)
                .with_tags(tags.clone());
            if let Some(mime) = content_type {
                request = request.with_mime_type(mime);
            }
            if let Some(desc) = &description {
                request = request.with_description(desc.clone());
            }
            if let Some(folder) = &folder_id {
                request = request.with_folder(folder.clone());
            }
            request
        })
        .collect();

    let outcome = state.files.upload_batch(&ctx.account_id, requests).await;

    let status = if outcome.created.is_empty() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    };

    Ok((status, Json(UploadResponse::from(outcome))))
}

/// GET /api/files/:id - Get file metadata.
#[utoipa::path(
    get,
    path = "/api/files/{id}",
    tag = "files",
    params(("id" = String, Path, description = "File ID")),
    responses(
        (status = 200, description = "File metadata", body = FileResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found"),
        (status = 429, description = "Rate limited")
    ),
    security(("api_key" = []))
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    AuthKey(ctx): AuthKey,
    Path(file_id): Path<String>,
) -> Result<Json<FileResponse>, ApiError> {
    let record = state
        .files
        .get(&ctx.account_id, &file_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(FileResponse::from(record)))
}

/// PUT/PATCH /api/files/:id - Partially update a file.
///
/// Only supplied fields change; `folderId: null` moves the file to the root.
#[utoipa::path(
    patch,
    path = "/api/files/{id}",
    tag = "files",
    params(("id" = String, Path, description = "File ID")),
    request_body = UpdateFileRequest,
    responses(
        (status = 200, description = "Updated file", body = FileResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File or target folder not found"),
        (status = 422, description = "Invalid fields"),
        (status = 429, description = "Rate limited")
    ),
    security(("api_key" = []))
)]
pub async fn update_file(
    State(state): State<Arc<AppState>>,
    AuthKey(ctx): AuthKey,
    Path(file_id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateFileRequest>,
) -> Result<Json<FileResponse>, ApiError> {
    let update = FileUpdate {
        name: request.name,
        tags: request.tags,
        description: request.description,
        metadata: request.metadata,
        folder_id: request.folder_id,
    };

    let record = state
        .files
        .update(&ctx.account_id, &file_id, update)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(FileResponse::from(record)))
}

/// DELETE /api/files/:id - Delete a file.
#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "files",
    params(("id" = String, Path, description = "File ID")),
    responses(
        (status = 200, description = "File deleted", body = SuccessResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found"),
        (status = 429, description = "Rate limited")
    ),
    security(("api_key" = []))
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    AuthKey(ctx): AuthKey,
    Path(file_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .files
        .delete(&ctx.account_id, &file_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(SuccessResponse::ok()))
}

/// GET /api/files/:id/download - Download a file's content.
#[utoipa::path(
    get,
    path = "/api/files/{id}/download",
    tag = "files",
    params(("id" = String, Path, description = "File ID")),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File not found"),
        (status = 429, description = "Rate limited")
    ),
    security(("api_key" = []))
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    AuthKey(ctx): AuthKey,
    Path(file_id): Path<String>,
) -> Result<Response<Body>, ApiError> {
    let (record, content) = state
        .files
        .download(&ctx.account_id, &file_id)
        .await
        .map_err(ApiError::from)?;

    let content_type = if record.mime_type.is_empty() {
        mime_guess::from_path(&record.original_name)
            .first_or_octet_stream()
            .to_string()
    } else {
        record.mime_type.clone()
    };

    content_response(content, &content_type, &record.original_name)
}

/// GET /api/files/:id/thumbnail - Fetch a file's thumbnail.
#[utoipa::path(
    get,
    path = "/api/files/{id}/thumbnail",
    tag = "files",
    params(("id" = String, Path, description = "File ID")),
    responses(
        (status = 200, description = "Thumbnail content", content_type = "image/png"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "File or thumbnail not found"),
        (status = 429, description = "Rate limited")
    ),
    security(("api_key" = []))
)]
pub async fn thumbnail_file(
    State(state): State<Arc<AppState>>,
    AuthKey(ctx): AuthKey,
    Path(file_id): Path<String>,
) -> Result<Response<Body>, ApiError> {
    let (record, content) = state
        .files
        .thumbnail(&ctx.account_id, &file_id)
        .await
        .map_err(ApiError::from)?;

    // Thumbnails are always re-encoded as PNG
    content_response(content, "image/png", &format!("{}.thumb.png", record.name))
}
