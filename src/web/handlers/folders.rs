//! Folder handlers for the Web API.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use utoipa;

use crate::file::DeletePolicy;
use crate::web::dto::{
    CreateFolderRequest, FolderDeleteQuery, FolderListQuery, FolderResponse, FolderTreeResponse,
    SuccessResponse, UpdateFolderRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthKey;

/// GET /api/folders - List folders under a parent (account roots by default).
#[utoipa::path(
    get,
    path = "/api/folders",
    tag = "folders",
    params(FolderListQuery),
    responses(
        (status = 200, description = "Folders with direct content counts", body = Vec<FolderResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Parent folder not found"),
        (status = 429, description = "Rate limited")
    ),
    security(("api_key" = []))
)]
pub async fn list_folders(
    State(state): State<Arc<AppState>>,
    AuthKey(ctx): AuthKey,
    Query(query): Query<FolderListQuery>,
) -> Result<Json<Vec<FolderResponse>>, ApiError> {
    let folders = state
        .folders
        .list(&ctx.account_id, query.parent_id.as_deref())
        .await
        .map_err(ApiError::from)?;

    Ok(Json(folders.into_iter().map(FolderResponse::from).collect()))
}

/// GET /api/folders/tree - The full folder forest as nested nodes.
#[utoipa::path(
    get,
    path = "/api/folders/tree",
    tag = "folders",
    responses(
        (status = 200, description = "Nested folder tree", body = Vec<FolderTreeResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 429, description = "Rate limited")
    ),
    security(("api_key" = []))
)]
pub async fn folder_tree(
    State(state): State<Arc<AppState>>,
    AuthKey(ctx): AuthKey,
) -> Result<Json<Vec<FolderTreeResponse>>, ApiError> {
    let tree = state
        .folders
        .tree(&ctx.account_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(tree.into_iter().map(FolderTreeResponse::from).collect()))
}

/// POST /api/folders - Create a folder.
#[utoipa::path(
    post,
    path = "/api/folders",
    tag = "folders",
    request_body = CreateFolderRequest,
    responses(
        (status = 201, description = "Created folder", body = FolderResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Parent folder not found"),
        (status = 409, description = "Duplicate sibling name"),
        (status = 422, description = "Invalid name"),
        (status = 429, description = "Rate limited")
    ),
    security(("api_key" = []))
)]
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    AuthKey(ctx): AuthKey,
    ValidatedJson(request): ValidatedJson<CreateFolderRequest>,
) -> Result<(axum::http::StatusCode, Json<FolderResponse>), ApiError> {
    let folder = state
        .folders
        .create(&ctx.account_id, &request.name, request.parent_id.as_deref())
        .await
        .map_err(ApiError::from)?;

    let with_counts = state
        .folders
        .get(&ctx.account_id, &folder.id)
        .await
        .map_err(ApiError::from)?;

    Ok((
        axum::http::StatusCode::CREATED,
        Json(FolderResponse::from(with_counts)),
    ))
}

/// GET /api/folders/:id - Folder details.
#[utoipa::path(
    get,
    path = "/api/folders/{id}",
    tag = "folders",
    params(("id" = String, Path, description = "Folder ID")),
    responses(
        (status = 200, description = "Folder details", body = FolderResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Folder not found"),
        (status = 429, description = "Rate limited")
    ),
    security(("api_key" = []))
)]
pub async fn get_folder(
    State(state): State<Arc<AppState>>,
    AuthKey(ctx): AuthKey,
    Path(folder_id): Path<String>,
) -> Result<Json<FolderResponse>, ApiError> {
    let folder = state
        .folders
        .get(&ctx.account_id, &folder_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(FolderResponse::from(folder)))
}

/// PUT/PATCH /api/folders/:id - Rename and/or move a folder.
///
/// `parentId: null` moves the folder to the account root. A move that would
/// place a folder inside itself or a descendant is rejected.
#[utoipa::path(
    patch,
    path = "/api/folders/{id}",
    tag = "folders",
    params(("id" = String, Path, description = "Folder ID")),
    request_body = UpdateFolderRequest,
    responses(
        (status = 200, description = "Updated folder", body = FolderResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Folder or new parent not found"),
        (status = 409, description = "Cyclic move or duplicate sibling name"),
        (status = 422, description = "Invalid name"),
        (status = 429, description = "Rate limited")
    ),
    security(("api_key" = []))
)]
pub async fn update_folder(
    State(state): State<Arc<AppState>>,
    AuthKey(ctx): AuthKey,
    Path(folder_id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateFolderRequest>,
) -> Result<Json<FolderResponse>, ApiError> {
    let new_parent = request
        .parent_id
        .as_ref()
        .map(|parent| parent.as_deref());

    state
        .folders
        .update(
            &ctx.account_id,
            &folder_id,
            request.name.as_deref(),
            new_parent,
        )
        .await
        .map_err(ApiError::from)?;

    let with_counts = state
        .folders
        .get(&ctx.account_id, &folder_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(FolderResponse::from(with_counts)))
}

/// DELETE /api/folders/:id - Delete a folder.
///
/// A non-empty folder is rejected unless `?cascade=true` is given, in which
/// case descendants and contained files are removed depth-first.
#[utoipa::path(
    delete,
    path = "/api/folders/{id}",
    tag = "folders",
    params(
        ("id" = String, Path, description = "Folder ID"),
        FolderDeleteQuery
    ),
    responses(
        (status = 200, description = "Folder deleted", body = SuccessResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Folder not found"),
        (status = 409, description = "Folder not empty and cascade not set"),
        (status = 429, description = "Rate limited")
    ),
    security(("api_key" = []))
)]
pub async fn delete_folder(
    State(state): State<Arc<AppState>>,
    AuthKey(ctx): AuthKey,
    Path(folder_id): Path<String>,
    Query(query): Query<FolderDeleteQuery>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let policy = if query.cascade {
        DeletePolicy::Cascade
    } else {
        DeletePolicy::Restrict
    };

    state
        .folders
        .delete(&ctx.account_id, &folder_id, policy)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(SuccessResponse::ok()))
}
