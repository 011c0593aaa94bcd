//! API key handlers for the Web API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use utoipa;

use crate::web::dto::{
    ApiKeyResponse, CreateKeyRequest, CreateKeyResponse, KeyStatsResponse, SuccessResponse,
    UpdateKeyRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthKey;

/// GET /api/keys - List the account's keys. Raw secrets never appear.
#[utoipa::path(
    get,
    path = "/api/keys",
    tag = "keys",
    responses(
        (status = 200, description = "API keys", body = Vec<ApiKeyResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 429, description = "Rate limited")
    ),
    security(("api_key" = []))
)]
pub async fn list_keys(
    State(state): State<Arc<AppState>>,
    AuthKey(ctx): AuthKey,
) -> Result<Json<Vec<ApiKeyResponse>>, ApiError> {
    let keys = state
        .keys
        .list(&ctx.account_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(keys.into_iter().map(ApiKeyResponse::from).collect()))
}

/// POST /api/keys - Issue a new key.
///
/// The response is the only place the raw secret ever appears; it cannot be
/// retrieved again afterwards.
#[utoipa::path(
    post,
    path = "/api/keys",
    tag = "keys",
    request_body = CreateKeyRequest,
    responses(
        (status = 201, description = "Created key with its one-time secret", body = CreateKeyResponse),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Invalid name, rate limit, or expiry"),
        (status = 429, description = "Rate limited")
    ),
    security(("api_key" = []))
)]
pub async fn create_key(
    State(state): State<Arc<AppState>>,
    AuthKey(ctx): AuthKey,
    ValidatedJson(request): ValidatedJson<CreateKeyRequest>,
) -> Result<(StatusCode, Json<CreateKeyResponse>), ApiError> {
    let (record, raw_secret) = state
        .keys
        .issue(
            &ctx.account_id,
            &request.name,
            request.rate_limit,
            request.expires_at,
        )
        .await
        .map_err(ApiError::from)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateKeyResponse {
            message: "API key created. Store it now: it will not be shown again.".to_string(),
            key: raw_secret,
            api_key: ApiKeyResponse::from(record),
        }),
    ))
}

/// GET /api/keys/stats - Aggregate key counts for the account.
#[utoipa::path(
    get,
    path = "/api/keys/stats",
    tag = "keys",
    responses(
        (status = 200, description = "Key counts", body = KeyStatsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 429, description = "Rate limited")
    ),
    security(("api_key" = []))
)]
pub async fn key_stats(
    State(state): State<Arc<AppState>>,
    AuthKey(ctx): AuthKey,
) -> Result<Json<KeyStatsResponse>, ApiError> {
    let stats = state
        .keys
        .stats(&ctx.account_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(KeyStatsResponse::from(stats)))
}

/// GET /api/keys/:id - Key details.
#[utoipa::path(
    get,
    path = "/api/keys/{id}",
    tag = "keys",
    params(("id" = String, Path, description = "Key ID")),
    responses(
        (status = 200, description = "Key details", body = ApiKeyResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Key not found"),
        (status = 429, description = "Rate limited")
    ),
    security(("api_key" = []))
)]
pub async fn get_key(
    State(state): State<Arc<AppState>>,
    AuthKey(ctx): AuthKey,
    Path(key_id): Path<String>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    let key = state
        .keys
        .get(&ctx.account_id, &key_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ApiKeyResponse::from(key)))
}

/// PUT /api/keys/:id - Update a key's rate limit.
#[utoipa::path(
    put,
    path = "/api/keys/{id}",
    tag = "keys",
    params(("id" = String, Path, description = "Key ID")),
    request_body = UpdateKeyRequest,
    responses(
        (status = 200, description = "Updated key", body = ApiKeyResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Key not found"),
        (status = 422, description = "Invalid rate limit"),
        (status = 429, description = "Rate limited")
    ),
    security(("api_key" = []))
)]
pub async fn update_key(
    State(state): State<Arc<AppState>>,
    AuthKey(ctx): AuthKey,
    Path(key_id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateKeyRequest>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    let key = state
        .keys
        .update_rate_limit(&ctx.account_id, &key_id, request.rate_limit)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ApiKeyResponse::from(key)))
}

/// DELETE /api/keys/:id - Revoke a key.
///
/// Revocation is immediate: the secret can never authorize again, including
/// the key used to make this very request.
#[utoipa::path(
    delete,
    path = "/api/keys/{id}",
    tag = "keys",
    params(("id" = String, Path, description = "Key ID")),
    responses(
        (status = 200, description = "Key revoked", body = SuccessResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Key not found"),
        (status = 429, description = "Rate limited")
    ),
    security(("api_key" = []))
)]
pub async fn delete_key(
    State(state): State<Arc<AppState>>,
    AuthKey(ctx): AuthKey,
    Path(key_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .keys
        .revoke(&ctx.account_id, &key_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(SuccessResponse::ok()))
}
