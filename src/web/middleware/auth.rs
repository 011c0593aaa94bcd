//! API key authentication extractor.
//!
//! Every `/api` route authenticates through this extractor: the presented
//! secret is authorized by the key service, which also enforces the per-key
//! rolling-window quota. Handlers receive the established account scope and
//! never see the raw secret again.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::apikey::AuthContext;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Header carrying the API key secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Extractor for authenticated requests.
///
/// Accepts the secret in `X-API-Key` or as `Authorization: Bearer <key>`.
#[derive(Debug, Clone)]
pub struct AuthKey(pub AuthContext);

/// Pull the presented secret out of the request headers.
fn presented_secret(parts: &Parts) -> Option<String> {
    if let Some(value) = parts
        .headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        let value = value.trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let secret = presented_secret(parts)
            .ok_or_else(|| ApiError::unauthorized("missing api key"))?;

        let context = state.keys.authorize(&secret).await.map_err(ApiError::from)?;

        Ok(AuthKey(context))
    }
}
