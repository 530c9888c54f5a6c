use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    auth::extractors::AdminSession,
    circle::token_cache::AUTH_TOKEN_TAG,
    error::{AppError, AppResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RevalidateParams {
    pub tag: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RevalidateResponse {
    pub revalidated: bool,
    pub tag: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/revalidate", post(revalidate))
}

/// Drops the cached value behind `tag`. Unknown tags are acknowledged.
#[instrument(skip_all)]
pub async fn revalidate(
    State(state): State<AppState>,
    _session: AdminSession,
    params: Result<Query<RevalidateParams>, QueryRejection>,
) -> AppResult<Json<RevalidateResponse>> {
    let Query(params) = params?;
    let tag = params
        .tag
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("Tag parameter is required".into()))?;

    if tag == AUTH_TOKEN_TAG {
        state.circle.invalidate_token().await;
    }
    info!(%tag, "revalidated");

    Ok(Json(RevalidateResponse {
        revalidated: true,
        tag,
    }))
}
