use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{
            AuthResponse, ChangePasswordRequest, ChangePasswordResponse, LoginRequest, Principal,
            RefreshRequest,
        },
        extractors::AdminSession,
        jwt::JwtKeys,
        services,
    },
    error::AppResult,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/session", get(session))
}

pub fn account_routes() -> Router<AppState> {
    Router::new().route("/account/change-password", post(change_password))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let res = services::login(state.credentials.as_ref(), &keys, payload).await?;
    Ok(Json(res))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let res = services::refresh(state.credentials.as_ref(), &keys, payload).await?;
    Ok(Json(res))
}

#[instrument(skip_all)]
pub async fn session(AdminSession(principal): AdminSession) -> Json<Principal> {
    Json(principal)
}

#[instrument(skip_all, fields(email = %principal.email))]
pub async fn change_password(
    State(state): State<AppState>,
    AdminSession(principal): AdminSession,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> AppResult<Json<ChangePasswordResponse>> {
    let Json(payload) = payload?;
    let res = services::change_password(state.credentials.as_ref(), &principal, payload).await?;
    info!("password changed; client must sign in again");
    Ok(Json(res))
}
