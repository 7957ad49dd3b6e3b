// handlers/auth.rs - /auth/* account and token handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::middleware::{ApiResponse, ApiResult, RequestGuard};
use crate::services::account_service::{
    AccessToken, AuthSession, LoginInput, Message, ProfileInput, ProfileView, RefreshInput,
    RegisterInput,
};
use crate::services::AccountService;
use crate::state::AppState;
use crate::types::Action;

/// POST /auth/registrar/ - create an account and return its first token pair
pub async fn register(
    State(state): State<AppState>,
    guard: RequestGuard,
    payload: Result<Json<RegisterInput>, JsonRejection>,
) -> ApiResult<AuthSession> {
    guard.authorize(Action::Register).await?;
    let Json(input) = payload?;
    let session = AccountService::from_state(&state).register(input).await?;
    Ok(ApiResponse::created(session))
}

/// POST /auth/entrar/
pub async fn login(
    State(state): State<AppState>,
    guard: RequestGuard,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> ApiResult<AuthSession> {
    guard.authorize(Action::Login).await?;
    let Json(input) = payload?;
    let session = AccountService::from_state(&state).login(input).await?;
    Ok(ApiResponse::success(session))
}

/// POST /auth/sair/ - revoke a refresh token
pub async fn logout(
    State(state): State<AppState>,
    guard: RequestGuard,
    payload: Result<Json<RefreshInput>, JsonRejection>,
) -> ApiResult<Message> {
    let user = guard.authorize(Action::Logout).await?.into_user()?;
    let Json(input) = payload?;
    let message = AccountService::from_state(&state).logout(&user, input).await?;
    Ok(ApiResponse::success(message))
}

/// GET /auth/perfil/
pub async fn profile(State(state): State<AppState>, guard: RequestGuard) -> ApiResult<ProfileView> {
    let user = guard.authorize(Action::ProfileRead).await?.into_user()?;
    Ok(ApiResponse::success(AccountService::from_state(&state).profile(user)))
}

/// PATCH /auth/perfil/ - only first_name and last_name are writable
pub async fn update_profile(
    State(state): State<AppState>,
    guard: RequestGuard,
    payload: Result<Json<ProfileInput>, JsonRejection>,
) -> ApiResult<ProfileView> {
    let user = guard.authorize(Action::ProfileUpdate).await?.into_user()?;
    let Json(input) = payload?;
    let profile = AccountService::from_state(&state)
        .update_profile(user, input)
        .await?;
    Ok(ApiResponse::success(profile))
}

/// POST /auth/token/atualizar/ - new access token for a refresh token
pub async fn refresh(
    State(state): State<AppState>,
    guard: RequestGuard,
    payload: Result<Json<RefreshInput>, JsonRejection>,
) -> ApiResult<AccessToken> {
    guard.authorize(Action::TokenRefresh).await?;
    let Json(input) = payload?;
    let token = AccountService::from_state(&state).refresh(input).await?;
    Ok(ApiResponse::success(token))
}
