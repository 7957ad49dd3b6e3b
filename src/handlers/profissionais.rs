// handlers/profissionais.rs - /profissionais/ collection and item handlers

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};

use crate::middleware::{ApiResponse, ApiResult, RequestGuard};
use crate::services::professional_service::{ProfessionalInput, ProfessionalView, NOT_FOUND};
use crate::services::ProfessionalService;
use crate::state::AppState;
use crate::types::Action;

use super::path_id;

/// GET /profissionais/ - active professionals ordered by name
pub async fn list(State(state): State<AppState>, guard: RequestGuard) -> ApiResult<Vec<ProfessionalView>> {
    guard.authorize(Action::ProfessionalList).await?;
    let professionals = ProfessionalService::new(state.store).list().await?;
    Ok(ApiResponse::success(professionals))
}

/// POST /profissionais/
pub async fn create(
    State(state): State<AppState>,
    guard: RequestGuard,
    payload: Result<Json<ProfessionalInput>, JsonRejection>,
) -> ApiResult<ProfessionalView> {
    guard.authorize(Action::ProfessionalCreate).await?;
    let Json(input) = payload?;
    let professional = ProfessionalService::new(state.store).create(input).await?;
    Ok(ApiResponse::created(professional))
}

/// GET /profissionais/:id/
pub async fn get(
    State(state): State<AppState>,
    guard: RequestGuard,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<ProfessionalView> {
    guard.authorize(Action::ProfessionalRetrieve).await?;
    let id = path_id(path, NOT_FOUND)?;
    let professional = ProfessionalService::new(state.store).get(id).await?;
    Ok(ApiResponse::success(professional))
}

/// PATCH /profissionais/:id/ - partial update, `ativo: false` deactivates
pub async fn patch(
    State(state): State<AppState>,
    guard: RequestGuard,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ProfessionalInput>, JsonRejection>,
) -> ApiResult<ProfessionalView> {
    guard.authorize(Action::ProfessionalUpdate).await?;
    let id = path_id(path, NOT_FOUND)?;
    let Json(input) = payload?;
    let professional = ProfessionalService::new(state.store).update(id, input).await?;
    Ok(ApiResponse::success(professional))
}

/// DELETE /profissionais/:id/ - removes the professional and its appointments
pub async fn delete(
    State(state): State<AppState>,
    guard: RequestGuard,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<()> {
    guard.authorize(Action::ProfessionalDelete).await?;
    let id = path_id(path, NOT_FOUND)?;
    ProfessionalService::new(state.store).delete(id).await?;
    Ok(ApiResponse::no_content())
}
