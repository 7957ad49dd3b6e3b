// handlers/consultas.rs - /consultas/ collection and item handlers

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    Json,
};

use crate::database::models::Appointment;
use crate::middleware::{ApiResponse, ApiResult, RequestGuard};
use crate::services::appointment_service::{
    AppointmentInput, AppointmentQuery, AppointmentView, NOT_FOUND,
};
use crate::services::AppointmentService;
use crate::state::AppState;
use crate::types::Action;

use super::path_id;

/// GET /consultas/[?profissional_id=N] - most recent first
pub async fn list(
    State(state): State<AppState>,
    guard: RequestGuard,
    Query(query): Query<AppointmentQuery>,
) -> ApiResult<Vec<Appointment>> {
    guard.authorize(Action::AppointmentList).await?;
    let appointments = AppointmentService::new(state.store).list(query).await?;
    Ok(ApiResponse::success(appointments))
}

/// POST /consultas/
pub async fn create(
    State(state): State<AppState>,
    guard: RequestGuard,
    payload: Result<Json<AppointmentInput>, JsonRejection>,
) -> ApiResult<Appointment> {
    guard.authorize(Action::AppointmentCreate).await?;
    let Json(input) = payload?;
    let appointment = AppointmentService::new(state.store).create(input).await?;
    Ok(ApiResponse::created(appointment))
}

/// GET /consultas/:id/ - detail view with the professional inlined
pub async fn get(
    State(state): State<AppState>,
    guard: RequestGuard,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<AppointmentView> {
    let action = Action::AppointmentRetrieve;
    guard.authorize(action).await?;
    let id = path_id(path, NOT_FOUND)?;
    let appointment = AppointmentService::new(state.store)
        .get(id, action.policy().shape)
        .await?;
    Ok(ApiResponse::success(appointment))
}

/// PATCH /consultas/:id/
pub async fn patch(
    State(state): State<AppState>,
    guard: RequestGuard,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<AppointmentInput>, JsonRejection>,
) -> ApiResult<Appointment> {
    guard.authorize(Action::AppointmentUpdate).await?;
    let id = path_id(path, NOT_FOUND)?;
    let Json(input) = payload?;
    let appointment = AppointmentService::new(state.store).update(id, input).await?;
    Ok(ApiResponse::success(appointment))
}

/// DELETE /consultas/:id/
pub async fn delete(
    State(state): State<AppState>,
    guard: RequestGuard,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<()> {
    guard.authorize(Action::AppointmentDelete).await?;
    let id = path_id(path, NOT_FOUND)?;
    AppointmentService::new(state.store).delete(id).await?;
    Ok(ApiResponse::no_content())
}
