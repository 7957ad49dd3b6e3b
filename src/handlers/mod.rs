// handlers/mod.rs - HTTP handlers grouped by resource
//
// Every handler starts with `RequestGuard::authorize` for its `Action`, so
// authentication, permission and throttling run before the body is parsed.

pub mod auth;
pub mod consultas;
pub mod health;
pub mod profissionais;

use axum::extract::{rejection::PathRejection, Path};

use crate::error::ApiError;

/// Item id from the path. An id that does not parse names no row, so it
/// answers the resource's 404 like any other missing id.
pub(crate) fn path_id(
    path: Result<Path<i64>, PathRejection>,
    not_found: &str,
) -> Result<i64, ApiError> {
    path.map(|Path(id)| id).map_err(|rejection| {
        tracing::debug!("Unusable item id in path: {}", rejection);
        ApiError::not_found(not_found)
    })
}
