// handlers/health.rs - GET /, GET /health and GET /ready

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - service index
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Agenda API",
            "version": version,
            "description": "Agendamento de consultas com profissionais de saúde",
            "endpoints": {
                "auth": "/auth/registrar/, /auth/entrar/, /auth/sair/, /auth/perfil/, /auth/token/atualizar/",
                "profissionais": "/profissionais/[:id/] (leitura pública, escrita autenticada)",
                "consultas": "/consultas/[:id/][?profissional_id=] (leitura pública, escrita autenticada)",
                "health": "/health, /ready"
            }
        }
    }))
}

/// GET /health - liveness, fails when the store is unreachable
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": true,
                    "message": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}

/// GET /ready - store reachable and schema migrated
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let ready = match state.store.ready().await {
        Ok(ready) => ready,
        Err(e) => {
            tracing::warn!("Readiness check failed: {}", e);
            false
        }
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "success": ready,
            "data": {
                "status": if ready { "ready" } else { "not_ready" },
                "environment": state.config.environment,
            }
        })),
    )
}
