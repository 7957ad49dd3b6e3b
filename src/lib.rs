pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;
pub mod throttle;
pub mod types;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub use state::AppState;

/// Full HTTP surface over the given state
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security);
    let body_limit = state.config.api.max_request_size_bytes;
    let request_logging = state.config.api.enable_request_logging;

    let router = Router::new()
        // Public
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .merge(auth_routes())
        .merge(profissionais_routes())
        .merge(consultas_routes())
        .fallback(fallback)
        .with_state(state)
        // Global middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors);

    if request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

fn auth_routes() -> Router<AppState> {
    use handlers::auth;

    Router::new()
        .route("/auth/registrar/", post(auth::register))
        .route("/auth/entrar/", post(auth::login))
        .route("/auth/sair/", post(auth::logout))
        .route("/auth/perfil/", get(auth::profile).patch(auth::update_profile))
        .route("/auth/token/atualizar/", post(auth::refresh))
}

fn profissionais_routes() -> Router<AppState> {
    use handlers::profissionais;

    Router::new()
        .route(
            "/profissionais/",
            get(profissionais::list).post(profissionais::create),
        )
        .route(
            "/profissionais/:id/",
            get(profissionais::get)
                .patch(profissionais::patch)
                .delete(profissionais::delete),
        )
}

fn consultas_routes() -> Router<AppState> {
    use handlers::consultas;

    Router::new()
        .route("/consultas/", get(consultas::list).post(consultas::create))
        .route(
            "/consultas/:id/",
            get(consultas::get)
                .patch(consultas::patch)
                .delete(consultas::delete),
        )
}

async fn fallback() -> error::ApiError {
    error::ApiError::not_found("Recurso não encontrado.")
}

fn cors_layer(security: &config::SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
