//! chartdeck-api — REST API for Chartdeck.
//!
//! # Public routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api` | Welcome message |
//! | GET | `/api/v1/projects` | List project ids, newest first |
//! | POST | `/api/v1/projects` | Create a project (multipart) |
//! | GET | `/api/v1/projects/{id}` | Project status |
//! | PUT | `/api/v1/projects/{id}` | Replace the values file (multipart) |
//! | DELETE | `/api/v1/projects/{id}` | Tear a project down |
//!
//! # Job write-back routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | PATCH | `/internal/v1/projects/{id}` | Report endpoint and release metadata |
//! | DELETE | `/internal/v1/projects/{id}` | Remove the record after teardown |

pub mod handlers;
pub mod internal;

#[cfg(test)]
mod test_support;

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use chartdeck_core::CorsConfig;
use chartdeck_orchestrator::Orchestrator;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Largest accepted request body. Chart uploads are small YAML files.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Orchestrator,
}

/// Build the complete router: public API, job write-back, CORS and tracing.
pub fn build_router(orchestrator: Orchestrator, cors: &CorsConfig) -> Router {
    let state = ApiState { orchestrator };

    let public = Router::new()
        .route(
            "/projects",
            get(handlers::list_projects).post(handlers::create_project),
        )
        .route(
            "/projects/{id}",
            get(handlers::get_project)
                .put(handlers::update_project)
                .delete(handlers::delete_project),
        )
        .with_state(state.clone());

    let internal = Router::new()
        .route(
            "/projects/{id}",
            axum::routing::patch(internal::report_progress).delete(internal::remove_project),
        )
        .with_state(state);

    Router::new()
        .route("/api", get(handlers::welcome))
        .nest("/api/v1", public)
        .nest("/internal/v1", internal)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
}

/// CORS for the browser frontend. `"*"` alone allows any origin.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .max_age(Duration::from_secs(config.max_age_secs));

    if config.allowed_origins.iter().any(|o| o == "*") {
        if config.allowed_origins.len() > 1 {
            tracing::warn!(
                origins = ?config.allowed_origins,
                "'*' in CORS origins overrides the other entries"
            );
        }
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::error!(%origin, "invalid CORS origin, skipping");
                None
            }
        })
        .collect();

    tracing::debug!(origins = ?config.allowed_origins, "CORS configured");
    cors.allow_origin(AllowOrigin::list(allowed))
}
