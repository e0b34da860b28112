pub mod config;
pub mod consumers;
pub mod coordinator;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;

use std::time::Duration;

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::state::AppState;

pub use crate::coordinator::Coordinator;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Code Judge Coordinator API",
        version = "1.0.0",
        description = "Submission intake and judge result tracking"
    ),
    tags(
        (name = "Submissions", description = "Graded submissions and test runs"),
    ),
)]
struct ApiDoc;

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cors
        .allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(cors.max_age))
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let cors = cors_layer(&state.config.server.cors);
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes())
        .split_for_parts();

    router
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(cors)
}
