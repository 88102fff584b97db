pub mod error;
mod middleware;
mod reports;

pub use reports::HttpState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use middleware::{log_responses, set_request_context};

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/version", get(reports::version))
        .route("/privacy-policy", get(reports::privacy_policy))
        .route("/openapi.yaml", get(reports::openapi_document))
        .route("/generate-report", post(reports::generate_report))
        .route("/download-report/{token}", get(reports::download_report))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
