use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::openapi;
use super::AppState;

fn ocr_router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/extract",
            post(handlers::extract_text).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/extract-from-url", post(handlers::extract_from_url))
        .route("/openapi.json", get(openapi::openapi_json))
        .merge(openapi::redoc_router())
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api/ocr", ocr_router(state.config.server.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
