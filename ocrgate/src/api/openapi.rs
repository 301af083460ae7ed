use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ocrgate API",
        description = "Image text extraction backed by a remote cloud OCR service",
        license(name = "MIT"),
    ),
    paths(
        handlers::health::health_check,
        handlers::extract::extract_text,
        handlers::extract::extract_from_url,
    ),
    components(schemas(
        dto::OcrResponse,
        response::ErrorResponse,
        response::ErrorCode,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "ocr", description = "Text extraction from uploaded images"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
