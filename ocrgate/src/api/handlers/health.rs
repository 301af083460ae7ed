use tracing::info;

/// Plain-text body of the health endpoint.
pub const HEALTH_MESSAGE: &str = "Azure OCR API is running";

/// `GET /api/ocr/health`
#[utoipa::path(
    get,
    path = "/api/ocr/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = String, content_type = "text/plain"),
    )
)]
pub async fn health_check() -> &'static str {
    info!("Health check request received");
    HEALTH_MESSAGE
}
