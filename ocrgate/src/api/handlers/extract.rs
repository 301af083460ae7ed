//! Text extraction handlers.
//!
//! `POST /api/ocr/extract` reads the `file` part of a multipart upload and
//! hands it to [`OcrService`](crate::services::OcrService). The outcome is
//! mapped onto an [`OcrResponse`] or an [`ErrorResponse`] body.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Query, State};
use chrono::Utc;
use tracing::{error, info, Instrument};
use uuid::Uuid;

use crate::api::dto::{ExtractFromUrlParams, OcrResponse, DEMO_STATUS, SUCCESS_STATUS};
use crate::api::response::{ApiResponse, ErrorCode, ErrorResponse};
use crate::api::AppState;
use crate::error::ErrorKind;
use crate::services::{ImagePayload, OcrMode, OcrOutcome};

/// Name of the multipart part carrying the image.
pub const FILE_FIELD: &str = "file";

const LIVE_MESSAGE: &str = "Text extraction completed successfully";
const DEMO_MESSAGE: &str =
    "Text extraction completed in demo mode (remote OCR credentials not configured)";
const URL_NOT_IMPLEMENTED_MESSAGE: &str =
    "URL-based OCR is not yet implemented. Please use the /extract endpoint with file upload.";

/// `POST /api/ocr/extract`
///
/// Accepts a multipart form with a `file` field holding a JPEG, PNG, BMP,
/// GIF or WEBP image.
#[utoipa::path(
    post,
    path = "/api/ocr/extract",
    tag = "ocr",
    operation_id = "ocr.extract",
    request_body(content_type = "multipart/form-data", content = String, description = "Image upload in the `file` field"),
    responses(
        (status = 200, description = "Text extracted", body = OcrResponse),
        (status = 400, description = "Missing, empty or unsupported upload", body = ErrorResponse),
        (status = 500, description = "Upload unreadable or remote OCR failure", body = ErrorResponse),
        (status = 503, description = "Server shutting down", body = ErrorResponse),
    )
)]
pub async fn extract_text(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResponse<OcrResponse> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("ocr_request", %request_id);
    async move {
        let mut multipart = match multipart {
            Ok(m) => m,
            Err(rejection) => {
                error!(error = %rejection, "Request is not a multipart upload");
                return ApiResponse::error(
                    ErrorCode::InvalidInput,
                    format!("Expected a multipart/form-data request: {rejection}"),
                );
            }
        };

        let payload = match read_file_part(&mut multipart).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                error!("No file provided in request");
                return ApiResponse::error(ErrorCode::NoFile, "No file provided");
            }
            Err(response) => return response,
        };

        info!(
            filename = payload.display_name(),
            content_type = ?payload.content_type,
            bytes = payload.bytes.len(),
            "OCR request received"
        );

        let cancel = state.shutdown.child_token();
        let outcome = state.ocr.process(&payload, &cancel).await;
        outcome_response(outcome, payload.filename)
    }
    .instrument(span)
    .await
}

/// Pull the `file` part out of the form, skipping every other part.
async fn read_file_part(
    multipart: &mut Multipart,
) -> Result<Option<ImagePayload>, ApiResponse<OcrResponse>> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(e) => {
                error!(error = %e, "Malformed multipart body");
                return Err(ApiResponse::error(
                    ErrorCode::FileReadError,
                    format!("Error reading file: {e}"),
                ));
            }
        };

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = match field.bytes().await {
            Ok(b) => b,
            Err(e) => {
                error!(error = %e, "Error reading uploaded file");
                return Err(ApiResponse::error(
                    ErrorCode::FileReadError,
                    format!("Error reading file: {e}"),
                ));
            }
        };

        return Ok(Some(ImagePayload {
            bytes: bytes.to_vec(),
            content_type,
            filename,
        }));
    }
}

fn outcome_response(outcome: OcrOutcome, filename: Option<String>) -> ApiResponse<OcrResponse> {
    match outcome {
        OcrOutcome::Success {
            text,
            elapsed_ms,
            mode,
        } => {
            let (status, message) = match mode {
                OcrMode::Live => (SUCCESS_STATUS, LIVE_MESSAGE),
                OcrMode::Demo => (DEMO_STATUS, DEMO_MESSAGE),
            };
            info!(?mode, elapsed_ms, "OCR processing completed");
            ApiResponse::success(OcrResponse {
                extracted_text: text,
                status: status.to_string(),
                message: message.to_string(),
                filename,
                processed_at: Utc::now(),
                processing_time_ms: elapsed_ms,
            })
        }
        OcrOutcome::Failure {
            kind: ErrorKind::InvalidInput,
            message,
        } => ApiResponse::error(ErrorCode::InvalidInput, message),
        OcrOutcome::Failure { kind, message } => {
            error!(?kind, %message, "OCR processing failed");
            ApiResponse::error(
                ErrorCode::from(kind),
                format!("Error processing image: {message}"),
            )
        }
    }
}

/// `POST /api/ocr/extract-from-url`
///
/// Placeholder for URL-based extraction. Always answers 501.
#[utoipa::path(
    post,
    path = "/api/ocr/extract-from-url",
    tag = "ocr",
    operation_id = "ocr.extractFromUrl",
    params(ExtractFromUrlParams),
    responses(
        (status = 501, description = "URL-based extraction is not available", body = ErrorResponse),
    )
)]
pub async fn extract_from_url(
    Query(params): Query<ExtractFromUrlParams>,
) -> ApiResponse<OcrResponse> {
    info!(
        url = params.url.as_deref().unwrap_or("(none)"),
        "OCR request received for URL"
    );
    ApiResponse::error(ErrorCode::NotImplemented, URL_NOT_IMPLEMENTED_MESSAGE)
}
