use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `status` of a live extraction.
pub const SUCCESS_STATUS: &str = "SUCCESS";
/// `status` of a synthetic extraction produced without remote credentials.
pub const DEMO_STATUS: &str = "SUCCESS (DEMO MODE)";

/// Response body of a successful extraction.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OcrResponse {
    /// Recognized text, lines separated by `\n`. May be empty.
    pub extracted_text: String,
    /// `SUCCESS` or `SUCCESS (DEMO MODE)`.
    pub status: String,
    pub message: String,
    /// Original filename of the upload, if the client sent one.
    pub filename: Option<String>,
    #[schema(value_type = String)]
    pub processed_at: DateTime<Utc>,
    /// Wall-clock time spent on the remote call (fixed in demo mode).
    pub processing_time_ms: u64,
}

/// Query parameters of `POST /api/ocr/extract-from-url`.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ExtractFromUrlParams {
    /// Image URL. Accepted but never fetched.
    pub url: Option<String>,
}
