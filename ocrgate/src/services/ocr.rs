use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::ErrorKind;
use crate::ocr::{cancellable_sleep, OcrClient};

/// MIME types accepted for OCR. Matched exactly and case-sensitively.
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/bmp",
    "image/gif",
    "image/webp",
];

/// Simulated processing time reported by demo outcomes.
pub const DEMO_DELAY: Duration = Duration::from_millis(500);

const EMPTY_FILE_MESSAGE: &str = "File is empty. Please upload a valid image.";
const INVALID_TYPE_MESSAGE: &str = "Invalid file type. Supported types: JPEG, PNG, BMP, GIF, WEBP";

/// An uploaded image as received from the caller.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub filename: Option<String>,
}

impl ImagePayload {
    pub fn display_name(&self) -> &str {
        self.filename.as_deref().unwrap_or("(unnamed)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrMode {
    Live,
    /// Synthetic output produced because no remote credentials are configured.
    Demo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrOutcome {
    Success {
        text: String,
        elapsed_ms: u64,
        mode: OcrMode,
    },
    Failure {
        kind: ErrorKind,
        message: String,
    },
}

impl OcrOutcome {
    fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        OcrOutcome::Failure {
            kind,
            message: message.into(),
        }
    }
}

pub fn is_supported_mime(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| SUPPORTED_MIME_TYPES.contains(&ct))
}

/// Check the payload before any remote work is attempted.
pub fn validate(payload: &ImagePayload) -> Option<OcrOutcome> {
    if payload.bytes.is_empty() {
        error!(filename = payload.display_name(), "Uploaded file is empty");
        return Some(OcrOutcome::failure(ErrorKind::InvalidInput, EMPTY_FILE_MESSAGE));
    }
    if !is_supported_mime(payload.content_type.as_deref()) {
        error!(content_type = ?payload.content_type, "Invalid file type");
        return Some(OcrOutcome::failure(ErrorKind::InvalidInput, INVALID_TYPE_MESSAGE));
    }
    None
}

/// Text shown in place of OCR output when running without credentials.
pub fn demo_text(payload: &ImagePayload) -> String {
    format!(
        "This is a demo OCR response.\n\
         File: {}\n\
         Size: {} bytes\n\
         Type: {}\n\n\
         To enable real OCR processing:\n\
         1. Create an Azure Computer Vision resource\n\
         2. Set the credentials in the environment or .env file:\n   \
         - AZURE_VISION_ENDPOINT=https://your-resource.cognitiveservices.azure.com/\n   \
         - AZURE_VISION_KEY=your-api-key\n\
         3. Restart the service",
        payload.display_name(),
        payload.bytes.len(),
        payload.content_type.as_deref().unwrap_or("unknown"),
    )
}

/// Validates uploads and runs them through the remote OCR client.
#[derive(Clone)]
pub struct OcrService {
    client: OcrClient,
}

impl OcrService {
    pub fn new(client: OcrClient) -> Self {
        let config = client.config();
        info!(
            configured = config.is_configured(),
            endpoint = config.endpoint.as_deref().unwrap_or("(none)"),
            api_key = %config.masked_key(),
            demo_fallback = config.demo_fallback,
            "Remote OCR settings"
        );
        if !config.is_configured() {
            if config.demo_fallback {
                warn!("Remote OCR credentials not configured. Running in DEMO MODE.");
            } else {
                warn!("Remote OCR credentials not configured and demo fallback is disabled.");
            }
        }
        Self { client }
    }

    pub fn is_demo(&self) -> bool {
        !self.client.config().is_configured()
    }

    pub async fn process(&self, payload: &ImagePayload, cancel: &CancellationToken) -> OcrOutcome {
        info!(filename = payload.display_name(), bytes = payload.bytes.len(), "Starting OCR");

        if let Some(rejection) = validate(payload) {
            return rejection;
        }

        if self.is_demo() {
            if !self.client.config().demo_fallback {
                return OcrOutcome::failure(
                    ErrorKind::Configuration,
                    "Remote OCR credentials are not configured \
                     (set AZURE_VISION_ENDPOINT and AZURE_VISION_KEY)",
                );
            }
            warn!("Remote OCR credentials not configured, answering in demo mode");
            if let Err(e) = cancellable_sleep(DEMO_DELAY, cancel).await {
                return OcrOutcome::failure(e.kind(), e.to_string());
            }
            return OcrOutcome::Success {
                text: demo_text(payload),
                elapsed_ms: DEMO_DELAY.as_millis() as u64,
                mode: OcrMode::Demo,
            };
        }

        let started = Instant::now();
        let result = self.client.submit(&payload.bytes, cancel).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(text) => {
                info!(elapsed_ms, text_len = text.len(), "OCR completed successfully");
                debug!(filename = payload.display_name(), "OCR text extracted");
                OcrOutcome::Success {
                    text,
                    elapsed_ms,
                    mode: OcrMode::Live,
                }
            }
            Err(e) => {
                error!(elapsed_ms, kind = ?e.kind(), error = %e, "OCR processing failed");
                OcrOutcome::failure(e.kind(), e.to_string())
            }
        }
    }
}
