//! Remote OCR client
//!
//! Talks to an Azure Computer Vision style OCR endpoint and turns its replies
//! into plain text.
//!
//! # Architecture
//!
//! - `client`: the HTTP conversation. `send_once` returns a tagged
//!   [`Submission`]; `submit` wraps it in the retry loop and runs the polling
//!   sub-protocol when the service answers 202 with an `Operation-Location`.
//! - `backoff`: retry delay calculation with an injected randomness source.
//! - `extract`: maps the two known result schemas to text.
//!
//! # Usage
//!
//! ```rust,ignore
//! let http = build_transport(&config)?;
//! let client = OcrClient::new(http, Arc::new(config));
//! let text = client.submit(&image_bytes, &cancel).await?;
//! ```

mod backoff;
mod client;
mod extract;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{OcrError, Result};

pub use backoff::{compute_delay, MAX_DELAY_MS};
pub use client::{
    build_transport, classify_poll, classify_submission, ocr_url, OcrClient, PendingOperation,
    PollStep, Submission, MIN_POLL_INTERVAL_MS, OPERATION_LOCATION_HEADER,
    SUBSCRIPTION_KEY_HEADER,
};
pub use extract::{extract, extract_shapes, Shape, ALL_SHAPES};

/// Sleep for `delay` unless `cancel` fires first.
pub(crate) async fn cancellable_sleep(delay: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(OcrError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
