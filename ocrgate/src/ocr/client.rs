use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use reqwest::header::HeaderValue;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::RemoteConfig;
use crate::error::{excerpt, OcrError, Result};

use super::backoff::compute_delay;
use super::cancellable_sleep;
use super::extract::{extract, extract_shapes, Shape};

pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
pub const OPERATION_LOCATION_HEADER: &str = "Operation-Location";
/// Floor applied to the configured poll interval.
pub const MIN_POLL_INTERVAL_MS: u64 = 200;

/// An asynchronous remote job awaiting a terminal status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    pub status_url: Url,
}

/// Result of a single submission attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// 200 with the recognition payload inline.
    Inline(Value),
    /// 202 with a status URL to poll.
    Pending(PendingOperation),
    /// 429, 5xx or a transport failure; worth retrying.
    Transient(String),
    /// Any other status; not retried.
    Rejected { status: u16, body: String },
}

/// Result of a single poll of a [`PendingOperation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep {
    Done(String),
    Pending,
    Transient(String),
}

/// Classify the response to an OCR submission.
///
/// A 202 without a usable `Operation-Location` is a protocol violation and
/// fails immediately.
pub fn classify_submission(
    status: StatusCode,
    operation_location: Option<&str>,
    body: &str,
) -> Result<Submission> {
    if status == StatusCode::OK {
        let json: Value = serde_json::from_str(body).map_err(|e| {
            OcrError::Protocol(format!("OCR response body is not valid JSON: {e}"))
        })?;
        return Ok(Submission::Inline(json));
    }

    if status == StatusCode::ACCEPTED {
        let location = operation_location.map(str::trim).filter(|l| !l.is_empty());
        let Some(location) = location else {
            return Err(OcrError::Protocol(format!(
                "{OPERATION_LOCATION_HEADER} header missing on 202 response"
            )));
        };
        let status_url = Url::parse(location).map_err(|e| {
            OcrError::Protocol(format!(
                "{OPERATION_LOCATION_HEADER} header is not a valid URL: {e}"
            ))
        })?;
        return Ok(Submission::Pending(PendingOperation { status_url }));
    }

    if is_transient(status) {
        return Ok(Submission::Transient(format!(
            "status {}: {}",
            status.as_u16(),
            excerpt(body)
        )));
    }

    Ok(Submission::Rejected {
        status: status.as_u16(),
        body: excerpt(body),
    })
}

/// Classify the response to a poll of the operation status URL.
pub fn classify_poll(status: StatusCode, body: &str) -> Result<PollStep> {
    if status.is_success() {
        let json: Value = serde_json::from_str(body).map_err(|e| {
            OcrError::Protocol(format!("Operation status body is not valid JSON: {e}"))
        })?;
        let state = json
            .get("status")
            .and_then(Value::as_str)
            .map(str::to_lowercase);
        return match state.as_deref() {
            Some("succeeded") => Ok(PollStep::Done(extract_shapes(
                &json,
                &[Shape::ReadResults],
            ))),
            Some("failed") => Err(OcrError::RemoteOperationFailed(excerpt(body))),
            _ => Ok(PollStep::Pending),
        };
    }

    if is_transient(status) {
        return Ok(PollStep::Transient(format!(
            "status {}: {}",
            status.as_u16(),
            excerpt(body)
        )));
    }

    Err(OcrError::Protocol(format!(
        "Polling operation failed with status {}: {}",
        status.as_u16(),
        excerpt(body)
    )))
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Build the OCR submission URL for `endpoint`.
pub fn ocr_url(endpoint: &str, api_version: &str) -> Result<Url> {
    let base = endpoint.trim().trim_end_matches('/');
    let raw = format!("{base}/vision/{api_version}/ocr?language=unk&detectOrientation=true");
    Url::parse(&raw)
        .map_err(|e| OcrError::Configuration(format!("Invalid OCR endpoint '{base}': {e}")))
}

/// Build the shared HTTP transport for [`OcrClient`].
pub fn build_transport(config: &RemoteConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs.max(1)))
        .build()
        .map_err(|e| OcrError::Internal(format!("Failed to create HTTP client: {e}")))
}

/// Client for the remote OCR service.
///
/// Cloning is cheap; clones share the transport pool, the configuration and
/// the jitter source.
#[derive(Clone)]
pub struct OcrClient {
    http: Client,
    config: Arc<RemoteConfig>,
    jitter: Arc<Mutex<StdRng>>,
}

impl OcrClient {
    pub fn new(http: Client, config: Arc<RemoteConfig>) -> Self {
        Self {
            http,
            config,
            jitter: Arc::new(Mutex::new(StdRng::from_entropy())),
        }
    }

    /// Replace the jitter source with a seeded one so retry delays are
    /// reproducible.
    pub fn with_jitter_seed(mut self, seed: u64) -> Self {
        self.jitter = Arc::new(Mutex::new(StdRng::seed_from_u64(seed)));
        self
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Run OCR on `image` and return the extracted text.
    ///
    /// Transient failures are retried up to `max_retries` attempts in total.
    /// An accepted (202) submission is polled until it reaches a terminal
    /// status or `poll_timeout_secs` elapses.
    pub async fn submit(&self, image: &[u8], cancel: &CancellationToken) -> Result<String> {
        let (url, key) = self.target()?;
        let max_attempts = self.config.max_retries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(attempt, max_attempts, bytes = image.len(), "Sending image to remote OCR");

            let reason = match self.send_once(&url, &key, image, cancel).await? {
                Submission::Inline(json) => {
                    let text = extract(&json);
                    debug!(text_len = text.len(), "Remote OCR returned inline result");
                    return Ok(text);
                }
                Submission::Pending(operation) => {
                    return self.poll(operation, &key, cancel).await;
                }
                Submission::Rejected { status, body } => {
                    error!(status, body = %body, "Remote OCR rejected the request");
                    return Err(OcrError::Remote { status, body });
                }
                Submission::Transient(reason) => reason,
            };

            if attempt >= max_attempts {
                error!(attempts = attempt, reason = %reason, "Remote OCR retries exhausted");
                return Err(OcrError::RetriesExhausted {
                    attempts: attempt,
                    last: reason,
                });
            }

            let delay_ms = self.next_delay(attempt);
            warn!(
                attempt,
                max_attempts,
                delay_ms,
                reason = %reason,
                "Transient error from remote OCR, retrying"
            );
            cancellable_sleep(Duration::from_millis(delay_ms), cancel).await?;
        }
    }

    /// Submit the image once and classify the reply.
    pub async fn send_once(
        &self,
        url: &Url,
        key: &HeaderValue,
        image: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Submission> {
        let request = self
            .http
            .post(url.clone())
            .timeout(self.request_timeout())
            .header(SUBSCRIPTION_KEY_HEADER, key.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec());

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let location = response
                .headers()
                .get(OPERATION_LOCATION_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, location, body))
        };

        let (status, location, body) = tokio::select! {
            _ = cancel.cancelled() => return Err(OcrError::Cancelled),
            result = exchange => match result {
                Ok(reply) => reply,
                Err(e) => return Ok(Submission::Transient(format!("transport error: {e}"))),
            },
        };

        if status == StatusCode::ACCEPTED && location.is_none() {
            error!(body = %excerpt(&body), "202 received without {}", OPERATION_LOCATION_HEADER);
        }
        classify_submission(status, location.as_deref(), &body)
    }

    async fn poll(
        &self,
        operation: PendingOperation,
        key: &HeaderValue,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let timeout_secs = self.config.poll_timeout_secs.max(1);
        let deadline = Instant::now() + Duration::from_secs(timeout_secs);
        let interval = Duration::from_millis(self.config.poll_interval_ms.max(MIN_POLL_INTERVAL_MS));
        let mut polls = 0u32;

        info!(status_url = %operation.status_url, "Remote OCR accepted the image, polling for result");

        while Instant::now() < deadline {
            polls += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());

            match self.poll_once(&operation, key, remaining, cancel).await? {
                PollStep::Done(text) => {
                    debug!(polls, text_len = text.len(), "Read operation succeeded");
                    return Ok(text);
                }
                PollStep::Pending => debug!(polls, "Read operation still running"),
                PollStep::Transient(reason) => {
                    warn!(polls, reason = %reason, "Transient error while polling read operation")
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            cancellable_sleep(interval.min(remaining), cancel).await?;
        }

        error!(polls, timeout_secs, "Timed out waiting for read operation");
        Err(OcrError::PollTimeout(timeout_secs))
    }

    async fn poll_once(
        &self,
        operation: &PendingOperation,
        key: &HeaderValue,
        remaining: Duration,
        cancel: &CancellationToken,
    ) -> Result<PollStep> {
        let request = self
            .http
            .get(operation.status_url.clone())
            .timeout(self.request_timeout().min(remaining.max(Duration::from_millis(1))))
            .header(SUBSCRIPTION_KEY_HEADER, key.clone());

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = tokio::select! {
            _ = cancel.cancelled() => return Err(OcrError::Cancelled),
            result = exchange => match result {
                Ok(reply) => reply,
                Err(e) => return Ok(PollStep::Transient(format!("transport error: {e}"))),
            },
        };

        classify_poll(status, &body)
    }

    fn target(&self) -> Result<(Url, HeaderValue)> {
        let endpoint = self
            .config
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                OcrError::Configuration("Remote OCR endpoint is not configured".to_string())
            })?;
        let key = self
            .config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                OcrError::Configuration("Remote OCR API key is not configured".to_string())
            })?;

        let mut key = HeaderValue::from_str(key).map_err(|_| {
            OcrError::Configuration("Remote OCR API key contains invalid characters".to_string())
        })?;
        key.set_sensitive(true);

        Ok((ocr_url(endpoint, &self.config.api_version)?, key))
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs.max(1))
    }

    fn next_delay(&self, attempt: u32) -> u64 {
        let mut rng = self.jitter.lock().unwrap_or_else(PoisonError::into_inner);
        compute_delay(attempt, self.config.retry_backoff_ms, &mut *rng)
    }
}
