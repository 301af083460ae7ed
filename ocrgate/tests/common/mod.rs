#![allow(dead_code)]
// Shared helpers for integration tests
use std::sync::{Arc, Once};

use ocrgate::config::RemoteConfig;
use ocrgate::ocr::{build_transport, OcrClient};

pub const TEST_KEY: &str = "test-subscription-key";
pub const OCR_PATH: &str = "/vision/v3.2/ocr";

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Remote settings pointing at `endpoint` with short waits suitable for tests.
pub fn remote_config(endpoint: &str, max_retries: u32) -> RemoteConfig {
    RemoteConfig {
        endpoint: Some(endpoint.to_string()),
        api_key: Some(TEST_KEY.to_string()),
        api_version: "v3.2".to_string(),
        connect_timeout_secs: 2,
        request_timeout_secs: 5,
        max_retries,
        retry_backoff_ms: 10,
        poll_interval_ms: 200,
        poll_timeout_secs: 10,
        demo_fallback: false,
    }
}

pub fn client(config: RemoteConfig) -> OcrClient {
    let http = build_transport(&config).expect("transport");
    OcrClient::new(http, Arc::new(config)).with_jitter_seed(7)
}

pub fn regions_body(words: &[&str]) -> serde_json::Value {
    let words: Vec<_> = words
        .iter()
        .map(|w| serde_json::json!({ "text": w }))
        .collect();
    serde_json::json!({
        "language": "en",
        "orientation": "Up",
        "regions": [{ "lines": [{ "words": words }] }]
    })
}

pub fn read_status_body(status: &str, lines: &[&str]) -> serde_json::Value {
    let lines: Vec<_> = lines
        .iter()
        .map(|l| serde_json::json!({ "text": l }))
        .collect();
    serde_json::json!({
        "status": status,
        "analyzeResult": { "readResults": [{ "page": 1, "lines": lines }] }
    })
}
