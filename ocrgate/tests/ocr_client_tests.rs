mod common;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_bytes, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use ocrgate::error::OcrError;
use ocrgate::ocr::OPERATION_LOCATION_HEADER;

use common::{
    client, init_test_logger, read_status_body, regions_body, remote_config, OCR_PATH, TEST_KEY,
};

const IMAGE: &[u8] = b"\xFF\xD8\xFF\xE0fakejpeg";
const OPERATION_PATH: &str = "/vision/v3.2/read/analyzeResults/op-123";

async fn accept_with_location(server: &MockServer) {
    let location = format!("{}{}", server.uri(), OPERATION_PATH);
    Mock::given(method("POST"))
        .and(path(OCR_PATH))
        .respond_with(
            ResponseTemplate::new(202).insert_header(OPERATION_LOCATION_HEADER, location.as_str()),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_inline_result_is_extracted() {
    init_test_logger();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(OCR_PATH))
        .and(query_param("language", "unk"))
        .and(query_param("detectOrientation", "true"))
        .and(header("Ocp-Apim-Subscription-Key", TEST_KEY))
        .and(header("content-type", "application/octet-stream"))
        .and(body_bytes(IMAGE.to_vec()))
        .respond_with(ResponseTemplate::new(200).set_body_json(regions_body(&["Hello", "World"])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(remote_config(&server.uri(), 3));
    let text = client
        .submit(IMAGE, &CancellationToken::new())
        .await
        .expect("inline OCR should succeed");

    assert_eq!(text, "Hello World");
}

#[tokio::test]
async fn test_endpoint_trailing_slash_is_tolerated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(OCR_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(regions_body(&["ok"])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(remote_config(&format!("{}/", server.uri()), 1));
    let text = client.submit(IMAGE, &CancellationToken::new()).await.unwrap();
    assert_eq!(text, "ok");
}

#[tokio::test]
async fn test_rate_limited_every_time_exhausts_retries() {
    init_test_logger();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(OCR_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .expect(3)
        .mount(&server)
        .await;

    let client = client(remote_config(&server.uri(), 3));
    let result = client.submit(IMAGE, &CancellationToken::new()).await;

    match result {
        Err(OcrError::RetriesExhausted { attempts, last }) => {
            assert_eq!(attempts, 3);
            assert!(last.contains("429"), "unexpected last error: {last}");
        }
        other => panic!("Expected RetriesExhausted, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_then_success_recovers() {
    let server = MockServer::start().await;
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_for_mock = Arc::clone(&attempts);

    Mock::given(method("POST"))
        .and(path(OCR_PATH))
        .respond_with(move |_request: &Request| {
            if attempts_for_mock.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(503).set_body_string("try again")
            } else {
                ResponseTemplate::new(200).set_body_json(regions_body(&["Recovered"]))
            }
        })
        .mount(&server)
        .await;

    let client = client(remote_config(&server.uri(), 3));
    let text = client.submit(IMAGE, &CancellationToken::new()).await.unwrap();

    assert_eq!(text, "Recovered");
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(OCR_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": { "code": "InvalidImageFormat", "message": "Input data is not a valid image." }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(remote_config(&server.uri(), 3));
    let result = client.submit(IMAGE, &CancellationToken::new()).await;

    match result {
        Err(OcrError::Remote { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("InvalidImageFormat"));
        }
        other => panic!("Expected Remote error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_does_not_leak_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(OCR_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("Access denied"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(remote_config(&server.uri(), 3));
    let err = client
        .submit(IMAGE, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(!err.to_string().contains(TEST_KEY));
    assert!(!format!("{err:?}").contains(TEST_KEY));
}

#[tokio::test]
async fn test_ok_with_invalid_json_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(OCR_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(remote_config(&server.uri(), 3));
    let result = client.submit(IMAGE, &CancellationToken::new()).await;
    assert!(matches!(result, Err(OcrError::Protocol(_))), "got {result:?}");
}

#[tokio::test]
async fn test_accepted_operation_is_polled_until_succeeded() {
    init_test_logger();
    let server = MockServer::start().await;
    accept_with_location(&server).await;

    let polls = Arc::new(AtomicUsize::new(0));
    let polls_for_mock = Arc::clone(&polls);
    Mock::given(method("GET"))
        .and(path(OPERATION_PATH))
        .and(header("Ocp-Apim-Subscription-Key", TEST_KEY))
        .respond_with(move |_request: &Request| {
            match polls_for_mock.fetch_add(1, Ordering::SeqCst) {
                0 => ResponseTemplate::new(200).set_body_json(read_status_body("notStarted", &[])),
                1 => ResponseTemplate::new(200).set_body_json(read_status_body("running", &[])),
                _ => ResponseTemplate::new(200)
                    .set_body_json(read_status_body("succeeded", &["first line", "second line"])),
            }
        })
        .expect(3)
        .mount(&server)
        .await;

    let client = client(remote_config(&server.uri(), 3));
    let text = client.submit(IMAGE, &CancellationToken::new()).await.unwrap();

    assert_eq!(text, "first line\nsecond line");
    assert_eq!(polls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_succeeded_status_is_case_insensitive() {
    let server = MockServer::start().await;
    accept_with_location(&server).await;
    Mock::given(method("GET"))
        .and(path(OPERATION_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(read_status_body("Succeeded", &["done"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(remote_config(&server.uri(), 1));
    let text = client.submit(IMAGE, &CancellationToken::new()).await.unwrap();
    assert_eq!(text, "done");
}

#[tokio::test]
async fn test_accepted_without_location_fails_without_polling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(OCR_PATH))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(remote_config(&server.uri(), 3));
    let result = client.submit(IMAGE, &CancellationToken::new()).await;

    match result {
        Err(OcrError::Protocol(message)) => assert!(message.contains(OPERATION_LOCATION_HEADER)),
        other => panic!("Expected Protocol error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_operation_is_reported() {
    let server = MockServer::start().await;
    accept_with_location(&server).await;
    Mock::given(method("GET"))
        .and(path(OPERATION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(read_status_body("failed", &[])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(remote_config(&server.uri(), 3));
    let result = client.submit(IMAGE, &CancellationToken::new()).await;
    assert!(
        matches!(result, Err(OcrError::RemoteOperationFailed(_))),
        "got {result:?}"
    );
}

#[tokio::test]
async fn test_transient_poll_error_keeps_polling() {
    let server = MockServer::start().await;
    accept_with_location(&server).await;

    let polls = Arc::new(AtomicUsize::new(0));
    let polls_for_mock = Arc::clone(&polls);
    Mock::given(method("GET"))
        .and(path(OPERATION_PATH))
        .respond_with(move |_request: &Request| {
            if polls_for_mock.fetch_add(1, Ordering::SeqCst) == 0 {
                ResponseTemplate::new(503)
            } else {
                ResponseTemplate::new(200).set_body_json(read_status_body("succeeded", &["later"]))
            }
        })
        .expect(2)
        .mount(&server)
        .await;

    let client = client(remote_config(&server.uri(), 3));
    let text = client.submit(IMAGE, &CancellationToken::new()).await.unwrap();
    assert_eq!(text, "later");
}

#[tokio::test]
async fn test_poll_client_error_is_protocol_error() {
    let server = MockServer::start().await;
    accept_with_location(&server).await;
    Mock::given(method("GET"))
        .and(path(OPERATION_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such operation"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(remote_config(&server.uri(), 3));
    let result = client.submit(IMAGE, &CancellationToken::new()).await;
    assert!(matches!(result, Err(OcrError::Protocol(_))), "got {result:?}");
}

#[tokio::test]
async fn test_operation_that_never_finishes_times_out() {
    let server = MockServer::start().await;
    accept_with_location(&server).await;
    Mock::given(method("GET"))
        .and(path(OPERATION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(read_status_body("running", &[])))
        .mount(&server)
        .await;

    let mut config = remote_config(&server.uri(), 3);
    config.poll_timeout_secs = 1;
    let client = client(config);

    let started = Instant::now();
    let result = client.submit(IMAGE, &CancellationToken::new()).await;

    assert!(matches!(result, Err(OcrError::PollTimeout(1))), "got {result:?}");
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_cancellation_aborts_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(OCR_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(regions_body(&["late"]))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = client(remote_config(&server.uri(), 3));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let result = client.submit(IMAGE, &cancel).await;

    assert!(matches!(result, Err(OcrError::Cancelled)), "got {result:?}");
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_unreachable_endpoint_exhausts_retries() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = client(remote_config(&endpoint, 2));
    let result = client.submit(IMAGE, &CancellationToken::new()).await;

    match result {
        Err(OcrError::RetriesExhausted { attempts, last }) => {
            assert_eq!(attempts, 2);
            assert!(last.contains("transport error"), "unexpected last error: {last}");
        }
        other => panic!("Expected RetriesExhausted, got: {other:?}"),
    }
}
