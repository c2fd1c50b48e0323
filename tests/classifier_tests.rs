// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the HTTP classifier client

use camera_identify::Config;
use camera_identify::backends::camera::CameraFrame;
use camera_identify::errors::ClassifyError;
use camera_identify::pipelines::{
    Classifier, EncodedFrame, HttpClassifier, Preprocessor, RequestEncoding,
};
use mockito::Matcher;
use std::time::Duration;

fn encoded_frame() -> EncodedFrame {
    let frame = CameraFrame::from_rgba(64, 48, [40, 120, 200, 255].repeat(64 * 48));
    Preprocessor::default().prepare(&frame).unwrap()
}

fn client(url: &str, encoding: RequestEncoding) -> HttpClassifier {
    HttpClassifier::new(url, encoding, Some(Duration::from_secs(5))).unwrap()
}

#[tokio::test]
async fn test_json_request_returns_label() {
    let mut server = mockito::Server::new_async().await;
    let frame = encoded_frame();

    let mock = server
        .mock("POST", "/identify")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(serde_json::json!({ "image": frame.base64 })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"prediction": "cat", "preprocessing_time": "0.004", "inference_time": "0.031"}"#)
        .create_async()
        .await;

    let classifier = client(&server.url(), RequestEncoding::Json);
    let prediction = classifier.identify(&frame).await.unwrap();

    assert_eq!(prediction.label, "cat");
    assert_eq!(prediction.preprocessing_time.as_deref(), Some("0.004"));
    assert_eq!(prediction.inference_time.as_deref(), Some("0.031"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_endpoint_with_trailing_slash() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/identify")
        .with_status(200)
        .with_body(r#"{"prediction": "mug"}"#)
        .create_async()
        .await;

    let classifier = client(&format!("{}/", server.url()), RequestEncoding::Json);
    assert_eq!(classifier.identify(&encoded_frame()).await.unwrap().label, "mug");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_prediction_gives_empty_label() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/identify")
        .with_status(200)
        .with_body(r#"{"inference_time": "0.020"}"#)
        .create_async()
        .await;

    let classifier = client(&server.url(), RequestEncoding::Json);
    let prediction = classifier.identify(&encoded_frame()).await.unwrap();
    assert_eq!(prediction.label, "");
    assert_eq!(prediction.inference_time.as_deref(), Some("0.020"));
}

#[tokio::test]
async fn test_server_error_message_surfaced() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/identify")
        .with_status(400)
        .with_body(r#"{"error": "No image provided"}"#)
        .create_async()
        .await;

    let classifier = client(&server.url(), RequestEncoding::Json);
    match classifier.identify(&encoded_frame()).await {
        Err(ClassifyError::Status { code, body }) => {
            assert_eq!(code, 400);
            assert_eq!(body, "No image provided");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/identify")
        .with_status(200)
        .with_body("<html>oops</html>")
        .create_async()
        .await;

    let classifier = client(&server.url(), RequestEncoding::Json);
    assert!(matches!(
        classifier.identify(&encoded_frame()).await,
        Err(ClassifyError::MalformedResponse(_))
    ));
}

#[tokio::test]
async fn test_multipart_request_carries_image_part() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/identify")
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data; boundary=".to_string()),
        )
        .match_body(Matcher::Regex(
            r#"name="image"; filename="frame.jpg""#.to_string(),
        ))
        .with_status(200)
        .with_body(r#"{"prediction": "dog"}"#)
        .create_async()
        .await;

    let classifier = client(&server.url(), RequestEncoding::Multipart);
    assert_eq!(classifier.identify(&encoded_frame()).await.unwrap().label, "dog");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_zero_timeout_config_still_answers() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/identify")
        .with_status(200)
        .with_body(r#"{"prediction": "apple"}"#)
        .create_async()
        .await;

    let mut config = Config::from_toml("request_timeout_ms = 0").unwrap();
    config.endpoint = server.url();
    let classifier = HttpClassifier::new(
        &config.endpoint,
        config.request_encoding,
        config.request_timeout(),
    )
    .unwrap();

    assert_eq!(classifier.identify(&encoded_frame()).await.unwrap().label, "apple");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Grab a free port, then close it
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let classifier = client(&format!("http://127.0.0.1:{}", port), RequestEncoding::Json);
    assert!(matches!(
        classifier.identify(&encoded_frame()).await,
        Err(ClassifyError::Transport(_))
    ));
}

#[tokio::test]
async fn test_health_check() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .with_status(200)
        .with_body("Hello, World!")
        .create_async()
        .await;

    let classifier = client(&server.url(), RequestEncoding::Json);
    assert_eq!(classifier.health().await.unwrap(), "Hello, World!");
    mock.assert_async().await;
}

#[test]
fn test_rejects_non_http_endpoint() {
    assert!(matches!(
        HttpClassifier::new("ftp://example.com", RequestEncoding::Json, None),
        Err(ClassifyError::InvalidEndpoint(_))
    ));
    assert!(HttpClassifier::new("not a url", RequestEncoding::Json, None).is_err());
}
