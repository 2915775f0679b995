use super::*;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> reqwest::Client {
    http_client_with_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn test_read_text_under_cap() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/small"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .mount(&server)
        .await;

    let resp = client()
        .get(format!("{}/small", server.uri()))
        .send()
        .await
        .unwrap();
    let (text, truncated) = read_text_bounded(resp, 1024).await.unwrap();
    assert_eq!(text, "hello");
    assert!(!truncated);
}

#[tokio::test]
async fn test_read_text_marks_truncation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_string("a".repeat(2048)))
        .mount(&server)
        .await;

    let resp = client()
        .get(format!("{}/big", server.uri()))
        .send()
        .await
        .unwrap();
    let (text, truncated) = read_text_bounded(resp, 100).await.unwrap();
    assert!(truncated);
    assert!(text.ends_with("[truncated]"));
    assert!(text.len() < 2048);
}

#[tokio::test]
async fn test_read_body_binary_cut_is_unmarked() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 512]))
        .mount(&server)
        .await;

    let resp = client()
        .get(format!("{}/bin", server.uri()))
        .send()
        .await
        .unwrap();
    let body = read_body_bounded(resp, 256).await.unwrap();
    assert!(body.truncated);
    assert_eq!(body.bytes.len(), 256);
    assert!(body.bytes.iter().all(|b| *b == 7));
}

#[tokio::test]
async fn test_exact_cap_body_is_not_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/exact"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 64]))
        .mount(&server)
        .await;

    // Only strictly-over bodies are refused; an exact fit reads cleanly.
    let resp = client()
        .get(format!("{}/exact", server.uri()))
        .send()
        .await
        .unwrap();
    let body = read_body_bounded(resp, 64).await.unwrap();
    assert!(!body.truncated);
    assert_eq!(body.bytes.len(), 64);
}

#[tokio::test]
async fn test_oversized_content_length_rejected_up_front() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/huge"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
        .mount(&server)
        .await;

    let resp = client()
        .get(format!("{}/huge", server.uri()))
        .send()
        .await
        .unwrap();
    let err = read_body_bounded(resp, 128).await.unwrap_err();
    assert_eq!(err.kind(), "remote");
    assert!(err.to_string().contains("exceeds the 128 byte limit"));
}
