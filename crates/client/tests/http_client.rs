use std::io::Write;

use bonescope_client::{
    AnalysisClient, AnalysisError, AnalysisRequest, Attachment, HistoryRole, HistoryTurn,
    HttpAnalysisClient, ReplyOutcome, ServiceEndpoint,
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn client_for(server: &MockServer) -> HttpAnalysisClient {
    HttpAnalysisClient::new(ServiceEndpoint::new(server.uri(), "/chat")).unwrap()
}

async fn recorded_body(server: &MockServer) -> String {
    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1, "expected exactly one request");
    String::from_utf8_lossy(&requests[0].body).into_owned()
}

#[tokio::test]
async fn text_submission_posts_message_field_only() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "R" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let reply = client
        .analyze(AnalysisRequest::new("  is this broken?  ", None))
        .await
        .unwrap();

    assert_eq!(
        reply.outcome(),
        ReplyOutcome::Answer {
            text: Some("R".to_string()),
            image_url: None,
        }
    );

    let body = recorded_body(&server).await;
    assert!(body.contains("name=\"message\""));
    assert!(body.contains("is this broken?"));
    assert!(!body.contains("  is this broken?  "));
    assert!(!body.contains("name=\"image\""));
    assert!(!body.contains("name=\"chat_history\""));
}

#[tokio::test]
async fn image_submission_uploads_file_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "Mild fracture",
            "annotated_image_url": "/get_annotated/xray.png",
        })))
        .mount(&server)
        .await;

    let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
    file.write_all(b"fake-png-bytes").unwrap();
    let attachment = Attachment::new(file.path(), "xray.png", "image/png");

    let client = client_for(&server);
    let reply = client
        .analyze(AnalysisRequest::new("", Some(attachment)))
        .await
        .unwrap();

    assert_eq!(
        reply.annotated_image_url.as_deref(),
        Some("/get_annotated/xray.png")
    );

    let body = recorded_body(&server).await;
    assert!(body.contains("name=\"image\""));
    assert!(body.contains("filename=\"xray.png\""));
    assert!(body.contains("image/png"));
    assert!(body.contains("fake-png-bytes"));
    assert!(!body.contains("name=\"message\""));
}

#[tokio::test]
async fn declared_error_is_decoded_from_server_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "bad image" })))
        .mount(&server)
        .await;

    let reply = client_for(&server)
        .analyze(AnalysisRequest::new("hello", None))
        .await
        .unwrap();

    assert_eq!(
        reply.outcome(),
        ReplyOutcome::DeclaredError("bad image".to_string())
    );
}

#[tokio::test]
async fn non_json_body_is_a_decode_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let error = client_for(&server)
        .analyze(AnalysisRequest::new("hello", None))
        .await
        .unwrap_err();

    assert!(matches!(error, AnalysisError::DecodeBody { status: 502, .. }));
}

#[tokio::test]
async fn unreachable_server_is_a_send_failure() {
    let client =
        HttpAnalysisClient::new(ServiceEndpoint::new("http://127.0.0.1:1", "/chat")).unwrap();

    let error = client
        .analyze(AnalysisRequest::new("hello", None))
        .await
        .unwrap_err();

    assert!(matches!(error, AnalysisError::SendRequest { .. }));
}

#[tokio::test]
async fn unreadable_attachment_fails_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "R" })))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("gone.png");
    let attachment = Attachment::new(&missing, "gone.png", "image/png");

    let error = client_for(&server)
        .analyze(AnalysisRequest::new("", Some(attachment)))
        .await
        .unwrap_err();

    assert!(matches!(error, AnalysisError::ReadAttachment { path, .. } if path == missing));
}

#[tokio::test]
async fn history_is_sent_as_json_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let request = AnalysisRequest::new("and now?", None).with_history(vec![
        HistoryTurn::new(HistoryRole::User, "first"),
        HistoryTurn::new(HistoryRole::Assistant, "reply"),
    ]);
    let reply = client_for(&server).analyze(request).await.unwrap();
    assert_eq!(reply.outcome(), ReplyOutcome::Empty);

    let body = recorded_body(&server).await;
    assert!(body.contains("name=\"chat_history\""));
    assert!(body.contains(r#"[{"role":"user","content":"first"},{"role":"assistant","content":"reply"}]"#));
}

#[tokio::test]
async fn fetch_image_returns_bytes_and_rejects_missing_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_annotated/xray.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"annotated".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get_annotated/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let endpoint = client.endpoint().clone();

    let bytes = client
        .fetch_image(endpoint.resolve("/get_annotated/xray.png"))
        .await
        .unwrap();
    assert_eq!(bytes, b"annotated");

    let error = client
        .fetch_image(endpoint.resolve("/get_annotated/missing.png"))
        .await
        .unwrap_err();
    assert!(matches!(error, AnalysisError::FetchImageStatus { status: 404, .. }));
}
